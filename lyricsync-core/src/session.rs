use crate::config::TrackerConfig;
use crate::cursor::CursorTracker;
use crate::lrc::LrcDocument;
use crate::playback::PlaybackSample;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

/// Events emitted by a lyric session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A document was loaded and a fresh tracker built for it
    LyricsLoaded { line_count: usize },
    /// The document was dropped
    LyricsCleared,
    /// The tracker's output changed, `None` while paused or not following
    ActiveLineChanged { index: Option<usize> },
    /// The sung word within the active line changed
    ActiveWordChanged { line: usize, word: Option<usize> },
    /// Playback position jumped
    SeekDetected { position: Duration },
}

struct LoadedLyrics {
    document: LrcDocument,
    tracker: CursorTracker,
}

struct LyricSessionInner {
    config: TrackerConfig,
    lyrics: Option<LoadedLyrics>,
    active_line: Option<usize>,
    active_word: Option<usize>,
}

/// One displayed song: the loaded document, its cursor tracker, and an event
/// channel for whoever renders it.
pub struct LyricSession {
    inner: RwLock<LyricSessionInner>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl LyricSession {
    /// Create a new session with default tracker settings
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_config(TrackerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: TrackerConfig) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);

        Arc::new(Self {
            inner: RwLock::new(LyricSessionInner {
                config,
                lyrics: None,
                active_line: None,
                active_word: None,
            }),
            event_tx,
        })
    }

    /// Subscribe to session events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Load a document. Any previous tracker is discarded along with its state.
    pub async fn load(&self, document: LrcDocument) {
        let mut inner = self.inner.write().await;
        let tracker = CursorTracker::new(&document.line_times(), inner.config.clone());
        let line_count = document.lines.len();

        inner.lyrics = Some(LoadedLyrics { document, tracker });
        inner.active_line = None;
        inner.active_word = None;

        let _ = self.event_tx.send(SessionEvent::LyricsLoaded { line_count });
    }

    /// Drop the current document
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.lyrics = None;
        inner.active_line = None;
        inner.active_word = None;

        let _ = self.event_tx.send(SessionEvent::LyricsCleared);
    }

    /// Toggle following the playback position. Applies to the current and future
    /// documents.
    pub async fn set_auto_follow(&self, enabled: bool) {
        let mut inner = self.inner.write().await;
        inner.config.auto_follow = enabled;
        if let Some(lyrics) = inner.lyrics.as_mut() {
            lyrics.tracker.set_auto_follow(enabled);
        }
    }

    /// Feed a playback sample and get the active line. Emits events for every
    /// observable change.
    pub async fn push_sample(&self, sample: PlaybackSample) -> Option<usize> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let lyrics = inner.lyrics.as_mut()?;

        let line = lyrics.tracker.update(&sample);
        if lyrics.tracker.last_was_seek() {
            debug!(position = ?sample.position, "Seek");
            let _ = self.event_tx.send(SessionEvent::SeekDetected {
                position: sample.position,
            });
        }

        if line != inner.active_line {
            inner.active_line = line;
            inner.active_word = None;
            let _ = self
                .event_tx
                .send(SessionEvent::ActiveLineChanged { index: line });
        }

        if let Some(index) = line {
            let word = lyrics
                .document
                .lines
                .get(index)
                .and_then(|l| l.active_word(sample.position_secs()));
            if word != inner.active_word {
                inner.active_word = word;
                let _ = self
                    .event_tx
                    .send(SessionEvent::ActiveWordChanged { line: index, word });
            }
        }

        line
    }

    /// The last active line reported
    pub async fn active_line(&self) -> Option<usize> {
        self.inner.read().await.active_line
    }

    /// Currently loaded document
    pub async fn document(&self) -> Option<LrcDocument> {
        self.inner
            .read()
            .await
            .lyrics
            .as_ref()
            .map(|l| l.document.clone())
    }
}
