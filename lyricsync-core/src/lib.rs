pub mod config;
pub mod cursor;
pub mod error;
pub mod interpolate;
pub mod lrc;
pub mod matcher;
pub mod paths;
pub mod playback;
pub mod repair;
pub mod session;
pub mod text;
pub mod time;

pub use config::{InterpolationConfig, LoggingConfig, LyricsyncConfig, TrackerConfig};
pub use cursor::CursorTracker;
pub use error::CoreError;
pub use interpolate::{fill_line_times, fill_line_times_with, fill_word_times, fill_word_times_with};
pub use lrc::{encode_enhanced, encode_lines, Line, LrcDocument, TimedLine, Word, WordTimes};
pub use matcher::{align_indices, lines_match, match_line_times};
pub use paths::{config_dir, config_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use playback::{PlaybackSample, SampleRecord};
pub use repair::{repair, repair_with, DiffSummary, LineDiff, RepairPreview, WordPreservation};
pub use session::{LyricSession, SessionEvent};
pub use time::DurationExt;
