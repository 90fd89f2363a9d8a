mod samples;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lyricsync_core::{
    fill_line_times_with, fill_word_times_with, repair_with, CoreError, LrcDocument,
    LyricSession, LyricsyncConfig, SessionEvent,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "lyricsync", version, about = "Decode, repair and replay synced lyrics")]
struct Cli {
    /// Override config file path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode an LRC file and print it as JSON.
    Decode {
        file: PathBuf,
        /// Derive word timings from `<mm:ss.xx>` tags.
        #[arg(long)]
        enhanced: bool,
    },
    /// Regenerate synced lyrics for corrected text.
    Repair {
        /// Corrected lyrics, plain text or HTML.
        #[arg(long)]
        text: PathBuf,
        /// Previously saved line-level LRC.
        #[arg(long)]
        synced: PathBuf,
        /// Previously saved enhanced LRC.
        #[arg(long)]
        word_synced: Option<PathBuf>,
        /// Print the full preview as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Feed a playback trace through the cursor tracker.
    Replay {
        #[arg(long)]
        lrc: PathBuf,
        /// One `wall_ms position_ms playing(0|1)` triple per line.
        #[arg(long)]
        samples: PathBuf,
        /// Also print session events.
        #[arg(long)]
        events: bool,
    },
    /// Fill gaps in a list of times, `-` marking an unknown entry.
    Interpolate {
        #[arg(required = true)]
        times: Vec<String>,
        /// Treat the times as words of a line starting here (seconds).
        #[arg(long)]
        word_start: Option<f64>,
        /// End of that line, the next line's start. Defaults to start + last line length.
        #[arg(long, requires = "word_start")]
        word_end: Option<f64>,
    },
    /// Write the config template to the default location if it does not exist yet.
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = LyricsyncConfig::load_or_default(cli.config.as_deref()).context("load config")?;
    init_tracing(&config.logging.filter);

    match cli.command {
        Command::Decode { file, enhanced } => {
            let input = read(&file)?;
            let document = if enhanced {
                LrcDocument::parse_enhanced(&input)
            } else {
                LrcDocument::parse(&input)
            };
            info!("Decoded {} line(s) from {}", document.lines.len(), file.display());
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Command::Repair {
            text,
            synced,
            word_synced,
            json,
        } => {
            let corrected = read(&text)?;
            let old_synced = read(&synced)?;
            let old_word_synced = word_synced.as_deref().map(read).transpose()?;

            let preview = repair_with(
                &corrected,
                &old_synced,
                old_word_synced.as_deref(),
                &config.interpolation,
            )?;

            if json {
                println!("{}", serde_json::to_string_pretty(&preview)?);
            } else {
                println!("{}", preview.repaired_synced);
                if let Some(word_synced) = preview.repaired_word_synced {
                    println!();
                    println!("{word_synced}");
                }
            }
        }
        Command::Replay {
            lrc,
            samples,
            events,
        } => replay(&config, &lrc, &samples, events).await?,
        Command::Interpolate {
            times,
            word_start,
            word_end,
        } => {
            let times = samples::parse_times(&times)?;
            let filled = match word_start {
                Some(start) => fill_word_times_with(start, word_end, &times, &config.interpolation),
                None => fill_line_times_with(&times, &config.interpolation),
            };
            println!("{}", serde_json::to_string(&filled)?);
        }
        Command::InitConfig => match LyricsyncConfig::load_or_create() {
            Ok(_) => println!(
                "Config already exists at {}",
                LyricsyncConfig::config_path().display()
            ),
            Err(CoreError::ConfigNotFound { path }) => {
                info!("Created config template");
                println!("Wrote config template to {}", path.display());
            }
            Err(e) => return Err(e).context("init config"),
        },
    }

    Ok(())
}

async fn replay(
    config: &LyricsyncConfig,
    lrc: &Path,
    samples: &Path,
    print_events: bool,
) -> anyhow::Result<()> {
    let document = LrcDocument::parse_enhanced(&read(lrc)?);
    let records = samples::parse_trace(&read(samples)?)
        .with_context(|| format!("parse {}", samples.display()))?;
    debug!("Replaying {} sample(s)", records.len());

    let session = LyricSession::with_config(config.tracker.clone());
    session.load(document).await;
    let mut rx = session.subscribe();
    let base = Instant::now();

    for record in records {
        let index = session.push_sample(record.to_sample(base)).await;
        let shown = index.map_or_else(|| "-".to_string(), |i| i.to_string());
        println!("{}\t{}\t{shown}", record.wall_ms, record.position_ms);

        while let Ok(event) = rx.try_recv() {
            if print_events {
                println!("\t{}", describe(&event));
            }
        }
    }

    Ok(())
}

fn describe(event: &SessionEvent) -> String {
    match event {
        SessionEvent::LyricsLoaded { line_count } => format!("loaded {line_count} line(s)"),
        SessionEvent::LyricsCleared => "cleared".to_string(),
        SessionEvent::ActiveLineChanged { index: Some(i) } => format!("line -> {i}"),
        SessionEvent::ActiveLineChanged { index: None } => "line -> none".to_string(),
        SessionEvent::ActiveWordChanged { line, word: Some(w) } => format!("word -> {line}:{w}"),
        SessionEvent::ActiveWordChanged { line, word: None } => format!("word -> {line}:none"),
        SessionEvent::SeekDetected { position } => format!("seek to {}ms", position.as_millis()),
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

/// Log to stderr so stdout stays machine-readable. `RUST_LOG` wins over the
/// configured filter.
fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cli_parses_interpolate_with_unknowns() {
        let cli = Cli::try_parse_from(["lyricsync", "interpolate", "-", "-", "5", "-"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Interpolate { ref times, word_start: None, .. } if times == &["-", "-", "5", "-"]
        ));
    }

    #[test]
    fn test_cli_word_end_requires_start() {
        assert!(Cli::try_parse_from(["lyricsync", "interpolate", "-", "--word-end", "3"]).is_err());
    }

    #[test]
    fn test_cli_global_config() {
        let cli = Cli::try_parse_from(["lyricsync", "decode", "a.lrc", "--config", "c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }

    #[test]
    fn test_describe_events() {
        assert_eq!(
            describe(&SessionEvent::ActiveLineChanged { index: Some(2) }),
            "line -> 2"
        );
        assert_eq!(
            describe(&SessionEvent::SeekDetected {
                position: Duration::from_millis(6050)
            }),
            "seek to 6050ms"
        );
    }
}
