/// Cadence - gapless player and ReplayGain scanner
use cadence_cli::commands::{play, scan, tags};
use cadence_cli::CliConfig;
use cadence_core::LogLevel;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence", version)]
#[command(about = "Gapless player and ReplayGain scanner", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./cadence.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play files gaplessly, in order
    Play {
        /// Files to play
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Linear volume multiplier
        #[arg(long)]
        volume: Option<f64>,
        /// Use track gain even when album gain is tagged
        #[arg(long)]
        track_gain: bool,
        /// Render without an audio device
        #[arg(long)]
        null: bool,
        /// Output device name
        #[arg(long)]
        device: Option<String>,
    },
    /// Measure ReplayGain for a set of files
    Scan {
        /// Files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Write REPLAYGAIN_* tags into the files
        #[arg(long)]
        write_tags: bool,
        /// Also write album gain, treating the files as one album
        #[arg(long)]
        album: bool,
    },
    /// Show or edit a file's tags
    Tags {
        /// File to inspect
        file: PathBuf,
        /// Set a tag (KEY=VALUE), replacing existing values
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Append to a tag (KEY=VALUE)
        #[arg(long, value_name = "KEY=VALUE")]
        append: Vec<String>,
        /// Delete a tag
        #[arg(long, value_name = "KEY")]
        delete: Vec<String>,
        /// Remove all ReplayGain tags
        #[arg(long)]
        clear_replaygain: bool,
    },
    /// List audio output devices
    Devices,
}

fn init_logging(level: LogLevel) {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        return;
    }

    cadence_core::init();
    if let Err(e) = cadence_core::set_log_level(level) {
        eprintln!("warning: {e}");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    let level = match cli.verbose {
        0 => config.log_level,
        1 => LogLevel::Info.max(config.log_level),
        _ => LogLevel::Debug,
    };
    init_logging(level);

    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Play {
            files,
            volume,
            track_gain,
            null,
            device,
        } => {
            let options = play::PlayOptions {
                files,
                volume,
                track_gain,
                null_output: null,
                device,
            };
            play::run(&options, &config)?;
        }
        Commands::Scan {
            files,
            write_tags,
            album,
        } => {
            let options = scan::ScanOptions {
                files,
                write_tags,
                album,
            };
            scan::run(&options, &config.scan, &mut stdout)?;
        }
        Commands::Tags {
            file,
            set,
            append,
            delete,
            clear_replaygain,
        } => {
            let options = tags::TagsOptions {
                file,
                set,
                append,
                delete,
                clear_replaygain,
            };
            tags::run(&options, &mut stdout)?;
        }
        Commands::Devices => {
            for name in cadence_audio_desktop::CpalOutput::device_names()? {
                println!("{name}");
            }
        }
    }

    Ok(())
}
