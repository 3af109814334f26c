use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use api_telemetry::observability::archive::DEFAULT_COMPRESSION_LEVEL;
use api_telemetry::observability::{Archiver, Channel, LoggerSettings, Sink, SystemClock};

#[derive(Parser)]
#[command(name = "logctl")]
#[command(about = "Operator tooling for api-telemetry log trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a logger settings code and print the resulting channels
    Check {
        /// Settings code, e.g. "BCA.ED.RFA"
        settings: String,

        /// Treat the global debug flag as set
        #[arg(long)]
        debug: bool,
    },
    /// Compress every past-day file of the archive-enabled channels
    Archive {
        #[arg(long, env = "LOG_DIR", default_value = "logs")]
        log_dir: PathBuf,

        #[arg(long, env = "LOGGER")]
        settings: String,

        /// Archive only this channel, regardless of its archive flag
        #[arg(long, value_enum)]
        channel: Option<ChannelArg>,

        #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
        level: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ChannelArg {
    Brief,
    Error,
    Request,
    Framework,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Self {
        match arg {
            ChannelArg::Brief => Channel::Brief,
            ChannelArg::Error => Channel::Error,
            ChannelArg::Request => Channel::Request,
            ChannelArg::Framework => Channel::FrameworkDebug,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { settings, debug } => {
            let parsed = parse_or_exit(&settings, debug);
            print_settings(&parsed);
        }
        Commands::Archive {
            log_dir,
            settings,
            channel,
            level,
        } => {
            let parsed = Arc::new(parse_or_exit(&settings, false));
            let archiver = Archiver::new(&log_dir, parsed, Arc::new(SystemClock), level);
            let report = match channel {
                Some(channel) => archiver.archive(channel.into()).await?,
                None => archiver.archive_all().await,
            };
            for unit in &report.units {
                println!("{:?}\t{}", unit.state, unit.source.display());
            }
            println!(
                "archived {}, skipped {}, failed {}",
                report.done(),
                report.skipped(),
                report.failed()
            );
            if report.failed() > 0 {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn parse_or_exit(settings: &str, debug: bool) -> LoggerSettings {
    match LoggerSettings::parse(settings, debug) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn print_settings(settings: &LoggerSettings) {
    if !settings.is_enabled() {
        println!("logging disabled");
        return;
    }
    for channel in settings.channels() {
        let sinks: String = channel.sinks.iter().map(Sink::flag).collect();
        println!(
            "{:<10} enabled={:<5} sinks={:<3} debug_gated={}",
            channel.channel.to_string(),
            channel.enabled,
            sinks,
            channel.debug_gated
        );
    }
}
