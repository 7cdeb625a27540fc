use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracksync::{playlist_size, sync_playlist, TerminalPort};

mod config;
mod port;

use config::{CliConfig, IgnoreAllPolicy, SyncOverrides};
use port::BlockingPort;

#[derive(Parser)]
#[command(name = "tracksync")]
#[command(about = "Copy the tracks of a playlist to a device, named after their tags")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy the playlist into a destination directory
    Sync {
        /// Playlist file, one path or file:// URL per line
        playlist: PathBuf,

        /// Destination directory
        dest: PathBuf,

        /// Naming pattern over %a %b %n %t %y
        #[arg(short, long)]
        pattern: Option<String>,

        /// Library root used to name tracks with incomplete tags (repeatable)
        #[arg(short = 'l', long = "local-dir")]
        local_dirs: Vec<PathBuf>,

        /// Never ask about tracks already present
        #[arg(short = 'I', long)]
        ignore_all: bool,

        /// What --ignore-all does with tracks already present
        #[arg(long, value_enum)]
        ignore_all_policy: Option<IgnoreAllPolicy>,

        /// Decide and report without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Print the final report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Print how many playlist files exist and their total size
    Size {
        /// Playlist file
        playlist: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config = CliConfig::load_or_default(cli.config.as_deref()).await?;
    init_logging(cli.verbose, config.log_level.as_deref());

    match cli.command {
        Commands::Sync {
            playlist,
            dest,
            pattern,
            local_dirs,
            ignore_all,
            ignore_all_policy,
            dry_run,
            json,
        } => {
            let overrides = SyncOverrides {
                pattern,
                local_dirs,
                ignore_all,
                ignore_all_policy,
                dry_run,
            };
            let options = config.sync_options(&overrides)?;
            debug!("Sync options: {:?}", options);
            info!("Syncing '{}' to '{}'", playlist.display(), dest.display());

            let mut port = BlockingPort::new(TerminalPort::stdio());
            let report = sync_playlist(&playlist, &dest, options, &mut port)
                .await
                .with_context(|| format!("Sync of '{}' failed", playlist.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.summary());
            }
            Ok(report.exit_code() as u8)
        }
        Commands::Size { playlist } => {
            let set = playlist_size(&playlist)
                .await
                .with_context(|| format!("Failed to size '{}'", playlist.display()))?;
            println!("{}", set.size_summary());
            for missing in set.missing() {
                println!("missing: {}", missing.display());
            }
            Ok(0)
        }
    }
}

fn init_logging(verbose: u8, config_level: Option<&str>) {
    let level = match verbose {
        0 => config_level.unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("tracksync={level}"))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sync_arguments() {
        let cli = Cli::try_parse_from([
            "tracksync", "-vv", "sync", "list.m3u", "/media/usb", "-p", "%a/%t", "-l", "/srv/music", "-l",
            "~/Music", "-I", "--ignore-all-policy", "skip", "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Sync {
                playlist,
                dest,
                pattern,
                local_dirs,
                ignore_all,
                ignore_all_policy,
                dry_run,
                json,
            } => {
                assert_eq!(playlist, PathBuf::from("list.m3u"));
                assert_eq!(dest, PathBuf::from("/media/usb"));
                assert_eq!(pattern.as_deref(), Some("%a/%t"));
                assert_eq!(local_dirs.len(), 2);
                assert!(ignore_all);
                assert_eq!(ignore_all_policy, Some(IgnoreAllPolicy::Skip));
                assert!(dry_run);
                assert!(!json);
            }
            Commands::Size { .. } => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn test_parse_size() {
        let cli = Cli::try_parse_from(["tracksync", "size", "list.m3u"]).unwrap();
        assert!(matches!(cli.command, Commands::Size { .. }));
    }

    #[test]
    fn test_sync_requires_destination() {
        assert!(Cli::try_parse_from(["tracksync", "sync", "list.m3u"]).is_err());
    }
}
