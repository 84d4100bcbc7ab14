use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::Level;

use subpair::cli::{Args, Command};
use subpair::collector::DirectoryCollector;
use subpair::config::{self, Config};
use subpair::metadata::LocalMetadataService;
use subpair::report;
use subpair::session::UploadSession;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    match args.command {
        Some(Command::Pair {
            paths,
            threshold,
            enrich,
            json,
        }) => {
            let mut config = load_config(args.config.as_deref())?;
            if let Some(threshold) = threshold {
                config.pairing.min_similarity = threshold;
            }

            let mut session = UploadSession::new(&config);
            session.collect(&paths);
            session.pair()?;

            if enrich && config.metadata.enabled {
                if !json {
                    eprintln!("🔍 Hashing files and guessing metadata...");
                }
                let service = Arc::new(LocalMetadataService::new(config.metadata.clone()));
                session.enrich(service).await?;
            }

            let Some(result) = session.result() else {
                anyhow::bail!("No pairing result produced");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(result)?);
            } else {
                print!("{}", report::format_result(result, session.errors()));
                println!(
                    "⏱️  Done in {:.2}s",
                    session.elapsed().num_milliseconds() as f64 / 1000.0
                );
            }
        }
        Some(Command::Scan { paths, json }) => {
            let config = load_config(args.config.as_deref())?;
            let collector = DirectoryCollector::new(config.collector.clone());
            let collection = collector.collect(&paths);
            if json {
                println!("{}", serde_json::to_string_pretty(&collection)?);
            } else {
                print!("{}", report::format_collection(&collection));
            }
        }
        Some(Command::InitConfig { force }) => {
            let path = args.config.unwrap_or_else(config::get_config_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists; pass --force to overwrite it",
                    path.display()
                );
            }
            config::save_config(&Config::default(), &path)?;
            println!("✅ Wrote default configuration to {}", path.display());
        }
        None => {
            eprintln!("⚠️  No command specified.\n");
            eprintln!("ℹ️  subpair matches dropped subtitles to their videos.");
            eprintln!("   Run 'subpair --help' to see all available commands.\n");
            eprintln!("Quick Start:");
            eprintln!("  subpair pair <PATH>...   Pair videos and subtitles");
            eprintln!("  subpair scan <PATH>...   List collected files");
            eprintln!("  subpair init-config      Write a default config file\n");

            std::process::exit(1);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    }
}
