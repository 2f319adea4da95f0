#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::style)]

use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use proxylink::cli::{Args, Command};
use proxylink::manager::ProfileManager;
use proxylink::settings::{Settings, expand_tilde};
use tracing::Level;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let is_verbose = args.verbose;
    tracing_subscriber::fmt()
        .with_max_level(if is_verbose {
            Level::TRACE
        } else {
            Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::load(args.config.as_deref()).await?;
    let input = match &args.command {
        Command::Import { file } | Command::ImportBatch { file, .. } => {
            Some(read_input(file.as_deref()).await?)
        }
        _ => None,
    };

    tokio::task::spawn_blocking(move || {
        let manager = ProfileManager::from_settings(&settings)?;
        execute(&manager, args.command, input.unwrap_or_default())
    })
    .await
    .context("Command task panicked")?
}

async fn read_input(file: Option<&str>) -> Result<String> {
    match file {
        Some(path) => {
            let path = expand_tilde(path);
            tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read input from {}", path))
        }
        None => tokio::task::spawn_blocking(|| {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read stdin")?;
            Ok(content)
        })
        .await
        .context("Stdin task panicked")?,
    }
}

fn execute(manager: &ProfileManager, command: Command, input: String) -> Result<()> {
    match command {
        Command::Import { .. } => {
            let outcome = manager.import_from_pasted_text(&input);
            println!("{outcome}");
        }
        Command::ImportBatch { sub, append, .. } => {
            let imported = manager.import_batch(&input, &sub, append);
            println!("{imported} configs");
        }
        Command::SubAdd {
            remarks,
            url,
            filter,
        } => {
            let id = manager.add_subscription(&remarks, &url, filter.as_deref())?;
            println!("{id}");
        }
        Command::Sync { id: Some(id) } => {
            let outcome = manager.sync_subscription(&id)?;
            println!("{id}: {outcome}");
        }
        Command::Sync { id: None } => {
            let summary = manager.sync_all_subscriptions();
            for (id, remarks, outcome) in &summary.results {
                println!("{id}\t{remarks}\t{outcome}");
            }
            println!("{summary}");
        }
        Command::Share { all: true, .. } => {
            let ids: Vec<String> = manager
                .list_configs()?
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            println!("{}", manager.share_all(&ids));
        }
        Command::Share { id, .. } => {
            let id = id.unwrap_or_default();
            let uri = manager.share_as_uri(&id)?;
            if uri.is_empty() {
                tracing::warn!("Profile {} is not shareable", id);
            } else {
                println!("{uri}");
            }
        }
        Command::List => {
            let selected = manager.selected_config_id()?;
            for (id, profile) in manager.list_configs()? {
                let marker = if selected.as_deref() == Some(id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{marker} {id}\t{}\t{}\t{}",
                    profile.config_type(),
                    profile.remarks,
                    profile.endpoint()
                );
            }
            for (id, sub) in manager.list_subscriptions()? {
                println!("  {id}\t[sub]\t{}\t{}", sub.remarks, sub.url);
            }
        }
        Command::Select { id } => manager.select(&id)?,
    }
    Ok(())
}
