//! MyProfile follower sync driver
//!
//! Opens the local follower store, refreshes it once from the remote and
//! prints the profile card and follower list.
//!
//! Usage:
//!   myprofile-cli --db followers.db --remote https://jsonplaceholder.typicode.com

use std::{path::PathBuf, sync::Arc};
use anyhow::{Context, Result};
use clap::Parser;
use myprofile_storage::FollowerStore;
use myprofile_sync::{
    FollowerSync, HttpFollowerSource, HttpSourceConfig, ProfileSession, RefreshOutcome, Session,
    SyncConfig,
};
use myprofile_types::{FollowerRecord, ProfileState};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "myprofile-cli")]
#[command(about = "Refresh and print the MyProfile follower list")]
struct Args {
    /// Path to the follower database
    #[arg(short, long, default_value = "followers.db")]
    db: PathBuf,

    /// Base URL of the follower API
    #[arg(short, long)]
    remote: Option<String>,

    /// How long a removal can be undone, in milliseconds
    #[arg(long, default_value = "4000")]
    undo_window_ms: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let store = FollowerStore::open(&args.db)
        .with_context(|| format!("Failed to open follower store at {:?}", args.db))?;

    let source_config = match args.remote {
        Some(url) => HttpSourceConfig::with_base_url(url),
        None => HttpSourceConfig::default(),
    };
    info!("Using follower API at {}", source_config.followers_url());
    let source = Arc::new(
        HttpFollowerSource::new(source_config).context("Failed to build HTTP client")?,
    );

    let config = SyncConfig {
        undo_window_ms: args.undo_window_ms,
    };
    let followers = FollowerSync::open(Arc::new(store), source.clone(), config)
        .await
        .context("Failed to load cached followers")?;
    let session = Session::new(followers, ProfileSession::default().with_notifier(source));

    let cached = session.followers().len();
    match session.refresh().await {
        Ok(RefreshOutcome::Applied { generation, count }) => {
            info!("Refresh {} stored {} followers (cached: {})", generation, count, cached);
        }
        Ok(RefreshOutcome::Stale { generation, committed }) => {
            warn!("Refresh {} discarded, generation {} already stored", generation, committed);
        }
        Err(e) => {
            warn!("Refresh failed, showing {} cached followers: {}", cached, e);
        }
    }

    print_profile(&session.profile());
    print_followers(&session.followers());
    Ok(())
}

fn print_profile(profile: &ProfileState) {
    println!("\n========================================");
    println!("  {}", profile.name);
    println!("  {}", profile.bio);
    println!("  Followers: {}", profile.follower_count());
    println!("========================================\n");
}

fn print_followers(followers: &[FollowerRecord]) {
    if followers.is_empty() {
        println!("  No followers yet");
        return;
    }
    for follower in followers {
        let mark = if follower.following_state { "*" } else { " " };
        match &follower.email {
            Some(email) => println!(
                "{} {:>6}  {} <{}>",
                mark, follower.id, follower.display_name, email
            ),
            None => println!("{} {:>6}  {}", mark, follower.id, follower.display_name),
        }
    }
}
