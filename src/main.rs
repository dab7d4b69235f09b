// Clinic Scheduler
// Headless runner: keeps the current week's pending appointments completed
// as they elapse and follows changes made by other sessions.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};

use clinic_scheduler::interaction::TimeGrid;
use clinic_scheduler::services::config::AppConfig;
use clinic_scheduler::services::database::Database;
use clinic_scheduler::services::feed::ChangeFeed;
use clinic_scheduler::services::sweeper::AutoCompletionSweeper;
use clinic_scheduler::services::sync::ScheduleSync;

fn load_config() -> Result<AppConfig> {
    match std::env::args().nth(1) {
        Some(path) => AppConfig::load(&PathBuf::from(path)),
        None => AppConfig::load_default(),
    }
}

fn open_database(config: &AppConfig) -> Result<Database> {
    let path = config.resolve_database_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
    }

    let path = path
        .to_str()
        .ok_or_else(|| anyhow!("Database path is not valid UTF-8: {}", path.display()))?;
    let db = Database::new(path)?;
    db.initialize_schema()?;
    log::info!("Using database at {}", path);
    Ok(db)
}

fn main() -> Result<()> {
    env_logger::init();
    log::info!("Starting clinic scheduler sweeper");

    let config = load_config()?;
    let db = open_database(&config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(run(config, db))
}

fn sweep(sweeper: &mut AutoCompletionSweeper, sync: &mut ScheduleSync<'_, Database>) {
    let result = sweeper.tick(sync);
    if !result.skipped && result.attempted_count() > 0 {
        log::debug!(
            "Sweep: {} due, {} completed",
            result.attempted_count(),
            result.completed
        );
    }
}

/// Sweeps on a timer. Change notifications from the realtime service arrive
/// as one JSON payload per line on stdin; a relevant one refetches the week,
/// which triggers an early sweep when the visible set changed.
async fn run(config: AppConfig, db: Database) -> Result<()> {
    let feed = ChangeFeed::default();
    let grid = TimeGrid::new(config.grid.clone());
    let mut sync = ScheduleSync::new(&db, grid, config.facility_id.clone()).with_feed(&feed);
    let mut sweeper = AutoCompletionSweeper::new(config.sweep_interval());

    if let Err(err) = sync.load_week(Local::now().date_naive()) {
        log::warn!("Initial load failed: {:#}", err);
    }

    let mut payloads = BufReader::new(tokio::io::stdin()).lines();
    let mut payloads_open = true;

    let mut ticker = tokio::time::interval(config.sweep_interval());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Follow the calendar into the next week
                let today = Local::now().date_naive();
                if let Err(err) = sync.load_week(today) {
                    log::warn!("Refresh failed: {:#}", err);
                    continue;
                }
                sweep(&mut sweeper, &mut sync);
            }
            line = payloads.next_line(), if payloads_open => {
                match line {
                    Ok(Some(payload)) if payload.trim().is_empty() => {}
                    Ok(Some(payload)) => {
                        if let Err(err) = feed.publish_json(&payload) {
                            log::warn!("Ignoring change notification: {:#}", err);
                            continue;
                        }
                        match sync.poll_notifications() {
                            Ok(true) => sweep(&mut sweeper, &mut sync),
                            Ok(false) => {}
                            Err(err) => log::warn!("{:#}", err),
                        }
                    }
                    Ok(None) => {
                        log::info!("Change notification input closed");
                        payloads_open = false;
                    }
                    Err(err) => {
                        log::warn!("Failed to read change notifications: {}", err);
                        payloads_open = false;
                    }
                }
            }
            _ = &mut shutdown => {
                log::info!("Shutting down");
                return Ok(());
            }
        }
    }
}
