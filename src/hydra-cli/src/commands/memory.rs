//! Memory command handlers
//!
//! Attaches to the running game and lists or exports assets from its pools.

use anyhow::{Context, Result};
use hydra::{ExportTarget, Session};
use std::path::Path;
use std::time::Duration;

use super::{apply_filter, print_assets, run_export};
use crate::cli::MemoryAction;
use crate::config::Config;
use crate::process::GameProcess;
use crate::progress::Cancel;

pub fn handle(pid: Option<u32>, action: MemoryAction) -> Result<()> {
    let config = Config::load()?;
    let profile = config.profile()?;
    let process = GameProcess::attach(pid, &config.process_name)?;

    if matches!(action, MemoryAction::Info) {
        println!("{}", process.info(&config.process_name));
    }

    let start = process
        .main_module(&config.process_name)
        .map(|module| module.start)
        .unwrap_or(0);
    let session = Session::attach(Box::new(process), profile, start)
        .context("Failed to locate asset pools. Is the profile right for this build?")?;

    match action {
        MemoryAction::Info => info(&session),
        MemoryAction::List { filter } => {
            let assets = session.enumerate(|kind| config.is_enabled(kind), || false)?;
            print_assets(&apply_filter(assets, filter.as_deref()));
            Ok(())
        }
        MemoryAction::Export {
            output,
            filter,
            timeout,
        } => {
            let root = output.as_deref().unwrap_or(config.export_dir.as_path());
            export(&session, &config, root, filter.as_deref(), timeout)
        }
    }
}

fn info(session: &Session) -> Result<()> {
    let index = session.pool_index().context("Session has no pool index")?;
    println!("Profile: {}", index.profile.name);
    println!("Pool Table: {:#x}", index.table);
    println!();
    println!("{:<24} {:>8} {:>8} {:>8}", "Pool", "Count", "Capacity", "Stride");

    for (slot, name) in index.profile.pools.iter().enumerate() {
        if hydra::AssetKind::from_pool_name(name).is_none() {
            continue;
        }
        match index.descriptor(session.source(), slot) {
            Some(pool) => println!(
                "{:<24} {:>8} {:>8} {:>8}",
                name, pool.count, pool.capacity, pool.stride
            ),
            None => println!("{:<24} unreadable", name),
        }
    }

    Ok(())
}

fn export(
    session: &Session,
    config: &Config,
    root: &Path,
    filter: Option<&str>,
    timeout: Option<u64>,
) -> Result<()> {
    let cancel = Cancel::with_timeout(timeout.map(Duration::from_secs));
    let assets = session.enumerate(|kind| config.is_enabled(kind), || cancel.is_cancelled())?;
    let assets = apply_filter(assets, filter);

    run_export(session, &assets, &ExportTarget::new(root), &cancel);
    Ok(())
}
