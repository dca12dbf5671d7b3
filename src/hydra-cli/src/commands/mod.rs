//! Command handlers for hydra CLI
//!
//! Each subcommand has its own module with handler functions.

pub mod configure;
pub mod container;
pub mod memory;

use hydra::{export_all, Asset, ExportSummary, ExportTarget, Session};
use tracing::info;

use crate::progress::{self, Cancel};

/// Keep only assets matching the search terms
fn apply_filter(assets: Vec<Asset>, filter: Option<&str>) -> Vec<Asset> {
    match filter {
        Some(filter) => assets.into_iter().filter(|a| a.matches(filter)).collect(),
        None => assets,
    }
}

fn print_assets(assets: &[Asset]) {
    println!("{:<20} {:<36} {:<30} Info", "Type", "Name", "Path");
    for asset in assets {
        println!(
            "{:<20} {:<36} {:<30} {}",
            asset.kind.name(),
            asset.name,
            asset.path,
            asset.info()
        );
    }
    println!();
    println!("{} asset{}", assets.len(), if assets.len() == 1 { "" } else { "s" });
}

/// Export with a progress bar, then report the outcome
fn run_export(session: &Session, assets: &[Asset], target: &ExportTarget, cancel: &Cancel) -> ExportSummary {
    let pb = progress::bar(assets.len() as u64);

    let summary = export_all(
        session,
        assets,
        target,
        |_, asset| {
            pb.set_message(asset.name.clone());
            pb.inc(1);
        },
        || cancel.is_cancelled(),
    );

    pb.finish_with_message(summary.message());

    for failure in &summary.failures {
        eprintln!("  {} ({}): {}", failure.path, failure.kind, failure.error);
    }
    if summary.cancelled {
        println!("Export stopped early.");
    }
    println!("{}", summary.message());
    info!(
        exported = summary.exported,
        failed = summary.failed,
        root = %target.root().display(),
        "Export finished"
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra::{AssetHeader, AssetKind, Backing};

    fn asset(path: &str) -> Asset {
        Asset::new(AssetKind::RawFile, Backing::Container, path.to_string(), 0, AssetHeader::Size(0))
    }

    #[test]
    fn test_apply_filter() {
        let assets = vec![asset("scripts/zm/a.gsc"), asset("maps/b.ents"), asset("ui/c.lua")];

        let all = apply_filter(assets.clone(), None);
        assert_eq!(all.len(), 3);

        let some = apply_filter(assets, Some("zm ui"));
        let paths: Vec<_> = some.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec!["scripts/zm/a.gsc", "ui/c.lua"]);
    }
}
