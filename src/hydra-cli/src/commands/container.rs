//! Fast file command handlers
//!
//! Handles `decode`, `list` and `export` on container files.

use anyhow::{bail, Context, Result};
use hydra::{ContainerOptions, ExportTarget, Session};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;

use super::{apply_filter, print_assets, run_export};
use crate::config::Config;
use crate::progress::{self, Cancel};

/// Decode a fast file to disk without scanning it
pub fn decode(input: &Path, output: Option<&Path>) -> Result<()> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| hydra::decoded_path_for(input));

    let data = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    let pb = progress::percent_bar("Decoding");
    let result = hydra_ff::decode(&data, &mut writer, |percent| {
        pb.set_position(percent as u64);
        true
    });
    pb.finish_and_clear();

    let (header, summary) = match result {
        Ok(decoded) => decoded,
        Err(e) => {
            drop(writer);
            let _ = fs::remove_file(&output);
            return Err(e).with_context(|| format!("Failed to decode {}", input.display()));
        }
    };
    writer.flush()?;

    println!("Version:     {:#x}", header.version);
    println!("Compression: {:?}", header.compression);
    println!("Blocks:      {}", summary.blocks);
    if summary.skipped > 0 {
        println!("Resynced:    {}", summary.skipped);
    }
    println!("Decoded:     {} bytes", summary.bytes_out);
    println!("Written to:  {}", output.display());

    Ok(())
}

fn open(input: &Path, keep_decoded: bool) -> Result<Session> {
    let options = ContainerOptions { keep_decoded };
    let pb = progress::percent_bar("Decoding");
    let session = Session::open_container(input, &options, |percent| {
        pb.set_position(percent as u64);
        true
    });
    pb.finish_and_clear();

    session.with_context(|| format!("Failed to open {}", input.display()))
}

/// List the assets found in a fast file
pub fn list(input: &Path, filter: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let session = open(input, config.keep_decoded)?;

    let assets = session.enumerate(|kind| config.is_enabled(kind), || false)?;
    let assets = apply_filter(assets, filter);

    print_assets(&assets);
    Ok(())
}

/// Export assets from a fast file, or from every .ff file under a directory
pub fn export(
    input: &Path,
    output: Option<&Path>,
    filter: Option<&str>,
    keep_decoded: bool,
    timeout: Option<u64>,
) -> Result<()> {
    let config = Config::load()?;
    let root = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.export_dir.clone());
    let target = ExportTarget::new(root);
    let keep_decoded = keep_decoded || config.keep_decoded;
    let cancel = Cancel::with_timeout(timeout.map(Duration::from_secs));

    let files = fast_files(input)?;
    if files.is_empty() {
        bail!("No .ff files found in {}", input.display());
    }

    for file in &files {
        if cancel.is_cancelled() {
            break;
        }
        println!("{}", file.display());

        let session = match open(file, keep_decoded) {
            Ok(session) => session,
            Err(e) if files.len() > 1 => {
                warn!("{:#}", e);
                continue;
            }
            Err(e) => return Err(e),
        };

        let assets = session.enumerate(|kind| config.is_enabled(kind), || cancel.is_cancelled())?;
        let assets = apply_filter(assets, filter);
        info!(file = %file.display(), count = assets.len(), "Exporting assets");

        run_export(&session, &assets, &target, &cancel);
    }

    Ok(())
}

/// The input itself, or every .ff file below it when it is a directory
fn fast_files(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        if !input.exists() {
            bail!("{} does not exist", input.display());
        }
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("ff")))
        .collect();
    files.sort();
    Ok(files)
}
