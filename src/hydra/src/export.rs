//! Export pipeline

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use crate::asset::{Asset, AssetKind};
use crate::session::Session;
use crate::Result;

/// Directory that exported files are written under.
///
/// Asset paths come from the data being read, so every relative path is
/// reduced to plain components before it is joined to the root.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    root: PathBuf,
}

impl ExportTarget {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path (either separator) inside the root
    pub fn path(&self, relative: &str) -> PathBuf {
        let mut path = self.root.clone();
        for part in relative.split(['/', '\\']) {
            if is_plain_component(part) {
                path.push(part);
            }
        }
        path
    }

    /// Write a file, creating parent directories as needed
    pub fn write(&self, relative: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        debug!(path = %path.display(), "Wrote file");
        Ok(path)
    }
}

fn is_plain_component(part: &str) -> bool {
    !part.is_empty()
        && !part.contains(':')
        && matches!(Path::new(part).components().next(), Some(Component::Normal(_)))
}

/// An asset that failed to export
#[derive(Debug, Clone)]
pub struct ExportFailure {
    pub path: String,
    pub kind: AssetKind,
    pub error: String,
}

/// Counts from an export run
#[derive(Debug, Default, Clone)]
pub struct ExportSummary {
    pub exported: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub failures: Vec<ExportFailure>,
}

impl ExportSummary {
    /// Completion message shown to the user
    pub fn message(&self) -> String {
        format!(
            "{} Asset{} Exported. {} Failed to export.",
            self.exported,
            if self.exported == 1 { "" } else { "s" },
            self.failed
        )
    }
}

/// Export each asset in order.
///
/// `cancelled` is checked before every asset and `progress` receives the
/// percentage done with the asset about to be exported. A failing asset is
/// logged and counted; it never stops the run.
pub fn export_all<P, C>(
    session: &Session,
    assets: &[Asset],
    target: &ExportTarget,
    mut progress: P,
    cancelled: C,
) -> ExportSummary
where
    P: FnMut(f32, &Asset),
    C: Fn() -> bool,
{
    let mut summary = ExportSummary::default();
    let total = assets.len();

    for (i, asset) in assets.iter().enumerate() {
        if cancelled() {
            info!(done = i, total, "Export cancelled");
            summary.cancelled = true;
            break;
        }

        progress(i as f32 / total as f32 * 100.0, asset);
        info!("Exporting {}", asset.path);

        match asset.kind.export(session, asset, target) {
            Ok(()) => {
                info!("Exported {} successfully.", asset.path);
                summary.exported += 1;
            }
            Err(e) => {
                warn!(kind = %asset.kind, "Failed to export {}: {}", asset.path, e);
                summary.failed += 1;
                summary.failures.push(ExportFailure {
                    path: asset.path.clone(),
                    kind: asset.kind,
                    error: e.to_string(),
                });
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetHeader, Backing};
    use std::cell::Cell;

    #[test]
    fn test_target_path_strips_escapes() {
        let target = ExportTarget::new("/out");
        assert_eq!(
            target.path("scripts/zm/_zm.gsc"),
            PathBuf::from("/out/scripts/zm/_zm.gsc")
        );
        assert_eq!(
            target.path("..\\..\\windows\\system32\\x.dll"),
            PathBuf::from("/out/windows/system32/x.dll")
        );
        assert_eq!(target.path("/etc/passwd"), PathBuf::from("/out/etc/passwd"));
        assert_eq!(target.path("C:/x/./y.txt"), PathBuf::from("/out/x/y.txt"));
    }

    #[test]
    fn test_target_write_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = ExportTarget::new(dir.path());

        let path = target.write("a/b/c.txt", b"hello").unwrap();
        assert_eq!(path, dir.path().join("a/b/c.txt"));
        assert_eq!(fs::read(path).unwrap(), b"hello");
    }

    #[test]
    fn test_summary_message() {
        let mut summary = ExportSummary {
            exported: 1,
            ..Default::default()
        };
        assert_eq!(summary.message(), "1 Asset Exported. 0 Failed to export.");
        summary.exported = 12;
        summary.failed = 3;
        assert_eq!(summary.message(), "12 Assets Exported. 3 Failed to export.");
    }

    fn rawfile_session() -> (Session, Vec<Asset>) {
        // Decoded stream: empty string table, then two raw files
        let mut stream = vec![0u8; 4];
        let good = stream.len() as u64;
        stream.extend_from_slice(b"print(1)");

        let session = Session::from_decoded(stream).unwrap();
        let ok = Asset::new(
            AssetKind::RawFile,
            Backing::Container,
            "scripts/ok.lua".to_string(),
            0,
            AssetHeader::Size(8),
        )
        .with_payload(good, 8);
        let broken = Asset::new(
            AssetKind::RawFile,
            Backing::Container,
            "scripts/broken.txt".to_string(),
            0,
            AssetHeader::Size(64),
        )
        .with_payload(0x10_0000, 64);

        (session, vec![broken, ok.clone(), ok])
    }

    #[test]
    fn test_export_all_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let target = ExportTarget::new(dir.path());
        let (session, assets) = rawfile_session();

        let mut seen = Vec::new();
        let summary = export_all(&session, &assets, &target, |pct, _| seen.push(pct), || false);

        assert_eq!(summary.exported, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.cancelled);
        assert_eq!(summary.failures[0].path, "scripts/broken.txt");
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], 0.0);
        assert!(dir.path().join("scripts/ok.luac").exists());
    }

    #[test]
    fn test_export_all_cancels_between_assets() {
        let dir = tempfile::tempdir().unwrap();
        let target = ExportTarget::new(dir.path());
        let (session, assets) = rawfile_session();

        let checks = Cell::new(0);
        let summary = export_all(
            &session,
            &assets,
            &target,
            |_, _| {},
            || {
                checks.set(checks.get() + 1);
                checks.get() > 2
            },
        );

        assert!(summary.cancelled);
        assert_eq!(summary.exported + summary.failed, 2);
    }
}
