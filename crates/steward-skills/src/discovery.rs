use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Result, SkillError};
use crate::types::SkillManifest;

/// Scans two directories in priority order (universal, then local) for
/// `*/SKILL.toml` manifests — spec.md §4.7's dual-path discovery. A name
/// present in both resolves to the higher-priority (universal) one; the
/// lower-priority duplicate is skipped and logged. Manifests with
/// `enabled = false` are dropped entirely.
pub fn discover_manifests(universal_dir: &Path, local_dir: &Path) -> Result<Vec<SkillManifest>> {
    let mut seen = HashSet::new();
    let mut manifests = Vec::new();

    scan_dir(universal_dir, &mut seen, &mut manifests)?;
    scan_dir(local_dir, &mut seen, &mut manifests)?;

    Ok(manifests.into_iter().filter(|m| m.enabled).collect())
}

fn scan_dir(dir: &Path, seen: &mut HashSet<String>, out: &mut Vec<SkillManifest>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| SkillError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let manifest_path = path.join("SKILL.toml");
        if !manifest_path.is_file() {
            continue;
        }

        let raw = match std::fs::read_to_string(&manifest_path) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %manifest_path.display(), error = %e, "skipping unreadable skill manifest");
                continue;
            }
        };

        let manifest: SkillManifest = match toml::from_str(&raw) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %manifest_path.display(), error = %e, "skipping invalid skill manifest");
                continue;
            }
        };

        if seen.contains(&manifest.name) {
            info!(name = %manifest.name, path = %manifest_path.display(), "skipping duplicate skill name, higher-priority path already claimed it");
            continue;
        }

        seen.insert(manifest.name.clone());
        debug!(name = %manifest.name, path = %manifest_path.display(), "skill manifest discovered");
        out.push(manifest);
    }

    Ok(())
}
