//! Workspace provisioning: isolated per-case copies of the fixture solution.
//!
//! Each test case gets its own temporary directory holding a filtered deep
//! copy of the solution tree plus a freshly generated `global.json` pinning
//! the SDK. The directory is removed when the [`Workspace`] drops, on every
//! exit path.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{E2eError, E2eResult};

/// Marker file identifying the fixture solution root.
pub const SOLUTION_MARKER: &str = "BlazorMixApps.slnx";

/// Entry names never copied into a workspace, at any depth.
pub const DEFAULT_EXCLUDES: &[&str] = &["dist", "Tests", "bin", "obj", "work", "binlogs", "target"];

/// Locate the solution root by ascending from the current directory until
/// [`SOLUTION_MARKER`] is found.
pub fn find_solution_root() -> E2eResult<PathBuf> {
    find_solution_root_from(&std::env::current_dir()?)
}

/// Same as [`find_solution_root`], starting from an explicit directory.
pub fn find_solution_root_from(start: &Path) -> E2eResult<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(SOLUTION_MARKER).is_file() {
            return Ok(dir);
        }
        if !dir.pop() {
            return Err(E2eError::Setup(format!(
                "no {} found in {} or any of its ancestors",
                SOLUTION_MARKER,
                start.display()
            )));
        }
    }
}

/// The generated `global.json` content pinning the SDK for one workspace.
///
/// Written once before any build step and never mutated afterward.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkPin {
    pub version: String,
    pub roll_forward: String,
    pub allow_prerelease: bool,
}

impl SdkPin {
    /// Pin policy per SDK major: 10 is still prerelease and must not roll
    /// forward past the pinned build; 8/9 accept any later minor.
    pub fn for_sdk_major(major: u32) -> Self {
        let version = match major {
            10 => "10.0.100-rc.1.25451.107".to_string(),
            _ => format!("{major}.0.0"),
        };
        let roll_forward = match major {
            10 => "disable".to_string(),
            _ => "latestMinor".to_string(),
        };
        SdkPin {
            version,
            roll_forward,
            allow_prerelease: major >= 9,
        }
    }
}

#[derive(Serialize)]
struct GlobalJson<'a> {
    sdk: &'a SdkPin,
}

/// An isolated directory holding one test case's copy of the solution.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Deep-copy every entry of `source_root` not rejected by `exclude`
    /// into a fresh temporary directory. `exclude` sees bare entry names
    /// and applies at every directory level.
    pub fn provision(source_root: &Path, exclude: impl Fn(&str) -> bool) -> E2eResult<Self> {
        let dir = TempDir::with_prefix("blazormix-e2e-")
            .map_err(|e| E2eError::Setup(format!("failed to create workspace dir: {e}")))?;
        copy_tree(source_root, dir.path(), &exclude)?;
        debug!(workspace = %dir.path().display(), "provisioned workspace");
        Ok(Workspace { dir })
    }

    /// [`Workspace::provision`] with the standard exclusion set: dot-entries
    /// and the build/output directories in [`DEFAULT_EXCLUDES`].
    pub fn provision_default(source_root: &Path) -> E2eResult<Self> {
        Self::provision(source_root, |name| {
            name.starts_with('.') || DEFAULT_EXCLUDES.contains(&name)
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write the toolchain pin file (`global.json`) at the workspace root.
    pub fn write_global_json(&self, pin: &SdkPin) -> E2eResult<()> {
        let json = serde_json::to_string_pretty(&GlobalJson { sdk: pin })?;
        fs::write(self.dir.path().join("global.json"), json)?;
        Ok(())
    }
}

fn copy_tree(src: &Path, dst: &Path, exclude: &impl Fn(&str) -> bool) -> E2eResult<()> {
    let walker = WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| !exclude(&entry.file_name().to_string_lossy()));

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| E2eError::Setup(format!("path outside source root: {e}")))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
