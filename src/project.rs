//! Project descriptor mutation.
//!
//! Rewrites the `<TargetFramework>` of a fixture project in place and
//! promotes version-specific fallback pages when the target framework
//! crosses their threshold. Each workspace is mutated exactly once, before
//! any build step.

use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Rewrite the first `<TargetFramework>` element of `csproj` to
/// `net{ver}.0`, leaving everything else byte-for-byte intact.
///
/// A missing element means the fixture itself is broken, so this fails
/// fast instead of treating it as a transient condition.
pub fn set_target_framework(csproj: &Path, ver: u32) -> E2eResult<()> {
    let text = fs::read_to_string(csproj)?;
    let pattern =
        Regex::new(r"<TargetFramework>[^<]*</TargetFramework>").expect("valid static pattern");
    if !pattern.is_match(&text) {
        return Err(E2eError::Setup(format!(
            "no <TargetFramework> element in {}",
            csproj.display()
        )));
    }
    let replacement = format!("<TargetFramework>net{ver}.0</TargetFramework>");
    let updated = pattern.replace(&text, replacement.as_str());
    fs::write(csproj, updated.as_bytes())?;
    debug!(csproj = %csproj.display(), "target framework set to net{ver}.0");
    Ok(())
}

/// Apply the full descriptor mutation for one project: target framework
/// rewrite plus the versioned fallback-page swaps.
pub fn update_project(csproj: &Path, ver: u32) -> E2eResult<()> {
    set_target_framework(csproj, ver)?;

    let project_dir = csproj
        .parent()
        .ok_or_else(|| E2eError::Setup(format!("{} has no parent directory", csproj.display())))?;

    promote_versioned_file(&project_dir.join("wwwroot"), "index.html", "index.net10.html", 10, ver)?;
    promote_versioned_file(&project_dir.join("Pages"), "_Host.cshtml", "_Host.net9.cshtml", 9, ver)?;
    Ok(())
}

/// If `versioned_name` exists in `dir`: promote it over `default_name`
/// when `ver >= min_ver`, otherwise discard it. Exactly one of the two
/// files remains under the default name either way.
fn promote_versioned_file(
    dir: &Path,
    default_name: &str,
    versioned_name: &str,
    min_ver: u32,
    ver: u32,
) -> E2eResult<()> {
    let versioned = dir.join(versioned_name);
    if !versioned.is_file() {
        return Ok(());
    }
    let default = dir.join(default_name);
    if ver >= min_ver {
        if default.exists() {
            fs::remove_file(&default)?;
        }
        fs::rename(&versioned, &default)?;
        debug!(dir = %dir.display(), "{versioned_name} promoted to {default_name}");
    } else {
        fs::remove_file(&versioned)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE_CSPROJ: &str = "<Project Sdk=\"Microsoft.NET.Sdk.BlazorWebAssembly\">\n\n  <PropertyGroup>\n    <TargetFramework>net8.0</TargetFramework>\n    <Nullable>enable</Nullable>\n  </PropertyGroup>\n\n</Project>\n";

    #[test]
    fn rewrites_only_the_target_framework() {
        let dir = TempDir::new().unwrap();
        let csproj = dir.path().join("App.csproj");
        fs::write(&csproj, SAMPLE_CSPROJ).unwrap();

        set_target_framework(&csproj, 10).unwrap();

        let updated = fs::read_to_string(&csproj).unwrap();
        assert!(updated.contains("<TargetFramework>net10.0</TargetFramework>"));
        assert!(updated.contains("<Nullable>enable</Nullable>"));
        assert_eq!(
            updated.replace("net10.0", "net8.0"),
            SAMPLE_CSPROJ,
            "everything except the version must be untouched"
        );
    }

    #[test]
    fn missing_target_framework_is_a_setup_error() {
        let dir = TempDir::new().unwrap();
        let csproj = dir.path().join("App.csproj");
        fs::write(&csproj, "<Project></Project>").unwrap();

        let err = set_target_framework(&csproj, 9).unwrap_err();
        assert!(matches!(err, E2eError::Setup(_)), "got {err}");
    }

    #[test]
    fn versioned_page_promoted_at_or_above_threshold() {
        let dir = TempDir::new().unwrap();
        let wwwroot = dir.path().join("wwwroot");
        fs::create_dir(&wwwroot).unwrap();
        fs::write(wwwroot.join("index.html"), "old").unwrap();
        fs::write(wwwroot.join("index.net10.html"), "new").unwrap();

        promote_versioned_file(&wwwroot, "index.html", "index.net10.html", 10, 10).unwrap();

        assert_eq!(fs::read_to_string(wwwroot.join("index.html")).unwrap(), "new");
        assert!(!wwwroot.join("index.net10.html").exists());
    }

    #[test]
    fn versioned_page_discarded_below_threshold() {
        let dir = TempDir::new().unwrap();
        let wwwroot = dir.path().join("wwwroot");
        fs::create_dir(&wwwroot).unwrap();
        fs::write(wwwroot.join("index.html"), "old").unwrap();
        fs::write(wwwroot.join("index.net10.html"), "new").unwrap();

        promote_versioned_file(&wwwroot, "index.html", "index.net10.html", 10, 8).unwrap();

        assert_eq!(fs::read_to_string(wwwroot.join("index.html")).unwrap(), "old");
        assert!(!wwwroot.join("index.net10.html").exists());
    }

    #[test]
    fn absent_versioned_page_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        promote_versioned_file(dir.path(), "index.html", "index.net10.html", 10, 10).unwrap();
    }
}
