//! dotnet CLI invocations and binlog bookkeeping.
//!
//! Thin constructors over [`ProcessHandle`]; one function per toolchain
//! step the harness drives.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::E2eResult;
use crate::process::ProcessHandle;

/// Path for an MSBuild binary log under `<solution root>/binlogs`,
/// timestamped so parallel cases never collide. Creates the directory.
pub fn binlog_path(
    solution_root: &Path,
    sdk_major: u32,
    action: &str,
    project: &str,
    target_framework: u32,
) -> E2eResult<PathBuf> {
    let dir = solution_root.join("binlogs");
    std::fs::create_dir_all(&dir)?;
    let stamp = Local::now().format("%Y-%m-%d-%H%M%S%.3f");
    Ok(dir.join(format!(
        "{stamp}-sdk-{sdk_major}-{action}-{project}-net{target_framework}.binlog"
    )))
}

/// `dotnet --version`, resolved against the `global.json` visible from
/// `workdir`.
pub fn version(workdir: &Path) -> E2eResult<ProcessHandle> {
    ProcessHandle::start("dotnet", &["--version"], workdir)
}

/// `dotnet build -f net{N}.0 -bl:<binlog>` in the project directory.
pub fn build(project_dir: &Path, target_framework: u32, binlog: &Path) -> E2eResult<ProcessHandle> {
    let framework = format!("net{target_framework}.0");
    let binlog = format!("-bl:{}", binlog.display());
    ProcessHandle::start("dotnet", &["build", "-f", &framework, &binlog], project_dir)
}

/// `dotnet run -f net{N}.0 --no-build --urls <url>`; the long-lived server
/// step, killed by the harness after verification.
pub fn run(project_dir: &Path, target_framework: u32, url: &str) -> E2eResult<ProcessHandle> {
    let framework = format!("net{target_framework}.0");
    ProcessHandle::start(
        "dotnet",
        &["run", "-f", &framework, "--no-build", "--urls", url],
        project_dir,
    )
}

/// `dotnet publish -c Release -f net{N}.0 -o <dist> -bl:<binlog>`.
pub fn publish(
    project_dir: &Path,
    target_framework: u32,
    out_dir: &Path,
    binlog: &Path,
) -> E2eResult<ProcessHandle> {
    let framework = format!("net{target_framework}.0");
    let out = out_dir.display().to_string();
    let binlog = format!("-bl:{}", binlog.display());
    ProcessHandle::start(
        "dotnet",
        &["publish", "-c", "Release", "-f", &framework, "-o", &out, &binlog],
        project_dir,
    )
}

/// `dotnet exec <dll> --urls <url>` against a publish output directory.
pub fn exec(dist_dir: &Path, dll: &str, url: &str) -> E2eResult<ProcessHandle> {
    ProcessHandle::start("dotnet", &["exec", dll, "--urls", url], dist_dir)
}

/// `dotnet tool restore`, required once before the `serve` fallback.
pub fn tool_restore(dir: &Path) -> E2eResult<ProcessHandle> {
    ProcessHandle::start("dotnet", &["tool", "restore"], dir)
}

/// `dotnet serve` static-file fallback for standalone WASM publish output,
/// run from the directory carrying the tool manifest.
pub fn serve(tool_dir: &Path, wwwroot: &Path, port: u16) -> E2eResult<ProcessHandle> {
    let dir = format!("-d:{}", wwwroot.display());
    let port = format!("-p:{port}");
    ProcessHandle::start(
        "dotnet",
        &["serve", &dir, &port, "--default-extensions:html"],
        tool_dir,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use tempfile::TempDir;

    #[test]
    fn binlog_path_encodes_case_and_timestamp() {
        let root = TempDir::new().unwrap();
        let path = binlog_path(root.path(), 9, "build", "MainServerApp", 8).unwrap();

        assert!(root.path().join("binlogs").is_dir());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let pattern = Regex::new(
            r"^\d{4}-\d{2}-\d{2}-\d{6}\.\d{3}-sdk-9-build-MainServerApp-net8\.binlog$",
        )
        .unwrap();
        assert!(pattern.is_match(&name), "unexpected binlog name: {name}");
    }
}
