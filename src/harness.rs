//! Per-case orchestration: workspace prep, build or publish, launch,
//! readiness wait, verification, teardown.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::browser::BrowserSession;
use crate::cases::TestCase;
use crate::dotnet;
use crate::error::{E2eError, E2eResult};
use crate::net;
use crate::process::ProcessOutcome;
use crate::project;
use crate::verify::{self, VerifyTarget};
use crate::workspace::{self, SdkPin, Workspace};

/// `dotnet run` emits restore/build chatter before the server banner, so
/// its idle window is longer than the publish-exec one.
const RUN_IDLE_TIMEOUT: Duration = Duration::from_millis(10_000);
const SERVE_IDLE_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Drives one test case end to end. Stateless apart from the resolved
/// solution root; safe to share across parallel cases.
pub struct Harness {
    solution_root: PathBuf,
}

impl Harness {
    /// Resolve the fixture solution root by ascending from the current
    /// directory.
    pub fn new() -> E2eResult<Self> {
        Ok(Harness {
            solution_root: workspace::find_solution_root()?,
        })
    }

    pub fn with_solution_root(solution_root: PathBuf) -> Self {
        Harness { solution_root }
    }

    pub fn solution_root(&self) -> &PathBuf {
        &self.solution_root
    }

    /// Copy the solution, pin the SDK, check the pin resolves, and mutate
    /// the project descriptors for this case.
    async fn prepare_workspace(&self, case: &TestCase) -> E2eResult<Workspace> {
        let ws = Workspace::provision_default(&self.solution_root)?;
        ws.write_global_json(&SdkPin::for_sdk_major(case.sdk_major))?;

        // Pre-flight: the pinned SDK must actually resolve in the workspace.
        let outcome = dotnet::version(ws.path())?.wait_for_exit().await?;
        expect_success("--version", &outcome)?;
        let want = format!("{}.", case.sdk_major);
        if !outcome.output.trim_start().starts_with(&want) {
            return Err(E2eError::Setup(format!(
                "expected SDK {want}x but `dotnet --version` reported: {}",
                outcome.output.trim()
            )));
        }

        let main_csproj = ws
            .path()
            .join(case.main_project)
            .join(format!("{}.csproj", case.main_project));
        project::update_project(&main_csproj, case.target_framework)?;

        // WasmApp0 multi-targets the same way the main apps do.
        let wasm0_csproj = ws
            .path()
            .join("Referenced")
            .join("WasmApp0")
            .join("WasmApp0.csproj");
        project::update_project(&wasm0_csproj, case.target_framework)?;

        Ok(ws)
    }

    /// Build the main project, launch it with `dotnet run`, and verify the
    /// Development-configuration behavior.
    pub async fn build_and_run(&self, case: &TestCase, session: &BrowserSession) -> E2eResult<()> {
        info!(case = %case.label(), "build-and-run");
        let ws = self.prepare_workspace(case).await?;
        let project_dir = ws.path().join(case.main_project);

        let binlog = dotnet::binlog_path(
            &self.solution_root,
            case.sdk_major,
            "build",
            case.main_project,
            case.target_framework,
        )?;
        let built = dotnet::build(&project_dir, case.target_framework, &binlog)?
            .wait_for_exit()
            .await?;
        expect_success("build", &built)?;

        let port = net::free_port()?;
        let url = format!("http://localhost:{port}");
        let mut server = dotnet::run(&project_dir, case.target_framework, &url)?;
        let started = server
            .wait_for_output(|out| out.contains("Application started"), RUN_IDLE_TIMEOUT)
            .await;
        if !started {
            let output = server.output();
            server.terminate().await;
            return Err(E2eError::OutputTimeout { step: "run".into(), output });
        }

        let target = VerifyTarget {
            main_project: case.main_project,
            referenced_projects: case.referenced_projects,
            base_url: &url,
            configuration: "Development",
        };
        let result = verify::verify(&target, session).await;
        server.terminate().await;
        result
    }

    /// Publish the main project, launch the publish output (host dll, or
    /// static serving for standalone WASM), and verify the
    /// Release-configuration behavior.
    pub async fn publish_and_run(&self, case: &TestCase, session: &BrowserSession) -> E2eResult<()> {
        info!(case = %case.label(), "publish");
        let ws = self.prepare_workspace(case).await?;
        let project_dir = ws.path().join(case.main_project);
        let dist_dir = ws.path().join("dist");

        let binlog = dotnet::binlog_path(
            &self.solution_root,
            case.sdk_major,
            "publish",
            case.main_project,
            case.target_framework,
        )?;
        let published = dotnet::publish(&project_dir, case.target_framework, &dist_dir, &binlog)?
            .wait_for_exit()
            .await?;
        expect_success("publish", &published)?;

        let port = net::free_port()?;
        let url = format!("http://localhost:{port}");
        let dll = format!("{}.dll", case.main_project);
        let wwwroot = dist_dir.join("wwwroot");

        let mut server = if dist_dir.join(&dll).is_file() {
            dotnet::exec(&dist_dir, &dll, &url)?
        } else if wwwroot.is_dir() {
            // Standalone WASM publish has no host dll; serve it statically
            // from the directory carrying the tool manifest.
            debug!("no {dll} in publish output, falling back to static serving");
            let restored = dotnet::tool_restore(&self.solution_root)?.wait_for_exit().await?;
            expect_success("tool restore", &restored)?;
            dotnet::serve(&self.solution_root, &wwwroot, port)?
        } else {
            return Err(E2eError::Setup(format!(
                "publish output at {} has neither {dll} nor wwwroot/",
                dist_dir.display()
            )));
        };

        let started = server
            .wait_for_output(
                |out| out.to_ascii_lowercase().contains("press ctrl+c to "),
                SERVE_IDLE_TIMEOUT,
            )
            .await;
        if !started {
            let output = server.output();
            server.terminate().await;
            return Err(E2eError::OutputTimeout { step: "exec".into(), output });
        }

        let target = VerifyTarget {
            main_project: case.main_project,
            referenced_projects: case.referenced_projects,
            base_url: &url,
            configuration: "Release",
        };
        let result = verify::verify(&target, session).await;
        server.terminate().await;
        result
    }
}

fn expect_success(step: &str, outcome: &ProcessOutcome) -> E2eResult<()> {
    if outcome.exit_code == 0 {
        Ok(())
    } else {
        Err(E2eError::Toolchain {
            step: step.to_string(),
            exit_code: outcome.exit_code,
            output: outcome.output.clone(),
        })
    }
}
