//! Build/run/publish E2E harness for mixed Blazor fixture solutions.
//!
//! This crate validates that a matrix of web-application project
//! configurations (server-hosted and WebAssembly-hosted, across target
//! framework and SDK versions) build, publish, and run correctly, and that
//! their rendered pages behave as expected in a real browser:
//!
//! - Copies the fixture solution into an isolated workspace per case and
//!   pins the SDK via a generated `global.json`
//! - Rewrites the main project's target framework in place
//! - Invokes the `dotnet` CLI for build/run/publish/exec, watching the
//!   combined process output for readiness
//! - Verifies bundled-CSS imports, static assets, and raw JS content over
//!   HTTP
//! - Drives a Chromium session over CDP to assert rendered text, computed
//!   style, and a prompt-dialog interop round trip
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Harness (per case)                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  workspace  copy solution → temp dir, write global.json      │
//! │  project    rewrite <TargetFramework>, swap versioned pages  │
//! │  dotnet     build / run / publish / exec / serve             │
//! │  process    ProcessHandle: wait_for_exit, wait_for_output    │
//! │  net        free_port()                                      │
//! │  poll       wait_until, assert_eq_eventually                 │
//! │  verify     HTTP asset checks + UI assertions                │
//! ├──────────────────────────────────────────────────────────────┤
//! │            BrowserSession (one per run, CDP)                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod cases;
pub mod dotnet;
pub mod error;
pub mod harness;
pub mod net;
pub mod poll;
pub mod process;
pub mod project;
pub mod verify;
pub mod workspace;

pub use browser::{BrowserOptions, BrowserSession};
pub use cases::{TestCase, CASES};
pub use error::{E2eError, E2eResult};
pub use harness::Harness;
