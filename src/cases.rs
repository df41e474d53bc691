//! The fixed test-case matrix.
//!
//! Each tuple drives one independent build+run+verify (and publish+verify)
//! cycle. The matrix crosses target framework and SDK versions over the two
//! main fixture apps, one server-hosted and one WebAssembly-hosted.

/// One row of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCase {
    /// Target framework major version (`net{N}.0`).
    pub target_framework: u32,

    /// .NET SDK major version pinned via `global.json`.
    pub sdk_major: u32,

    /// The project that gets built and launched.
    pub main_project: &'static str,

    /// Projects referenced by the main project whose static web assets
    /// must surface through it.
    pub referenced_projects: &'static [&'static str],
}

const SERVER_REFS: &[&str] = &["RazorLib1", "WasmApp0", "ServerApp1"];
const WASM_REFS: &[&str] = &["RazorLib1", "WasmApp0", "WasmApp1"];

/// Every supported {target framework, SDK} pairing for both main apps.
pub const CASES: &[TestCase] = &[
    TestCase { target_framework: 8, sdk_major: 8, main_project: "MainServerApp", referenced_projects: SERVER_REFS },
    TestCase { target_framework: 8, sdk_major: 9, main_project: "MainServerApp", referenced_projects: SERVER_REFS },
    TestCase { target_framework: 9, sdk_major: 9, main_project: "MainServerApp", referenced_projects: SERVER_REFS },
    TestCase { target_framework: 8, sdk_major: 10, main_project: "MainServerApp", referenced_projects: SERVER_REFS },
    TestCase { target_framework: 9, sdk_major: 10, main_project: "MainServerApp", referenced_projects: SERVER_REFS },
    TestCase { target_framework: 10, sdk_major: 10, main_project: "MainServerApp", referenced_projects: SERVER_REFS },
    TestCase { target_framework: 8, sdk_major: 8, main_project: "MainWasmApp", referenced_projects: WASM_REFS },
    TestCase { target_framework: 8, sdk_major: 9, main_project: "MainWasmApp", referenced_projects: WASM_REFS },
    TestCase { target_framework: 9, sdk_major: 9, main_project: "MainWasmApp", referenced_projects: WASM_REFS },
    TestCase { target_framework: 8, sdk_major: 10, main_project: "MainWasmApp", referenced_projects: WASM_REFS },
    TestCase { target_framework: 9, sdk_major: 10, main_project: "MainWasmApp", referenced_projects: WASM_REFS },
    TestCase { target_framework: 10, sdk_major: 10, main_project: "MainWasmApp", referenced_projects: WASM_REFS },
];

impl TestCase {
    /// Human-readable label used in logs and result reports.
    pub fn label(&self) -> String {
        format!(
            "{} net{}.0 sdk{}",
            self.main_project, self.target_framework, self.sdk_major
        )
    }
}
