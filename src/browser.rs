//! Browser session fixture built on chromiumoxide (CDP).
//!
//! One [`BrowserSession`] serves the whole test run; every verification
//! call gets its own page so concurrent cases never interleave navigations
//! on a shared page. The session is an explicitly constructed value passed
//! down from the run scope, not a lazy global.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Console message Blazor logs once the client-side runtime is up.
pub const READY_CONSOLE_MESSAGE: &str = "Blazor has been started.";

/// Blazor keeps mutating the DOM briefly after announcing itself, so the
/// ready wait ends with this fixed settle delay.
const READY_SETTLE: Duration = Duration::from_millis(200);

const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// How the browser fixture is launched. Sourced from the environment by
/// default, overridable from the runner CLI.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Explicit Chromium-family executable. `None` downloads a managed
    /// build (or autodetects one when `skip_download` is set).
    pub executable: Option<PathBuf>,

    pub headless: bool,

    /// Skip downloading a managed Chromium and rely on a local install.
    pub skip_download: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        BrowserOptions {
            executable: None,
            headless: true,
            skip_download: false,
        }
    }
}

impl BrowserOptions {
    /// Read `E2E_BROWSER_PATH`, `E2E_HEADLESS`, and
    /// `E2E_SKIP_BROWSER_DOWNLOAD` from the environment.
    pub fn from_env() -> Self {
        let executable = std::env::var_os("E2E_BROWSER_PATH").map(PathBuf::from);
        let headless = std::env::var("E2E_HEADLESS")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);
        let skip_download = std::env::var("E2E_SKIP_BROWSER_DOWNLOAD")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        BrowserOptions { executable, headless, skip_download }
    }
}

/// A single browser engine instance shared by the test run.
pub struct BrowserSession {
    browser: Browser,
    handler_loop: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch the browser, downloading a managed Chromium first unless the
    /// options skip it or name an executable.
    pub async fn launch(options: &BrowserOptions) -> E2eResult<Self> {
        let executable = match &options.executable {
            Some(path) => Some(path.clone()),
            None if !options.skip_download => Some(fetch_chromium().await?),
            None => None,
        };

        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox");
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(exe) = executable {
            builder = builder.chrome_executable(exe);
        }
        let config = builder.build().map_err(E2eError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler_loop = tokio::spawn(async move { while handler.next().await.is_some() {} });

        info!("browser session started");
        Ok(BrowserSession { browser, handler_loop })
    }

    /// Open a fresh blank page for one verification call.
    pub async fn new_page(&self) -> E2eResult<Page> {
        Ok(self.browser.new_page("about:blank").await?)
    }

    /// Tear the browser down. Safe to call once at the end of the run; the
    /// handler loop is aborted after the engine exits.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("browser close failed: {e}");
        }
        let _ = self.browser.wait().await;
        self.handler_loop.abort();
    }
}

/// Download (or reuse) a managed Chromium build under the system temp dir.
async fn fetch_chromium() -> E2eResult<PathBuf> {
    let download_dir = std::env::temp_dir().join("blazormix-e2e-chromium");
    tokio::fs::create_dir_all(&download_dir).await?;

    let options = BrowserFetcherOptions::builder()
        .with_path(&download_dir)
        .build()
        .map_err(|e| E2eError::Browser(e.to_string()))?;
    let info = BrowserFetcher::new(options)
        .fetch()
        .await
        .map_err(|e| E2eError::Browser(format!("chromium download failed: {e}")))?;

    debug!(path = %info.executable_path.display(), "using managed chromium");
    Ok(info.executable_path)
}

/// Navigate and block until the client-side framework reports readiness.
///
/// The console listener is registered before navigation so the ready
/// message cannot be emitted ahead of the subscription.
pub async fn goto_and_wait_ready(page: &Page, url: &str) -> E2eResult<()> {
    let mut console = page.event_listener::<EventConsoleApiCalled>().await?;
    page.goto(url).await?;

    let ready = tokio::time::timeout(READY_TIMEOUT, async {
        while let Some(event) = console.next().await {
            if console_text(&event).as_deref() == Some(READY_CONSOLE_MESSAGE) {
                return true;
            }
        }
        false
    })
    .await;

    if !matches!(ready, Ok(true)) {
        return Err(E2eError::Browser(format!(
            "page at {url} never logged {READY_CONSOLE_MESSAGE:?}"
        )));
    }

    tokio::time::sleep(READY_SETTLE).await;
    Ok(())
}

fn console_text(event: &EventConsoleApiCalled) -> Option<String> {
    event
        .args
        .first()
        .and_then(|arg| arg.value.as_ref())
        .and_then(|value| value.as_str())
        .map(str::to_owned)
}

/// Rendered text of the first element matching `selector`, or an empty
/// string while the element has not appeared yet.
pub async fn inner_text(page: &Page, selector: &str) -> E2eResult<String> {
    let script = format!("document.querySelector({selector:?})?.innerText ?? ''");
    evaluate_string(page, &script).await
}

/// Computed CSS value of `property` on the first element matching
/// `selector`.
pub async fn css_value(page: &Page, selector: &str, property: &str) -> E2eResult<String> {
    let script = format!(
        "window.getComputedStyle(document.querySelector({selector:?})).{property}"
    );
    evaluate_string(page, &script).await
}

/// Click the first element matching `selector`.
pub async fn click(page: &Page, selector: &str) -> E2eResult<()> {
    page.find_element(selector).await?.click().await?;
    Ok(())
}

/// Install a one-shot handler that accepts the next native JavaScript
/// dialog on `page` with `prompt_text`.
///
/// Must be installed before the action that triggers the dialog; the
/// returned task completes once the dialog has been accepted.
pub async fn accept_next_dialog(page: &Page, prompt_text: &str) -> E2eResult<JoinHandle<()>> {
    let mut dialogs = page.event_listener::<EventJavascriptDialogOpening>().await?;
    let page = page.clone();
    let text = prompt_text.to_owned();
    Ok(tokio::spawn(async move {
        if dialogs.next().await.is_some() {
            let mut params = HandleJavaScriptDialogParams::new(true);
            params.prompt_text = Some(text);
            if let Err(e) = page.execute(params).await {
                warn!("failed to accept dialog: {e}");
            }
        }
    }))
}

async fn evaluate_string(page: &Page, script: &str) -> E2eResult<String> {
    page.evaluate(script)
        .await?
        .into_value::<String>()
        .map_err(|e| E2eError::Browser(format!("evaluate `{script}`: {e}")))
}
