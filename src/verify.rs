//! Verification of a running fixture app: bundled-CSS imports, static
//! assets, raw JS content, and live UI behavior through the browser.

use chromiumoxide::page::Page;
use regex::Regex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::browser::{self, BrowserSession};
use crate::error::{E2eError, E2eResult};
use crate::poll;

/// Everything one verification pass needs to know about the app under
/// test.
pub struct VerifyTarget<'a> {
    pub main_project: &'a str,
    pub referenced_projects: &'a [&'a str],
    pub base_url: &'a str,
    /// Build configuration label, `Development` or `Release`.
    pub configuration: &'a str,
}

/// Computed background color of the fixture button, independent of
/// configuration.
pub const BUTTON_BACKGROUND: &str = "rgb(81, 43, 212)";

/// Exact content of `/js/helper.js`. The byte-exact comparison is a
/// regression check that referenced-project scripts are served from the
/// root URL, not only under their `_content` path.
pub const HELPER_JS: &str = "export const prompt = (message) => window.prompt(message);";

/// Exact content of `/Components/Component0.razor.js`. The trailing space
/// is part of the fixture.
pub const COMPONENT0_JS: &str = "export const showMessage = (message) => alert(message); ";

/// Button text the fixture renders; Development builds append the
/// environment suffix.
pub fn expected_button_text(main_project: &str, configuration: &str) -> String {
    let suffix = match configuration {
        "Development" => " (Environment = Development)",
        _ => "",
    };
    format!("I'm {main_project}. How are you?{suffix}")
}

/// `@import` directive the main stylesheet must carry for one referenced
/// project's scoped-CSS bundle, hash segment optional.
pub fn bundle_import_pattern(project: &str) -> Regex {
    Regex::new(&format!(
        r"@import '(_content/{project}/{project}(\.[a-z0-9]+)?\.bundle\.scp\.css)';"
    ))
    .expect("valid import pattern")
}

/// Run the full verification pass against a served app.
pub async fn verify(target: &VerifyTarget<'_>, session: &BrowserSession) -> E2eResult<()> {
    let client = reqwest::Client::new();
    let base = target.base_url.trim_end_matches('/');

    // The main project's stylesheet must import every referenced project's
    // bundle, exactly one match per project.
    let styles_url = format!("{base}/{}.styles.css", target.main_project);
    debug!("fetching {styles_url}");
    let styles = client
        .get(&styles_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let mut bundle_paths = Vec::with_capacity(target.referenced_projects.len());
    for project in target.referenced_projects {
        let captures = bundle_import_pattern(project).captures(&styles).ok_or_else(|| {
            E2eError::AssertionFailed {
                expected: format!("@import of the {project} bundle css in {styles_url}"),
                actual: styles.clone(),
            }
        })?;
        bundle_paths.push(captures[1].to_owned());
    }

    // Every imported bundle must actually resolve.
    for path in &bundle_paths {
        client
            .get(format!("{base}/{path}"))
            .send()
            .await?
            .error_for_status()?;
    }

    // Plain static asset below a referenced project's content root.
    client
        .get(format!("{base}/_content/WasmApp0/assets/bg.png"))
        .send()
        .await?
        .error_for_status()?;

    // Referenced projects' JS files surfaced at root-relative URLs.
    let helper = client
        .get(format!("{base}/js/helper.js"))
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    if helper != HELPER_JS {
        return Err(E2eError::AssertionFailed {
            expected: HELPER_JS.to_string(),
            actual: helper,
        });
    }

    let component = client
        .get(format!("{base}/Components/Component0.razor.js"))
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    if component != COMPONENT0_JS {
        return Err(E2eError::AssertionFailed {
            expected: COMPONENT0_JS.to_string(),
            actual: component,
        });
    }

    // UI behavior on a page of our own.
    let page = session.new_page().await?;
    let result = verify_ui(target, &page).await;
    close_page(page).await;
    result
}

async fn verify_ui(target: &VerifyTarget<'_>, page: &Page) -> E2eResult<()> {
    info!("verifying UI at {}", target.base_url);
    browser::goto_and_wait_ready(page, target.base_url).await?;

    let expected_text = expected_button_text(target.main_project, target.configuration);
    poll::assert_eq_eventually(|| browser::inner_text(page, "button"), &expected_text).await?;
    poll::assert_eq_eventually(
        || browser::css_value(page, "button", "backgroundColor"),
        &BUTTON_BACKGROUND.to_string(),
    )
    .await?;

    // Round trip through the JS interop prompt: accept the native dialog
    // with a fresh token and expect the page to echo it back.
    let token = Uuid::new_v4().simple().to_string();
    let dialog = browser::accept_next_dialog(page, &token).await?;
    browser::click(page, "button").await?;
    poll::assert_eq_eventually(|| browser::inner_text(page, ".response"), &token).await?;
    let _ = dialog.await;
    Ok(())
}

async fn close_page(page: Page) {
    use chromiumoxide::cdp::browser_protocol::page::CloseParams;
    let _ = page.execute(CloseParams::default()).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("MainServerApp", "Development", "I'm MainServerApp. How are you? (Environment = Development)")]
    #[test_case("MainServerApp", "Release", "I'm MainServerApp. How are you?")]
    #[test_case("MainWasmApp", "Development", "I'm MainWasmApp. How are you? (Environment = Development)")]
    #[test_case("MainWasmApp", "Release", "I'm MainWasmApp. How are you?")]
    fn button_text_varies_by_configuration(project: &str, configuration: &str, expected: &str) {
        assert_eq!(expected_button_text(project, configuration), expected);
    }

    #[test]
    fn import_pattern_matches_hashed_and_plain_bundles() {
        let pattern = bundle_import_pattern("RazorLib1");

        let hashed = "@import '_content/RazorLib1/RazorLib1.x4l6f9bbcd.bundle.scp.css';";
        let caps = pattern.captures(hashed).expect("hashed bundle should match");
        assert_eq!(&caps[1], "_content/RazorLib1/RazorLib1.x4l6f9bbcd.bundle.scp.css");

        let plain = "@import '_content/RazorLib1/RazorLib1.bundle.scp.css';";
        let caps = pattern.captures(plain).expect("plain bundle should match");
        assert_eq!(&caps[1], "_content/RazorLib1/RazorLib1.bundle.scp.css");
    }

    #[test]
    fn import_pattern_rejects_other_projects() {
        let pattern = bundle_import_pattern("RazorLib1");
        let other = "@import '_content/WasmApp0/WasmApp0.bundle.scp.css';";
        assert!(pattern.captures(other).is_none());
    }

    #[test]
    fn fixture_js_literals_keep_exact_whitespace() {
        assert!(!HELPER_JS.ends_with(' '));
        assert!(COMPONENT0_JS.ends_with(' '), "trailing space is deliberate");
    }
}
