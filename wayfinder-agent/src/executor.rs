//! Atomic page interactions.
//!
//! Each entry point performs one action, then waits the matching settle delay
//! from [`SettleDelays`] so asynchronous page updates can land before the next
//! snapshot. The returned string is an observation for the loop; only
//! [`extract`] returns page content.
use crate::error::ExecutionError;
use tokio::time::sleep;
use wayfinder_config::SettleDelays;
use wayfinder_drivers::{BrowserSession, TabId};

fn failed(action: &'static str) -> impl FnOnce(anyhow::Error) -> ExecutionError {
    move |e| ExecutionError::new(action, format!("{e:#}"))
}

/// Click the element, keeping navigation in the current tab.
///
/// Links are retargeted to `_self` first. If the click still opens tabs, the
/// first new tab's URL is loaded into the original tab and every new tab is
/// closed. Tabs that refuse to close are logged and left behind.
pub async fn click<S: BrowserSession>(
    session: &mut S,
    element: &S::Element,
    settle: &SettleDelays,
) -> Result<String, ExecutionError> {
    if let Err(e) = session.set_attribute(element, "target", "_self").await {
        tracing::debug!(target: "wayfinder.executor", error = %e, "could not retarget element");
    }

    let original = session.current_tab().await.map_err(failed("click"))?;
    let before = session.tabs().await.map_err(failed("click"))?;

    session.click(element).await.map_err(failed("click"))?;
    sleep(settle.click()).await;

    let after = session.tabs().await.map_err(failed("click"))?;
    let opened: Vec<TabId> = after.into_iter().filter(|t| !before.contains(t)).collect();
    if opened.is_empty() {
        return Ok("clicked".to_string());
    }

    let url = adopt_new_tabs(session, &original, &opened).await?;
    sleep(settle.navigate()).await;
    Ok(format!("clicked; followed new tab to {url}"))
}

/// Focus always returns to `original`, even when a new tab misbehaves.
async fn adopt_new_tabs<S: BrowserSession>(
    session: &mut S,
    original: &TabId,
    opened: &[TabId],
) -> Result<String, ExecutionError> {
    let mut target = None;
    let mut first_error = None;
    for tab in opened {
        if let Err(e) = session.switch_to_tab(tab).await {
            first_error.get_or_insert(e);
            continue;
        }
        if target.is_none() {
            match session.current_url().await {
                Ok(url) => target = Some(url),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Err(e) = session.close_tab().await {
            tracing::warn!(target: "wayfinder.executor", tab = %tab.0, error = %e, "could not close new tab");
        }
    }
    session.switch_to_tab(original).await.map_err(failed("click"))?;

    let url = match (target, first_error) {
        (Some(url), _) => url,
        (None, Some(e)) => return Err(failed("click")(e)),
        (None, None) => String::new(),
    };
    tracing::info!(target: "wayfinder.executor", %url, tabs = opened.len(), "captured new tab");
    session.navigate(&url).await.map_err(failed("click"))?;
    Ok(url)
}

/// Focus the element, type `text` and submit with Enter.
pub async fn type_text<S: BrowserSession>(
    session: &mut S,
    element: &S::Element,
    text: &str,
    settle: &SettleDelays,
) -> Result<String, ExecutionError> {
    if !accepts_text(session, element).await {
        tracing::warn!(target: "wayfinder.executor", "typing into an element that is not a text field");
    }
    if let Err(e) = session.clear(element).await {
        tracing::debug!(target: "wayfinder.executor", error = %e, "clear failed");
    }

    session.click(element).await.map_err(failed("type"))?;
    sleep(settle.focus()).await;
    session.send_keys(element, text).await.map_err(failed("type"))?;
    sleep(settle.input()).await;
    session.press_enter(element).await.map_err(failed("type"))?;
    sleep(settle.submit()).await;
    Ok(format!("typed '{text}'"))
}

async fn accepts_text<S: BrowserSession>(session: &mut S, element: &S::Element) -> bool {
    let tag = session.tag_name(element).await.unwrap_or_default();
    if tag.eq_ignore_ascii_case("input") || tag.eq_ignore_ascii_case("textarea") {
        return true;
    }
    session
        .attribute(element, "contenteditable")
        .await
        .ok()
        .flatten()
        .is_some_and(|v| !v.eq_ignore_ascii_case("false"))
}

pub async fn wait(settle: &SettleDelays) -> Result<String, ExecutionError> {
    sleep(settle.wait()).await;
    Ok("waited".to_string())
}

pub async fn go_back<S: BrowserSession>(
    session: &mut S,
    settle: &SettleDelays,
) -> Result<String, ExecutionError> {
    session.go_back().await.map_err(failed("go_back"))?;
    sleep(settle.navigate()).await;
    Ok("went back".to_string())
}

pub async fn go_home<S: BrowserSession>(
    session: &mut S,
    home_url: &str,
    settle: &SettleDelays,
) -> Result<String, ExecutionError> {
    session.navigate(home_url).await.map_err(failed("go_home"))?;
    sleep(settle.navigate()).await;
    Ok(format!("navigated to {home_url}"))
}

/// Visible text of the element; empty when it has none.
pub async fn extract<S: BrowserSession>(
    session: &mut S,
    element: &S::Element,
) -> Result<String, ExecutionError> {
    session.text(element).await.map_err(failed("extract"))
}
