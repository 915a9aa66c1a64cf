//! Turns an outline index back into a live element handle.
//!
//! Backend node ids bridge the accessibility and DOM domains, but the
//! WebDriver surface only hands out elements for CSS queries. The resolver
//! therefore tags the node with a throwaway attribute through the DevTools
//! object handle, polls for it with a selector, then removes the tag.
use crate::error::ResolutionError;
use crate::outline::Outline;
use serde_json::json;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use uuid::Uuid;
use wayfinder_config::AgentSettings;
use wayfinder_drivers::{BrowserSession, RemoteObjectId};

const SET_MARKER: &str = "function(name) { this.setAttribute(name, ''); }";
const REMOVE_MARKER: &str = "function(name) { this.removeAttribute(name); }";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl ResolverOptions {
    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            timeout: settings.resolve_timeout(),
            poll_interval: settings.resolve_poll_interval(),
        }
    }
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// A live handle plus the outline entry it was resolved from.
#[derive(Debug, Clone)]
pub struct ResolvedElement<E> {
    pub element: E,
    pub index: usize,
    pub role: String,
    pub name: String,
}

/// Random attribute name unique to one resolution.
pub fn marker_attribute() -> String {
    format!("data-wayfinder-{}", Uuid::new_v4().simple())
}

pub async fn resolve<S: BrowserSession>(
    index: usize,
    outline: &Outline,
    session: &mut S,
    options: &ResolverOptions,
) -> Result<ResolvedElement<S::Element>, ResolutionError> {
    let entry = outline
        .lookup(index)
        .ok_or(ResolutionError::UnknownIndex(index))?;
    let backend = entry
        .backend_node
        .ok_or(ResolutionError::NoBackendNode(index))?;

    let object = session
        .resolve_backend_node(backend)
        .await
        .map_err(|source| ResolutionError::Detached { backend, source })?;

    let marker = marker_attribute();
    session
        .call_function_on(&object, SET_MARKER, vec![json!(marker)])
        .await
        .map_err(|source| ResolutionError::Tagging { index, source })?;

    let found = poll_for_marker(session, &marker, options).await;
    remove_marker(session, &object, &marker).await;

    match found {
        Some(element) => {
            tracing::debug!(target: "wayfinder.resolver", index, backend, "resolved element");
            Ok(ResolvedElement {
                element,
                index,
                role: entry.role.clone(),
                name: entry.name.clone(),
            })
        }
        None => Err(ResolutionError::Timeout {
            index,
            waited_ms: options.timeout.as_millis(),
        }),
    }
}

async fn poll_for_marker<S: BrowserSession>(
    session: &mut S,
    marker: &str,
    options: &ResolverOptions,
) -> Option<S::Element> {
    let selector = format!("[{marker}]");
    let deadline = Instant::now() + options.timeout;
    loop {
        match session.query_selector(&selector).await {
            Ok(Some(element)) => return Some(element),
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(target: "wayfinder.resolver", error = %e, "marker query failed");
            }
        }
        if Instant::now() >= deadline {
            return None;
        }
        sleep(options.poll_interval).await;
    }
}

async fn remove_marker<S: BrowserSession>(session: &mut S, object: &RemoteObjectId, marker: &str) {
    if let Err(e) = session
        .call_function_on(object, REMOVE_MARKER, vec![json!(marker)])
        .await
    {
        tracing::warn!(target: "wayfinder.resolver", error = %e, %marker, "could not remove marker");
    }
}
