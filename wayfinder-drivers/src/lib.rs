//! Driver layer for browser automation.
//!
//! This crate exposes the session surface the orchestrator drives and its
//! WebDriver-backed implementation.
//!
//! - [`session::BrowserSession`]: the trait every browser backend implements
//! - [`wayfinder_browser::driver::WayfinderDriver`]: fantoccini client wrapper
//! - [`wayfinder_browser::cdp::CdpCommand`]: DevTools calls tunnelled through chromedriver
//! - [`wayfinder_browser::behavioral::KeystrokePacer`]: paced per-character typing
//! - [`wayfinder_browser::stealth`]: launch arguments and JS evasions
pub mod session;
pub mod wayfinder_browser;

pub use session::{
    AxNode, AxProperty, AxValue, BackendNodeId, BrowserSession, RemoteObjectId,
    SessionConnector, TabId,
};
