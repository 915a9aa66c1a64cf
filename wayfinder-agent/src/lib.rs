//! Browser interaction orchestrator.
//!
//! Drives a [`BrowserSession`](wayfinder_drivers::BrowserSession) through a
//! bounded loop: snapshot the accessibility tree, compile it into an indexed
//! [`Outline`], ask a [`Decider`] for one action, resolve the chosen index to a
//! live element, execute, then let a [`Judge`] decide whether to keep going.
//! An [`Answerer`] writes the final answer from what was extracted.
//!
//! # Examples
//! ```no_run
//! use wayfinder_agent::{Orchestrator, Task};
//! use wayfinder_config::WayfinderConfigLoader;
//! use wayfinder_drivers::wayfinder_browser::driver::WebDriverConnector;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = WayfinderConfigLoader::new().load()?;
//! let llm = wayfinder_llm::ensure_llm_ready(&config.llm).await?;
//! let connector = WebDriverConnector::new(config.browser.clone());
//! let orchestrator = Orchestrator::with_llm(config.agent.clone(), llm);
//!
//! let report = orchestrator
//!     .run(&connector, Task::new("What is the weather in Paris?", "https://www.google.com"))
//!     .await?;
//! println!("{}", report.answer);
//! # Ok(())
//! # }
//! ```
pub mod action;
pub mod collaborators;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod outline;
pub mod policy;
pub mod resolver;
pub mod snapshot;

pub use action::{Action, ActionHistoryEntry, ProposedAction};
pub use collaborators::{Answerer, Decider, Judge, Verdict};
pub use error::{AgentError, CaptureError, CompileError, ExecutionError, ResolutionError};
pub use orchestrator::{FinalizeReason, LoopState, Orchestrator, Task, TaskReport};
pub use outline::{compile, Outline, OutlineEntry, OutlineOptions};
pub use snapshot::{capture, Snapshot};
