//! Failure taxonomy of the orchestrator.
//!
//! Only [`AgentError::SessionAcquisition`] ends a run early; every other error
//! has a defined fallback and is turned into a warning observation.

/// The accessibility tree could not be fetched.
#[derive(thiserror::Error, Debug)]
#[error("accessibility capture failed: {0}")]
pub struct CaptureError(#[source] pub anyhow::Error);

/// The node graph cannot be turned into an outline.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CompileError {
    #[error("root node {0} is not part of the snapshot")]
    MissingRoot(String),
}

/// An outline index could not be turned into a live element.
#[derive(thiserror::Error, Debug)]
pub enum ResolutionError {
    #[error("index {0} is not in the current outline")]
    UnknownIndex(usize),

    #[error("outline entry {0} has no backend DOM node")]
    NoBackendNode(usize),

    #[error("backend node {backend} could not be materialized: {source}")]
    Detached {
        backend: i64,
        #[source]
        source: anyhow::Error,
    },

    #[error("could not tag element {index}: {source}")]
    Tagging {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("tagged element {index} did not appear within {waited_ms} ms")]
    Timeout { index: usize, waited_ms: u128 },
}

/// An action ran against a resolved element but failed.
#[derive(thiserror::Error, Debug)]
#[error("{action} failed: {reason}")]
pub struct ExecutionError {
    pub action: &'static str,
    pub reason: String,
}

impl ExecutionError {
    pub fn new(action: &'static str, source: impl std::fmt::Display) -> Self {
        Self {
            action,
            reason: source.to_string(),
        }
    }
}

/// Run-level and collaborator failures.
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    /// No browser session could be opened; the run has no answer.
    #[error("could not acquire a browser session: {0}")]
    SessionAcquisition(#[source] anyhow::Error),

    #[error("decider failed: {0}")]
    Decider(String),

    #[error("judge failed: {0}")]
    Judge(String),

    #[error("answer synthesis failed: {0}")]
    Answer(String),
}

/// A proposal from the decider that cannot become an [`Action`](crate::action::Action).
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("unknown action kind {0:?}")]
    UnknownKind(String),

    #[error("{0} needs an element index")]
    MissingIndex(&'static str),

    #[error("type at index {0} has no text")]
    MissingText(usize),
}

/// Why an Execute step produced no history entry.
#[derive(thiserror::Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Resolve(#[from] ResolutionError),

    #[error(transparent)]
    Execute(#[from] ExecutionError),
}
