//! Decision-making seams of the loop.
//!
//! The loop never reasons about the page itself: a [`Decider`] picks the next
//! action, a [`Judge`] says whether enough has been gathered and an
//! [`Answerer`] writes the final answer. Failures are reported as
//! [`AgentError`]s and the loop falls back to its defaults.
use crate::action::ProposedAction;
use crate::error::AgentError;
use crate::outline::Outline;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[async_trait]
pub trait Decider: Send + Sync {
    /// Propose the next action given the current outline and a JSON array of
    /// past [`ActionHistoryEntry`](crate::action::ActionHistoryEntry)s.
    async fn decide(
        &self,
        task: &str,
        outline: &Outline,
        history_json: &str,
    ) -> Result<ProposedAction, AgentError>;
}

#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(
        &self,
        task: &str,
        extracted_json: &str,
        outline: &Outline,
    ) -> Result<Verdict, AgentError>;
}

#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(
        &self,
        task: &str,
        extracted_json: &str,
        outline: &Outline,
    ) -> Result<String, AgentError>;
}

/// The judge's call after each successful step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "CONTINUE")]
    Continue,
    #[serde(rename = "FINAL ANSWER")]
    FinalAnswer,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Continue => "CONTINUE",
            Verdict::FinalAnswer => "FINAL ANSWER",
        }
    }
}

impl FromStr for Verdict {
    type Err = AgentError;

    /// Accepts the wire strings with any case and `_`/space spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().trim_matches('"').to_ascii_uppercase().replace('_', " ");
        match norm.as_str() {
            "CONTINUE" => Ok(Verdict::Continue),
            "FINAL ANSWER" | "FINAL" | "STOP" => Ok(Verdict::FinalAnswer),
            other => Err(AgentError::Judge(format!("unrecognized decision {other:?}"))),
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_wire_strings() {
        assert_eq!(serde_json::to_string(&Verdict::FinalAnswer).unwrap(), "\"FINAL ANSWER\"");
        let v: Verdict = serde_json::from_str("\"CONTINUE\"").unwrap();
        assert_eq!(v, Verdict::Continue);
    }

    #[test]
    fn verdict_parses_loose_spellings() {
        assert_eq!("final_answer".parse::<Verdict>().unwrap(), Verdict::FinalAnswer);
        assert_eq!(" continue ".parse::<Verdict>().unwrap(), Verdict::Continue);
        assert!("maybe".parse::<Verdict>().is_err());
    }
}
