//! LLM-backed [`Decider`], [`Judge`] and [`Answerer`].
//!
//! All three send one prompt per call and expect a single JSON object back.
//! Models often wrap it in a ```json fence or add chatter around it, so the
//! object is dug out before parsing.
pub mod prompts;

use crate::action::ProposedAction;
use crate::collaborators::{Answerer, Decider, Judge, Verdict};
use crate::error::AgentError;
use crate::outline::Outline;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use wayfinder_llm::traits::LlmClient;

type SharedLlm = Arc<dyn LlmClient + Send + Sync>;

/// The JSON object inside `raw`: a fenced block if present, else the
/// outermost braces, else the text itself.
pub fn extract_json_block(raw: &str) -> &str {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").ok());
    if let Some(m) = fence.as_ref().and_then(|re| re.captures(raw)).and_then(|c| c.get(1)) {
        return m.as_str();
    }
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw.trim(),
    }
}

#[derive(Debug, Deserialize)]
struct DecisionWire {
    #[serde(default)]
    thought: String,
    action: Vec<Value>,
}

/// Parse `{"thought": .., "action": [idx, kind, text]}`.
pub fn parse_decision(raw: &str) -> Result<ProposedAction, AgentError> {
    let wire: DecisionWire = serde_json::from_str(extract_json_block(raw))
        .map_err(|e| AgentError::Decider(format!("unparseable decision: {e}")))?;
    if !wire.thought.is_empty() {
        tracing::debug!(target: "wayfinder.policy", thought = %wire.thought, "decider reasoning");
    }

    let mut parts = wire.action.into_iter();
    let index = parts.next().and_then(|v| as_index(&v));
    let kind = parts
        .next()
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| AgentError::Decider("action has no kind".to_string()))?;
    let argument = parts
        .next()
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|s| !s.trim().is_empty());

    Ok(ProposedAction {
        index,
        kind,
        argument,
    })
}

fn as_index(v: &Value) -> Option<usize> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().trim_matches(['[', ']']).parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct VerdictWire {
    decision: String,
}

/// Parse `{"decision": ..}`; a bare decision string is accepted too.
pub fn parse_verdict(raw: &str) -> Result<Verdict, AgentError> {
    match serde_json::from_str::<VerdictWire>(extract_json_block(raw)) {
        Ok(wire) => wire.decision.parse(),
        Err(_) => raw.parse(),
    }
}

#[derive(Debug, Deserialize)]
struct AnswerWire {
    answer: String,
}

/// Parse `{"answer": ..}`, falling back to the raw text.
pub fn parse_answer(raw: &str) -> String {
    serde_json::from_str::<AnswerWire>(extract_json_block(raw))
        .map(|w| w.answer)
        .unwrap_or_else(|_| raw.trim().to_string())
}

pub struct LlmDecider {
    llm: SharedLlm,
    system_prompt: String,
}

impl LlmDecider {
    pub fn new(llm: SharedLlm, home_url: &str) -> Self {
        Self {
            llm,
            system_prompt: prompts::decider_system_prompt(home_url),
        }
    }
}

#[async_trait]
impl Decider for LlmDecider {
    async fn decide(
        &self,
        task: &str,
        outline: &Outline,
        history_json: &str,
    ) -> Result<ProposedAction, AgentError> {
        let prompt = prompts::decider_user_prompt(task, outline.text(), history_json);
        let response = self
            .llm
            .generate(&prompt, Some(&self.system_prompt), None, None)
            .await
            .map_err(|e| AgentError::Decider(e.to_string()))?;
        parse_decision(&response.text)
    }
}

pub struct LlmJudge {
    llm: SharedLlm,
}

impl LlmJudge {
    pub fn new(llm: SharedLlm) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Judge for LlmJudge {
    async fn judge(
        &self,
        task: &str,
        extracted_json: &str,
        outline: &Outline,
    ) -> Result<Verdict, AgentError> {
        let prompt = prompts::findings_user_prompt(task, extracted_json, outline.text());
        let response = self
            .llm
            .generate(&prompt, Some(prompts::JUDGE_SYSTEM_PROMPT), None, None)
            .await
            .map_err(|e| AgentError::Judge(e.to_string()))?;
        parse_verdict(&response.text)
    }
}

pub struct LlmAnswerer {
    llm: SharedLlm,
}

impl LlmAnswerer {
    pub fn new(llm: SharedLlm) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Answerer for LlmAnswerer {
    async fn answer(
        &self,
        task: &str,
        extracted_json: &str,
        outline: &Outline,
    ) -> Result<String, AgentError> {
        let prompt = prompts::findings_user_prompt(task, extracted_json, outline.text());
        let response = self
            .llm
            .generate(&prompt, Some(prompts::ANSWER_SYSTEM_PROMPT), None, None)
            .await
            .map_err(|e| AgentError::Answer(e.to_string()))?;
        Ok(parse_answer(&response.text))
    }
}
