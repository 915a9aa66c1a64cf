//! The observe → decide → act → judge loop.
//!
//! A run owns one browser session for its whole life. Every iteration takes a
//! fresh snapshot, so outline indices proposed by the decider are only ever
//! checked against the outline it was shown. Only failing to open the session
//! aborts a run; every other failure becomes a warning and the loop carries on,
//! bounded by the iteration cap and the stall guard.
use crate::action::{Action, ActionHistoryEntry, ProposedAction};
use crate::collaborators::{Answerer, Decider, Judge, Verdict};
use crate::error::{AgentError, StepError};
use crate::executor;
use crate::outline::{self, Outline, OutlineOptions};
use crate::policy::{LlmAnswerer, LlmDecider, LlmJudge};
use crate::resolver::{self, ResolvedElement, ResolverOptions};
use crate::snapshot::{self, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;
use wayfinder_config::AgentSettings;
use wayfinder_drivers::{BrowserSession, SessionConnector};
use wayfinder_llm::traits::LlmClient;

/// A natural-language goal and the page to start from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub text: String,
    pub start_url: String,
}

impl Task {
    pub fn new(text: impl Into<String>, start_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            start_url: start_url.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalizeReason {
    /// The judge said enough information was gathered.
    JudgeStop,
    /// The successful-action cap was reached.
    IterationCap,
    /// Too many consecutive steps ended without a successful action.
    StallLimit,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    pub task_id: Uuid,
    pub task: String,
    pub start_url: String,
    pub history: Vec<ActionHistoryEntry>,
    pub extracted: Vec<String>,
    pub warnings: Vec<String>,
    pub iterations: u32,
    pub max_iterations: u32,
    pub answer: String,
    pub finalize_reason: FinalizeReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Mutable state of one run, minus the session which is passed separately.
#[derive(Debug)]
pub struct LoopState {
    pub outline: Outline,
    pub action: Option<Action>,
    pub extracted: Vec<String>,
    pub history: Vec<ActionHistoryEntry>,
    pub warnings: Vec<String>,
    pub iterations: u32,
    pub max_iterations: u32,
    pub stalled: u32,
    pub answer: String,
    started_at: DateTime<Utc>,
}

impl LoopState {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            outline: Outline::empty(),
            action: None,
            extracted: Vec::new(),
            history: Vec::new(),
            warnings: Vec::new(),
            iterations: 0,
            max_iterations,
            stalled: 0,
            answer: String::new(),
            started_at: Utc::now(),
        }
    }

    fn warn(&mut self, message: String) {
        tracing::warn!(target: "wayfinder.loop", iteration = self.iterations, "{message}");
        self.warnings.push(message);
    }

    pub fn history_json(&self) -> String {
        serde_json::to_string(&self.history).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn extracted_json(&self) -> String {
        serde_json::to_string(&self.extracted).unwrap_or_else(|_| "[]".to_string())
    }

    fn into_report(self, task: &Task, reason: FinalizeReason) -> TaskReport {
        TaskReport {
            task_id: task.id,
            task: task.text.clone(),
            start_url: task.start_url.clone(),
            history: self.history,
            extracted: self.extracted,
            warnings: self.warnings,
            iterations: self.iterations,
            max_iterations: self.max_iterations,
            answer: self.answer,
            finalize_reason: reason,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

enum Phase {
    Snapshot,
    Decide,
    Route(ProposedAction),
    Execute(Action),
    Judge,
    Finalize(FinalizeReason),
}

/// Result of a successful Execute step.
struct Step {
    entry: ActionHistoryEntry,
    extracted: Option<String>,
    observation: String,
}

impl Step {
    fn on<E>(element: &ResolvedElement<E>, action: &Action, observation: String) -> Self {
        Self {
            entry: ActionHistoryEntry::new(&element.role, &element.name, action.describe()),
            extracted: None,
            observation,
        }
    }

    fn untargeted(action: &Action, observation: String) -> Self {
        Self {
            entry: ActionHistoryEntry::untargeted(action.describe()),
            extracted: None,
            observation,
        }
    }
}

pub struct Orchestrator {
    settings: AgentSettings,
    outline_options: OutlineOptions,
    resolver_options: ResolverOptions,
    decider: Arc<dyn Decider>,
    judge: Arc<dyn Judge>,
    answerer: Arc<dyn Answerer>,
}

impl Orchestrator {
    pub fn new(
        settings: AgentSettings,
        decider: Arc<dyn Decider>,
        judge: Arc<dyn Judge>,
        answerer: Arc<dyn Answerer>,
    ) -> Self {
        Self {
            outline_options: OutlineOptions::from_settings(&settings),
            resolver_options: ResolverOptions::from_settings(&settings),
            settings,
            decider,
            judge,
            answerer,
        }
    }

    /// Use one model for deciding, judging and answering.
    pub fn with_llm(settings: AgentSettings, llm: Arc<dyn LlmClient + Send + Sync>) -> Self {
        let decider = Arc::new(LlmDecider::new(llm.clone(), &settings.home_url));
        let judge = Arc::new(LlmJudge::new(llm.clone()));
        let answerer = Arc::new(LlmAnswerer::new(llm));
        Self::new(settings, decider, judge, answerer)
    }

    /// Run `task` to completion on a fresh session from `connector`.
    pub async fn run<C: SessionConnector>(
        &self,
        connector: &C,
        task: Task,
    ) -> Result<TaskReport, AgentError> {
        let span = tracing::info_span!("task", id = %task.id);
        async {
            tracing::info!(
                target: "wayfinder.loop",
                task = %task.text,
                url = %task.start_url,
                "starting task"
            );
            let mut session = connector
                .connect()
                .await
                .map_err(AgentError::SessionAcquisition)?;

            let mut state = LoopState::new(self.settings.max_iterations);
            match session.navigate(&task.start_url).await {
                Ok(()) => tokio::time::sleep(self.settings.settle.navigate()).await,
                Err(e) => state.warn(format!(
                    "initial navigation to {} failed: {e:#}",
                    task.start_url
                )),
            }

            let reason = self.drive(&mut session, &mut state, &task).await;
            self.finalize(&mut state, &task).await;

            if let Err(e) = session.close().await {
                tracing::warn!(target: "wayfinder.loop", error = %e, "closing session failed");
            }

            tracing::info!(
                target: "wayfinder.loop",
                ?reason,
                iterations = state.iterations,
                warnings = state.warnings.len(),
                "task finished"
            );
            Ok::<_, AgentError>(state.into_report(&task, reason))
        }
        .instrument(span)
        .await
    }

    async fn drive<S: BrowserSession>(
        &self,
        session: &mut S,
        state: &mut LoopState,
        task: &Task,
    ) -> FinalizeReason {
        let mut phase = Phase::Snapshot;
        loop {
            phase = match phase {
                Phase::Snapshot if state.iterations >= state.max_iterations => {
                    Phase::Finalize(FinalizeReason::IterationCap)
                }
                Phase::Snapshot => {
                    state.outline = self.observe(session, state).await;
                    Phase::Decide
                }
                Phase::Decide => {
                    let history = state.history_json();
                    match self.decider.decide(&task.text, &state.outline, &history).await {
                        Ok(proposal) => Phase::Route(proposal),
                        Err(e) => {
                            state.warn(format!("no action this step: {e}"));
                            self.stall(state)
                        }
                    }
                }
                Phase::Route(proposal) => match Action::try_from(proposal) {
                    Ok(action) => {
                        state.action = Some(action.clone());
                        Phase::Execute(action)
                    }
                    Err(e) => {
                        state.warn(format!("rejected proposal: {e}"));
                        self.stall(state)
                    }
                },
                Phase::Execute(action) => match self
                    .execute(session, &state.outline, &action)
                    .await
                {
                    Ok(step) => {
                        tracing::info!(
                            target: "wayfinder.loop",
                            iteration = state.iterations + 1,
                            index = ?action.index(),
                            action = %step.entry.description,
                            role = %step.entry.role,
                            name = %step.entry.name,
                            observation = %step.observation,
                            "action succeeded"
                        );
                        state.history.push(step.entry);
                        state.extracted.extend(step.extracted);
                        state.stalled = 0;
                        Phase::Judge
                    }
                    Err(StepError::Resolve(e)) => {
                        state.warn(format!("{} failed: {e}", action.name()));
                        self.stall(state)
                    }
                    Err(StepError::Execute(e)) => {
                        state.warn(e.to_string());
                        self.stall(state)
                    }
                },
                Phase::Judge => {
                    state.iterations += 1;
                    if state.iterations >= state.max_iterations {
                        Phase::Finalize(FinalizeReason::IterationCap)
                    } else {
                        let extracted = state.extracted_json();
                        match self.judge.judge(&task.text, &extracted, &state.outline).await {
                            Ok(Verdict::FinalAnswer) => Phase::Finalize(FinalizeReason::JudgeStop),
                            Ok(Verdict::Continue) => Phase::Snapshot,
                            Err(e) => {
                                state.warn(format!("judge unavailable, continuing: {e}"));
                                Phase::Snapshot
                            }
                        }
                    }
                }
                Phase::Finalize(reason) => return reason,
            };
        }
    }

    fn stall(&self, state: &mut LoopState) -> Phase {
        state.stalled += 1;
        if state.stalled >= self.settings.max_stalled_steps.max(1) {
            Phase::Finalize(FinalizeReason::StallLimit)
        } else {
            Phase::Snapshot
        }
    }

    /// Snapshot the page and compile it; failures degrade to an empty outline.
    async fn observe<S: BrowserSession>(&self, session: &mut S, state: &mut LoopState) -> Outline {
        let snapshot = match snapshot::capture(session).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                state.warn(format!("{e:#}"));
                Snapshot::empty()
            }
        };
        match outline::compile(&snapshot, &self.outline_options) {
            Ok(outline) => outline,
            Err(e) => {
                state.warn(e.to_string());
                Outline::empty()
            }
        }
    }

    async fn execute<S: BrowserSession>(
        &self,
        session: &mut S,
        outline: &Outline,
        action: &Action,
    ) -> Result<Step, StepError> {
        let settle = &self.settings.settle;
        let step = match action {
            Action::Click { index } => {
                let target = self.resolve(*index, outline, session).await?;
                let observation = executor::click(session, &target.element, settle).await?;
                Step::on(&target, action, observation)
            }
            Action::Type { index, text } => {
                let target = self.resolve(*index, outline, session).await?;
                let observation =
                    executor::type_text(session, &target.element, text, settle).await?;
                Step::on(&target, action, observation)
            }
            Action::Extract { index } => {
                let target = self.resolve(*index, outline, session).await?;
                let text = executor::extract(session, &target.element).await?;
                let mut step = Step::on(&target, action, extracted_note(&text));
                step.extracted = Some(text);
                step
            }
            Action::Wait => Step::untargeted(action, executor::wait(settle).await?),
            Action::GoBack => Step::untargeted(action, executor::go_back(session, settle).await?),
            Action::GoHome => Step::untargeted(
                action,
                executor::go_home(session, &self.settings.home_url, settle).await?,
            ),
        };
        Ok(step)
    }

    async fn resolve<S: BrowserSession>(
        &self,
        index: usize,
        outline: &Outline,
        session: &mut S,
    ) -> Result<ResolvedElement<S::Element>, StepError> {
        Ok(resolver::resolve(index, outline, session, &self.resolver_options).await?)
    }

    async fn finalize(&self, state: &mut LoopState, task: &Task) {
        let extracted = state.extracted_json();
        state.answer = match self.answerer.answer(&task.text, &extracted, &state.outline).await {
            Ok(answer) => answer,
            Err(e) => {
                state.warn(format!("{e}; answer left empty"));
                String::new()
            }
        };
    }
}

fn extracted_note(text: &str) -> String {
    format!("{} chars", text.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_serializes_history_and_extracts() {
        let mut state = LoopState::new(3);
        assert_eq!(state.history_json(), "[]");
        state.history.push(ActionHistoryEntry::new("link", "Docs", "click"));
        state.extracted.push("42 °C".into());
        assert_eq!(
            state.history_json(),
            r#"[{"role":"link","name":"Docs","description":"click"}]"#
        );
        assert_eq!(state.extracted_json(), r#"["42 °C"]"#);
    }

    #[test]
    fn extracted_note_counts_characters() {
        assert_eq!(extracted_note("Sunny 21°C"), "10 chars");
        assert_eq!(extracted_note(""), "0 chars");
    }

    #[test]
    fn report_carries_reason() {
        let task = Task::new("find docs", "https://example.com");
        let report = LoopState::new(2).into_report(&task, FinalizeReason::StallLimit);
        assert_eq!(report.task_id, task.id);
        assert_eq!(report.max_iterations, 2);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["finalize_reason"], "StallLimit");
    }
}
