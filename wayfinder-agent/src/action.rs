use crate::error::RouteError;
use serde::{Deserialize, Serialize};

/// History entries for actions without a target element use this role/name.
pub const NOT_APPLICABLE: &str = "N/A";

/// What the decider asked for, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedAction {
    pub index: Option<usize>,
    pub kind: String,
    pub argument: Option<String>,
}

impl ProposedAction {
    pub fn new(index: Option<usize>, kind: impl Into<String>) -> Self {
        Self {
            index,
            kind: kind.into(),
            argument: None,
        }
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
        self
    }
}

/// An atomic interaction the executor knows how to perform.
///
/// `Wait`, `GoBack` and `GoHome` never carry an index; any index proposed
/// alongside them is dropped during routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Click { index: usize },
    Type { index: usize, text: String },
    Wait,
    GoBack,
    GoHome,
    Extract { index: usize },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Click { .. } => "click",
            Action::Type { .. } => "type",
            Action::Wait => "wait",
            Action::GoBack => "go_back",
            Action::GoHome => "go_home",
            Action::Extract { .. } => "extract",
        }
    }

    /// The outline index this action targets, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            Action::Click { index } | Action::Type { index, .. } | Action::Extract { index } => {
                Some(*index)
            }
            Action::Wait | Action::GoBack | Action::GoHome => None,
        }
    }

    /// Text recorded in the action history.
    pub fn describe(&self) -> String {
        match self {
            Action::Type { text, .. } => format!("type '{text}'"),
            other => other.name().to_string(),
        }
    }
}

impl TryFrom<ProposedAction> for Action {
    type Error = RouteError;

    fn try_from(proposal: ProposedAction) -> Result<Self, Self::Error> {
        let kind = canonical_kind(&proposal.kind)
            .ok_or_else(|| RouteError::UnknownKind(proposal.kind.clone()))?;
        let indexed = |name| proposal.index.ok_or(RouteError::MissingIndex(name));

        Ok(match kind {
            "click" => Action::Click {
                index: indexed("click")?,
            },
            "type" => {
                let index = indexed("type")?;
                let text = proposal
                    .argument
                    .filter(|t| !t.is_empty())
                    .ok_or(RouteError::MissingText(index))?;
                Action::Type { index, text }
            }
            "extract" => Action::Extract {
                index: indexed("extract")?,
            },
            "wait" => Action::Wait,
            "go_back" => Action::GoBack,
            _ => Action::GoHome,
        })
    }
}

/// Map both the short kinds and the long tool names decision models tend to
/// emit (`execute_click_action`, `extract_data_from_element`) to one spelling.
fn canonical_kind(raw: &str) -> Option<&'static str> {
    let kind = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    let kind = kind
        .strip_prefix("execute_")
        .map(|k| k.strip_suffix("_action").unwrap_or(k))
        .unwrap_or(kind.as_str());
    match kind {
        "click" => Some("click"),
        "type" | "input" => Some("type"),
        "wait" => Some("wait"),
        "go_back" | "goback" | "back" => Some("go_back"),
        "go_home" | "gohome" | "home" => Some("go_home"),
        "extract" | "extract_data" | "extract_data_from_element" => Some("extract"),
        _ => None,
    }
}

/// One successful step, as fed back to the decider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionHistoryEntry {
    pub role: String,
    pub name: String,
    pub description: String,
}

impl ActionHistoryEntry {
    pub fn new(
        role: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
            description: description.into(),
        }
    }

    /// Entry for an action that has no target element.
    pub fn untargeted(description: impl Into<String>) -> Self {
        Self::new(NOT_APPLICABLE, NOT_APPLICABLE, description)
    }
}
