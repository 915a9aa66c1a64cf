//! The browser surface consumed by the orchestrator.
//!
//! [`BrowserSession`] is deliberately small: the accessibility tree, the two
//! DevTools calls needed to bridge backend node ids to page elements, element
//! level input, history navigation and tab bookkeeping. The fantoccini-backed
//! [`WayfinderDriver`](crate::wayfinder_browser::driver::WayfinderDriver) is
//! the production implementation; tests provide in-memory fakes.
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// DOM node id shared by the accessibility and DOM domains of DevTools.
pub type BackendNodeId = i64;

/// Handle to a JavaScript object living in the page (`Runtime.RemoteObjectId`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteObjectId(pub String);

/// Opaque browser tab (WebDriver window handle).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(pub String);

/// A typed accessibility value as emitted by DevTools (`{type, value}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxValue {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl AxValue {
    pub fn string(text: impl Into<String>) -> Self {
        Self {
            kind: "string".into(),
            value: Some(Value::String(text.into())),
        }
    }

    /// The value as text; non-string values read as empty.
    pub fn as_str(&self) -> &str {
        self.value.as_ref().and_then(Value::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxProperty {
    pub name: String,
    #[serde(default)]
    pub value: AxValue,
}

/// One node of `Accessibility.getFullAXTree`.
///
/// Node ids are only unique within the snapshot that produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxNode {
    pub node_id: String,
    #[serde(default)]
    pub ignored: bool,
    #[serde(default)]
    pub role: Option<AxValue>,
    #[serde(default)]
    pub name: Option<AxValue>,
    #[serde(default)]
    pub properties: Vec<AxProperty>,
    #[serde(default)]
    pub child_ids: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default, rename = "backendDOMNodeId")]
    pub backend_dom_node_id: Option<BackendNodeId>,
    #[serde(default)]
    pub frame_id: Option<String>,
}

impl AxNode {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(AxValue {
            kind: "role".into(),
            value: Some(Value::String(role.into())),
        });
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(AxValue::string(name));
        self
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.child_ids = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_backend_node(mut self, backend: BackendNodeId) -> Self {
        self.backend_dom_node_id = Some(backend);
        self
    }

    pub fn role(&self) -> &str {
        self.role.as_ref().map(AxValue::as_str).unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.name.as_ref().map(AxValue::as_str).unwrap_or("")
    }
}

/// A live browser the orchestrator can observe and drive.
///
/// Every method takes `&mut self`: a session is owned by exactly one task run
/// and lent to components for the duration of a single call.
#[async_trait]
pub trait BrowserSession: Send {
    /// Element handle usable for input and text retrieval.
    type Element: Clone + std::fmt::Debug + Send + Sync;

    /// Fetch every accessibility node of the current page.
    async fn accessibility_tree(&mut self) -> Result<Vec<AxNode>>;

    /// Materialize a backend node id into a live JavaScript object.
    async fn resolve_backend_node(&mut self, backend: BackendNodeId) -> Result<RemoteObjectId>;

    /// Call `function` with `this` bound to `object`; returns the JSON result.
    async fn call_function_on(
        &mut self,
        object: &RemoteObjectId,
        function: &str,
        args: Vec<Value>,
    ) -> Result<Value>;

    /// First element matching a CSS selector, if any.
    async fn query_selector(&mut self, selector: &str) -> Result<Option<Self::Element>>;

    async fn navigate(&mut self, url: &str) -> Result<()>;
    async fn go_back(&mut self) -> Result<()>;
    async fn current_url(&mut self) -> Result<String>;

    async fn click(&mut self, element: &Self::Element) -> Result<()>;
    async fn clear(&mut self, element: &Self::Element) -> Result<()>;
    async fn send_keys(&mut self, element: &Self::Element, text: &str) -> Result<()>;
    async fn press_enter(&mut self, element: &Self::Element) -> Result<()>;
    async fn text(&mut self, element: &Self::Element) -> Result<String>;
    async fn tag_name(&mut self, element: &Self::Element) -> Result<String>;
    async fn attribute(&mut self, element: &Self::Element, name: &str) -> Result<Option<String>>;
    async fn set_attribute(&mut self, element: &Self::Element, name: &str, value: &str)
        -> Result<()>;

    async fn tabs(&mut self) -> Result<Vec<TabId>>;
    async fn current_tab(&mut self) -> Result<TabId>;
    async fn switch_to_tab(&mut self, tab: &TabId) -> Result<()>;
    /// Close the tab that currently has focus.
    async fn close_tab(&mut self) -> Result<()>;

    /// End the browser session.
    async fn close(&mut self) -> Result<()>;
}

/// Acquires fresh [`BrowserSession`]s.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    type Session: BrowserSession;

    async fn connect(&self) -> Result<Self::Session>;
}
