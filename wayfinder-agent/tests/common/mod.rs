#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use wayfinder_agent::{AgentError, Answerer, Decider, Judge, Outline, ProposedAction, Verdict};
use wayfinder_common::observability::LogConfig;
use wayfinder_config::{AgentSettings, SettleDelays};
use wayfinder_drivers::{AxNode, BackendNodeId, BrowserSession, RemoteObjectId, SessionConnector, TabId};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "wayfinder-agent-tests",
            emit_stderr: true,
            default_filter: "debug",
            ..LogConfig::default()
        };
        wayfinder_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// Loop settings with no settle delays and a short resolver timeout.
pub fn fast_settings(max_iterations: u32) -> AgentSettings {
    AgentSettings {
        max_iterations,
        resolve_timeout_ms: 60,
        resolve_poll_ms: 10,
        settle: SettleDelays::none(),
        ..AgentSettings::default()
    }
}

/// A search results page:
///
/// ```text
/// 1 RootWebArea 'Search page'
///     2 textbox 'Search'
///     3 button 'Google Search'
///     4 link 'Weather today'
///     5 StaticText 'Sunny 21°C'
/// ```
pub fn search_page() -> Vec<AxNode> {
    vec![
        AxNode::new("1")
            .with_role("RootWebArea")
            .with_name("Search page")
            .with_children(["2", "3", "4", "5"]),
        AxNode::new("2").with_role("textbox").with_name("Search").with_backend_node(102),
        AxNode::new("3")
            .with_role("button")
            .with_name("Google Search")
            .with_backend_node(103),
        AxNode::new("4")
            .with_role("link")
            .with_name("Weather today")
            .with_backend_node(104),
        AxNode::new("5")
            .with_role("StaticText")
            .with_name("Sunny 21°C")
            .with_backend_node(105),
    ]
}

#[derive(Debug, Clone, Default)]
pub struct FakeElementData {
    pub tag: String,
    pub text: String,
    pub attributes: HashMap<String, String>,
    /// URL of a tab opened when this element is clicked.
    pub opens_tab: Option<String>,
    pub click_fails: bool,
}

impl FakeElementData {
    pub fn tag(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }
}

/// Backend node handle; equality by node id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeElement(pub BackendNodeId);

/// In-memory browser shared between a test and the session it hands out.
#[derive(Debug, Default)]
pub struct FakeBrowser {
    pub tree: Vec<AxNode>,
    pub elements: HashMap<BackendNodeId, FakeElementData>,
    pub detached: HashSet<BackendNodeId>,
    pub markers: HashMap<String, BackendNodeId>,
    /// Never report tagged elements to selector queries.
    pub hide_markers: bool,
    pub tree_failures: usize,
    pub tree_fetches: usize,
    pub fail_navigation: bool,
    pub fail_close_tab: bool,
    pub tabs: Vec<(TabId, String)>,
    pub current: usize,
    pub back_stack: Vec<String>,
    pub events: Vec<String>,
    pub closed: bool,
    next_tab: usize,
}

impl FakeBrowser {
    pub fn new(tree: Vec<AxNode>) -> Self {
        let mut elements = HashMap::new();
        elements.insert(102, FakeElementData::tag("input"));
        elements.insert(103, FakeElementData::tag("button").with_text("Google Search"));
        elements.insert(104, FakeElementData::tag("a").with_text("Weather today"));
        elements.insert(105, FakeElementData::tag("span").with_text("Sunny 21°C"));
        Self {
            tree,
            elements,
            tabs: vec![(TabId("tab-0".into()), "about:blank".into())],
            next_tab: 1,
            ..Self::default()
        }
    }

    pub fn shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    pub fn current_url(&self) -> &str {
        &self.tabs[self.current].1
    }

    fn element(&self, el: &FakeElement) -> Result<&FakeElementData> {
        self.elements
            .get(&el.0)
            .ok_or_else(|| anyhow!("stale element {}", el.0))
    }

    fn element_mut(&mut self, el: &FakeElement) -> Result<&mut FakeElementData> {
        self.elements
            .get_mut(&el.0)
            .ok_or_else(|| anyhow!("stale element {}", el.0))
    }
}

pub struct FakeSession {
    pub browser: Arc<Mutex<FakeBrowser>>,
}

impl FakeSession {
    pub fn new(browser: Arc<Mutex<FakeBrowser>>) -> Self {
        Self { browser }
    }

    fn with<T>(&self, f: impl FnOnce(&mut FakeBrowser) -> Result<T>) -> Result<T> {
        let mut guard = self.browser.lock().map_err(|_| anyhow!("poisoned"))?;
        f(&mut guard)
    }
}

fn marker_arg(args: &[Value]) -> Result<String> {
    args.first()
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("missing marker argument"))
}

fn backend_of(object: &RemoteObjectId) -> Result<BackendNodeId> {
    object
        .0
        .strip_prefix("obj-")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| anyhow!("unknown object {}", object.0))
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Element = FakeElement;

    async fn accessibility_tree(&mut self) -> Result<Vec<AxNode>> {
        self.with(|b| {
            b.tree_fetches += 1;
            if b.tree_failures > 0 {
                b.tree_failures -= 1;
                bail!("Accessibility.getFullAXTree failed");
            }
            Ok(b.tree.clone())
        })
    }

    async fn resolve_backend_node(&mut self, backend: BackendNodeId) -> Result<RemoteObjectId> {
        self.with(|b| {
            if b.detached.contains(&backend) || !b.elements.contains_key(&backend) {
                bail!("No node with given id found");
            }
            Ok(RemoteObjectId(format!("obj-{backend}")))
        })
    }

    async fn call_function_on(
        &mut self,
        object: &RemoteObjectId,
        function: &str,
        args: Vec<Value>,
    ) -> Result<Value> {
        let backend = backend_of(object)?;
        let marker = marker_arg(&args)?;
        self.with(|b| {
            if function.contains("removeAttribute") {
                b.markers.remove(&marker);
            } else if function.contains("setAttribute") {
                b.markers.insert(marker, backend);
            } else {
                bail!("unexpected function {function}");
            }
            Ok(Value::Null)
        })
    }

    async fn query_selector(&mut self, selector: &str) -> Result<Option<FakeElement>> {
        let marker = selector.trim_start_matches('[').trim_end_matches(']');
        self.with(|b| {
            if b.hide_markers {
                return Ok(None);
            }
            Ok(b.markers.get(marker).map(|id| FakeElement(*id)))
        })
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.with(|b| {
            if b.fail_navigation {
                bail!("net::ERR_NAME_NOT_RESOLVED");
            }
            let previous = std::mem::replace(&mut b.tabs[b.current].1, url.to_string());
            b.back_stack.push(previous);
            b.events.push(format!("navigate:{url}"));
            Ok(())
        })
    }

    async fn go_back(&mut self) -> Result<()> {
        self.with(|b| {
            let previous = b.back_stack.pop().ok_or_else(|| anyhow!("no history"))?;
            let current = b.current;
            b.tabs[current].1 = previous;
            b.events.push("back".into());
            Ok(())
        })
    }

    async fn current_url(&mut self) -> Result<String> {
        self.with(|b| Ok(b.current_url().to_string()))
    }

    async fn click(&mut self, element: &FakeElement) -> Result<()> {
        self.with(|b| {
            let data = b.element(element)?.clone();
            if data.click_fails {
                bail!("element click intercepted");
            }
            b.events.push(format!("click:{}", element.0));
            if let Some(url) = data.opens_tab {
                let id = TabId(format!("tab-{}", b.next_tab));
                b.next_tab += 1;
                b.tabs.push((id, url));
            }
            Ok(())
        })
    }

    async fn clear(&mut self, element: &FakeElement) -> Result<()> {
        self.with(|b| {
            b.events.push(format!("clear:{}", element.0));
            Ok(())
        })
    }

    async fn send_keys(&mut self, element: &FakeElement, text: &str) -> Result<()> {
        self.with(|b| {
            b.element_mut(element)?.text = text.to_string();
            b.events.push(format!("keys:{}:{text}", element.0));
            Ok(())
        })
    }

    async fn press_enter(&mut self, element: &FakeElement) -> Result<()> {
        self.with(|b| {
            b.events.push(format!("enter:{}", element.0));
            Ok(())
        })
    }

    async fn text(&mut self, element: &FakeElement) -> Result<String> {
        self.with(|b| Ok(b.element(element)?.text.clone()))
    }

    async fn tag_name(&mut self, element: &FakeElement) -> Result<String> {
        self.with(|b| Ok(b.element(element)?.tag.clone()))
    }

    async fn attribute(&mut self, element: &FakeElement, name: &str) -> Result<Option<String>> {
        self.with(|b| Ok(b.element(element)?.attributes.get(name).cloned()))
    }

    async fn set_attribute(&mut self, element: &FakeElement, name: &str, value: &str) -> Result<()> {
        self.with(|b| {
            b.element_mut(element)?
                .attributes
                .insert(name.to_string(), value.to_string());
            Ok(())
        })
    }

    async fn tabs(&mut self) -> Result<Vec<TabId>> {
        self.with(|b| Ok(b.tabs.iter().map(|(id, _)| id.clone()).collect()))
    }

    async fn current_tab(&mut self) -> Result<TabId> {
        self.with(|b| Ok(b.tabs[b.current].0.clone()))
    }

    async fn switch_to_tab(&mut self, tab: &TabId) -> Result<()> {
        self.with(|b| {
            b.current = b
                .tabs
                .iter()
                .position(|(id, _)| id == tab)
                .ok_or_else(|| anyhow!("no such window"))?;
            Ok(())
        })
    }

    async fn close_tab(&mut self) -> Result<()> {
        self.with(|b| {
            if b.fail_close_tab {
                bail!("no such window");
            }
            if b.tabs.len() == 1 {
                bail!("refusing to close the last tab");
            }
            let current = b.current;
            b.tabs.remove(current);
            b.current = 0;
            Ok(())
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.with(|b| {
            b.closed = true;
            Ok(())
        })
    }
}

pub struct FakeConnector {
    pub browser: Arc<Mutex<FakeBrowser>>,
    pub fail: bool,
}

impl FakeConnector {
    pub fn new(browser: Arc<Mutex<FakeBrowser>>) -> Self {
        Self { browser, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            browser: FakeBrowser::default().shared(),
            fail: true,
        }
    }
}

#[async_trait]
impl SessionConnector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self) -> Result<FakeSession> {
        if self.fail {
            bail!("chromedriver not reachable at http://localhost:9515");
        }
        Ok(FakeSession::new(self.browser.clone()))
    }
}

/// Replays a fixed list of decisions, then fails.
#[derive(Default)]
pub struct ScriptedDecider {
    script: Mutex<VecDeque<Result<ProposedAction, AgentError>>>,
    /// Repeat this proposal forever once the script is exhausted.
    repeat: Option<ProposedAction>,
    pub calls: AtomicUsize,
    pub outlines: Mutex<Vec<String>>,
    pub histories: Mutex<Vec<String>>,
}

impl ScriptedDecider {
    pub fn new(script: Vec<ProposedAction>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().map(Ok).collect()),
            ..Self::default()
        })
    }

    pub fn with_results(script: Vec<Result<ProposedAction, AgentError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn repeating(action: ProposedAction) -> Arc<Self> {
        Arc::new(Self {
            repeat: Some(action),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Decider for ScriptedDecider {
    async fn decide(
        &self,
        _task: &str,
        outline: &Outline,
        history_json: &str,
    ) -> Result<ProposedAction, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outlines.lock().unwrap().push(outline.text().to_string());
        self.histories.lock().unwrap().push(history_json.to_string());
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        self.repeat
            .clone()
            .ok_or_else(|| AgentError::Decider("script exhausted".into()))
    }
}

/// Replays verdicts, then keeps saying `Continue`.
#[derive(Default)]
pub struct ScriptedJudge {
    script: Mutex<VecDeque<Result<Verdict, AgentError>>>,
    pub calls: AtomicUsize,
}

impl ScriptedJudge {
    pub fn new(script: Vec<Result<Verdict, AgentError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn judge(&self, _task: &str, _extracted: &str, _outline: &Outline) -> Result<Verdict, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Verdict::Continue))
    }
}

pub struct FixedAnswerer {
    answer: Option<String>,
    pub extracted_seen: Mutex<Option<String>>,
}

impl FixedAnswerer {
    pub fn new(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(answer.to_string()),
            extracted_seen: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            extracted_seen: Mutex::new(None),
        })
    }
}

#[async_trait]
impl Answerer for FixedAnswerer {
    async fn answer(&self, _task: &str, extracted: &str, _outline: &Outline) -> Result<String, AgentError> {
        *self.extracted_seen.lock().unwrap() = Some(extracted.to_string());
        self.answer
            .clone()
            .ok_or_else(|| AgentError::Answer("model returned no candidates".into()))
    }
}

pub fn click(index: usize) -> ProposedAction {
    ProposedAction::new(Some(index), "click")
}
