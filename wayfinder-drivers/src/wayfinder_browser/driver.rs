use crate::session::{
    AxNode, BackendNodeId, BrowserSession, RemoteObjectId, SessionConnector, TabId,
};
use crate::wayfinder_browser::{
    behavioral::KeystrokePacer,
    cdp::CdpCommand,
    stealth::{chrome_arguments, page_patches},
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fantoccini::{elements::Element, wd::WindowHandle, Client, ClientBuilder, Locator};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};
use wayfinder_config::{BrowserSettings, StealthLevel};
use webdriver::capabilities::Capabilities;

/// WebDriver `Enter` key code point.
const ENTER_KEY: &str = "\u{E007}";

/// Thin wrapper around a `fantoccini` WebDriver client that implements
/// [`BrowserSession`] for Chromium via chromedriver.
pub struct WayfinderDriver {
    pub client: Client,
    pacer: KeystrokePacer,
    stealth: StealthLevel,
    human_typing: bool,
}

impl WayfinderDriver {
    /// Create a new driver connected to a running WebDriver service.
    pub async fn new(settings: &BrowserSettings) -> Result<Self> {
        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();
        chrome_opts.insert("args".to_string(), json!(chrome_arguments(settings)));
        chrome_opts.insert(
            "excludeSwitches".to_string(),
            json!(["enable-automation"]),
        );
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&settings.webdriver_url)
            .await
            .with_context(|| format!("failed to reach WebDriver at {}", settings.webdriver_url))?;

        Ok(Self {
            client,
            pacer: KeystrokePacer::default(),
            stealth: settings.stealth,
            human_typing: settings.human_typing,
        })
    }

    /// Run a DevTools method against the focused tab and return its result object.
    pub async fn cdp(&self, method: &str, params: Value) -> Result<Value> {
        debug!(target: "browser.cdp", %method, "issuing devtools command");
        let cmd = CdpCommand::new(method, params);
        self.client
            .issue_cmd(cmd)
            .await
            .with_context(|| format!("devtools command {method} failed"))
    }

    async fn apply_stealth(&self) -> Result<()> {
        for script in page_patches(self.stealth) {
            self.client.execute(script, vec![]).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for WayfinderDriver {
    type Element = Element;

    async fn accessibility_tree(&mut self) -> Result<Vec<AxNode>> {
        self.cdp("Accessibility.enable", json!({})).await?;
        let result = self.cdp("Accessibility.getFullAXTree", json!({})).await?;
        let nodes = result
            .get("nodes")
            .cloned()
            .ok_or_else(|| anyhow!("getFullAXTree returned no `nodes` field"))?;
        serde_json::from_value(nodes).context("malformed accessibility nodes")
    }

    async fn resolve_backend_node(&mut self, backend: BackendNodeId) -> Result<RemoteObjectId> {
        let result = self
            .cdp("DOM.resolveNode", json!({ "backendNodeId": backend }))
            .await?;
        result
            .pointer("/object/objectId")
            .and_then(Value::as_str)
            .map(|id| RemoteObjectId(id.to_string()))
            .ok_or_else(|| anyhow!("backend node {backend} has no live object"))
    }

    async fn call_function_on(
        &mut self,
        object: &RemoteObjectId,
        function: &str,
        args: Vec<Value>,
    ) -> Result<Value> {
        let arguments: Vec<Value> = args.into_iter().map(|v| json!({ "value": v })).collect();
        let result = self
            .cdp(
                "Runtime.callFunctionOn",
                json!({
                    "objectId": object.0,
                    "functionDeclaration": function,
                    "arguments": arguments,
                    "returnByValue": true,
                }),
            )
            .await?;
        if let Some(details) = result.get("exceptionDetails") {
            return Err(anyhow!("page script threw: {details}"));
        }
        Ok(result
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn query_selector(&mut self, selector: &str) -> Result<Option<Element>> {
        let found = self.client.find_all(Locator::Css(selector)).await?;
        Ok(found.into_iter().next())
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.client.goto(url).await?;
        if let Err(e) = self.apply_stealth().await {
            warn!(target: "browser.stealth", error = %e, "stealth scripts failed");
        }
        Ok(())
    }

    async fn go_back(&mut self) -> Result<()> {
        self.client.back().await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn click(&mut self, element: &Element) -> Result<()> {
        element.click().await?;
        Ok(())
    }

    async fn clear(&mut self, element: &Element) -> Result<()> {
        element.clear().await?;
        Ok(())
    }

    async fn send_keys(&mut self, element: &Element, text: &str) -> Result<()> {
        if self.human_typing {
            self.pacer.type_into(element, text).await
        } else {
            element.send_keys(text).await?;
            Ok(())
        }
    }

    async fn press_enter(&mut self, element: &Element) -> Result<()> {
        element.send_keys(ENTER_KEY).await?;
        Ok(())
    }

    async fn text(&mut self, element: &Element) -> Result<String> {
        Ok(element.text().await?)
    }

    async fn tag_name(&mut self, element: &Element) -> Result<String> {
        Ok(element.tag_name().await?)
    }

    async fn attribute(&mut self, element: &Element, name: &str) -> Result<Option<String>> {
        Ok(element.attr(name).await?)
    }

    async fn set_attribute(&mut self, element: &Element, name: &str, value: &str) -> Result<()> {
        self.client
            .execute(
                "arguments[0].setAttribute(arguments[1], arguments[2]);",
                vec![serde_json::to_value(element)?, json!(name), json!(value)],
            )
            .await?;
        Ok(())
    }

    async fn tabs(&mut self) -> Result<Vec<TabId>> {
        let handles = self.client.windows().await?;
        Ok(handles
            .into_iter()
            .map(|h| TabId(String::from(h)))
            .collect())
    }

    async fn current_tab(&mut self) -> Result<TabId> {
        Ok(TabId(String::from(self.client.window().await?)))
    }

    async fn switch_to_tab(&mut self, tab: &TabId) -> Result<()> {
        let handle = WindowHandle::try_from(tab.0.clone())
            .map_err(|e| anyhow!("invalid tab handle {}: {e:?}", tab.0))?;
        self.client.switch_to_window(handle).await?;
        Ok(())
    }

    async fn close_tab(&mut self) -> Result<()> {
        self.client.close_window().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.client.clone().close().await?;
        Ok(())
    }
}

/// Opens a new [`WayfinderDriver`] per task run.
#[derive(Debug, Clone)]
pub struct WebDriverConnector {
    settings: BrowserSettings,
}

impl WebDriverConnector {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionConnector for WebDriverConnector {
    type Session = WayfinderDriver;

    async fn connect(&self) -> Result<WayfinderDriver> {
        WayfinderDriver::new(&self.settings).await
    }
}
