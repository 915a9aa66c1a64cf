use fantoccini::wd::WebDriverCompatibleCommand;
use serde_json::{json, Value};

/// A DevTools protocol call sent through chromedriver's
/// `POST /session/{id}/goog/cdp/execute` extension.
#[derive(Debug, Clone)]
pub struct CdpCommand {
    method: String,
    params: Value,
}

impl CdpCommand {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Request body expected by chromedriver.
    pub fn body(&self) -> Value {
        json!({ "cmd": self.method, "params": self.params })
    }
}

impl WebDriverCompatibleCommand for CdpCommand {
    fn endpoint(
        &self,
        base_url: &url::Url,
        session_id: Option<&str>,
    ) -> Result<url::Url, url::ParseError> {
        let session = session_id.unwrap_or_default();
        base_url.join(&format!("session/{session}/goog/cdp/execute"))
    }

    fn method_and_body(&self, _request_url: &url::Url) -> (http::Method, Option<String>) {
        (http::Method::POST, Some(self.body().to_string()))
    }
}
