//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Sources are merged in this order (later wins):
//!
//! 1. built-in defaults (every section is optional),
//! 2. YAML/TOML/JSON files or inline YAML snippets,
//! 3. `WAYFINDER__`-prefixed environment variables, with `__` separating
//!    nested keys (`WAYFINDER__AGENT__MAX_ITERATIONS=5`).
//!
//! After merging, `${VAR}` placeholders in string values are expanded from the
//! process environment before the typed [`WayfinderConfig`] is built.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wayfinder_common::observability::LogFormat;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WayfinderConfig {
    pub version: Option<String>,
    pub browser: BrowserSettings,
    pub agent: AgentSettings,
    pub llm: LlmConfig,
    pub logging: LoggingSettings,
}

/// How the WebDriver session is created.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub headless: bool,
    pub stealth: StealthLevel,
    /// Type one character at a time with small random pauses.
    pub human_typing: bool,
    pub extra_args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: false,
            stealth: StealthLevel::Balanced,
            human_typing: true,
            extra_args: Vec::new(),
        }
    }
}

/// Levels of stealth applied to the browser session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StealthLevel {
    Lightweight,
    #[default]
    Balanced,
}

/// Knobs of the orchestration loop and its components.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Successful actions allowed before the run is finalized.
    pub max_iterations: u32,
    /// Consecutive steps without a successful action before giving up.
    pub max_stalled_steps: u32,
    pub max_nodes: usize,
    pub max_depth: Option<usize>,
    pub indent: IndentStyle,
    pub suppressed_roles: Vec<String>,
    pub home_url: String,
    pub resolve_timeout_ms: u64,
    pub resolve_poll_ms: u64,
    pub settle: SettleDelays,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            max_stalled_steps: 10,
            max_nodes: 300,
            max_depth: None,
            indent: IndentStyle::Tab,
            suppressed_roles: vec!["gridcell".into()],
            home_url: "https://www.google.com".into(),
            resolve_timeout_ms: 5_000,
            resolve_poll_ms: 100,
            settle: SettleDelays::default(),
        }
    }
}

impl AgentSettings {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn resolve_poll_interval(&self) -> Duration {
        Duration::from_millis(self.resolve_poll_ms)
    }
}

/// Indentation unit used when rendering the outline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    #[default]
    Tab,
    Spaces(usize),
}

impl IndentStyle {
    pub fn unit(&self) -> String {
        match self {
            IndentStyle::Tab => "\t".to_string(),
            IndentStyle::Spaces(n) => " ".repeat(*n),
        }
    }
}

/// Fixed waits inserted after each action so the page can catch up.
///
/// These stand in for real readiness signals from the browser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SettleDelays {
    pub click_ms: u64,
    pub focus_ms: u64,
    pub input_ms: u64,
    pub submit_ms: u64,
    pub wait_ms: u64,
    pub navigate_ms: u64,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            click_ms: 2_000,
            focus_ms: 500,
            input_ms: 500,
            submit_ms: 2_000,
            wait_ms: 5_000,
            navigate_ms: 2_000,
        }
    }
}

impl SettleDelays {
    /// All delays set to zero; handy for tests and dry runs.
    pub fn none() -> Self {
        Self {
            click_ms: 0,
            focus_ms: 0,
            input_ms: 0,
            submit_ms: 0,
            wait_ms: 0,
            navigate_ms: 0,
        }
    }

    pub fn click(&self) -> Duration {
        Duration::from_millis(self.click_ms)
    }
    pub fn focus(&self) -> Duration {
        Duration::from_millis(self.focus_ms)
    }
    pub fn input(&self) -> Duration {
        Duration::from_millis(self.input_ms)
    }
    pub fn submit(&self) -> Duration {
        Duration::from_millis(self.submit_ms)
    }
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
    pub fn navigate(&self) -> Duration {
        Duration::from_millis(self.navigate_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Gemini {
        model: String,
        api_key: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<u32>,
        #[serde(default = "default_gemini_endpoint")]
        endpoint: String,
    },
    Ollama {
        model: String,
        #[serde(default = "default_ollama_endpoint")]
        endpoint: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<u32>,
    },
    #[default]
    None,
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_ollama_endpoint() -> String {
    "http://localhost:11434".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    pub dir: Option<PathBuf>,
    pub stderr: bool,
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (files + env overrides).
pub struct WayfinderConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for WayfinderConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl WayfinderConfigLoader {
    /// Start from built-in defaults; environment overrides are layered last
    /// by [`load`](Self::load).
    ///
    /// ```
    /// use wayfinder_config::WayfinderConfigLoader;
    ///
    /// let config = WayfinderConfigLoader::new()
    ///     .with_yaml_str("version: '1'\nagent:\n  max_iterations: 4")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.agent.max_iterations, 4);
    /// assert_eq!(config.agent.max_nodes, 300);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so env-only deployments still load.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use wayfinder_config::{LlmConfig, WayfinderConfigLoader};
    ///
    /// let cfg = WayfinderConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// llm:
    ///   provider: ollama
    ///   model: "llama3.2:3b"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(matches!(
    ///     cfg.llm,
    ///     LlmConfig::Ollama { ref endpoint, .. } if endpoint == "http://localhost:11434"
    /// ));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use wayfinder_config::{LlmConfig, WayfinderConfigLoader};
    ///
    /// unsafe { std::env::set_var("WF_DOC_GEMINI_KEY", "injected-from-env"); }
    ///
    /// let config = WayfinderConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// llm:
    ///   provider: "gemini"
    ///   model: "gemini-2.5-pro"
    ///   api_key: "${WF_DOC_GEMINI_KEY}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// match &config.llm {
    ///     LlmConfig::Gemini { model, api_key, .. } => {
    ///         assert_eq!(model, "gemini-2.5-pro");
    ///         assert_eq!(api_key, "injected-from-env");
    ///     }
    ///     _ => panic!("expected Gemini configuration"),
    /// }
    ///
    /// unsafe { std::env::remove_var("WF_DOC_GEMINI_KEY"); }
    /// ```
    pub fn load(self) -> Result<WayfinderConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("WAYFINDER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
