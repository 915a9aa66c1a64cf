use anyhow::{Context, Result};
use wayfinder_agent::Orchestrator;
use wayfinder_config::WayfinderConfig;
use wayfinder_drivers::wayfinder_browser::driver::WebDriverConnector;
use wayfinder_llm::ensure_llm_ready;

/// Everything a run needs, wired from one config.
pub struct Tether {
    pub orchestrator: Orchestrator,
    pub connector: WebDriverConnector,
}

pub async fn build_from_config(cfg: &WayfinderConfig) -> Result<Tether> {
    let llm = ensure_llm_ready(&cfg.llm)
        .await
        .context("language model is not ready")?;
    tracing::info!(target: "wayfinder.app", model = llm.model_name(), "model ready");

    Ok(Tether {
        orchestrator: Orchestrator::with_llm(cfg.agent.clone(), llm),
        connector: WebDriverConnector::new(cfg.browser.clone()),
    })
}
