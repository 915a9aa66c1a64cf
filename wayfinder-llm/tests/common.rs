use std::sync::Once;

use wayfinder_common::observability::{LogConfig, LogFormat, init_logging};

static TRACING: Once = Once::new();

/// Route provider logs to stderr once per test binary.
/// `WAYFINDER_LOG_FORMAT=json` switches to JSON lines.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let json = std::env::var("WAYFINDER_LOG_FORMAT")
            .is_ok_and(|raw| raw.trim().eq_ignore_ascii_case("json"));
        let _ = init_logging(LogConfig {
            app_name: "wayfinder-llm-tests",
            emit_stderr: true,
            format: if json { LogFormat::Json } else { LogFormat::Text },
            default_filter: "llm=debug,info",
            ..LogConfig::default()
        });
    });
}
