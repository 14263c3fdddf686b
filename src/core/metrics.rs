use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const OAUTH_LOGINS_TOTAL: &str = "oauth_logins_total";
pub(crate) const QUIZ_ATTEMPTS_FINISHED_TOTAL: &str = "quiz_attempts_finished_total";
pub(crate) const QUESTION_BATCH_IMPORTED_TOTAL: &str = "question_batch_imported_total";
pub(crate) const USER_SESSIONS_CLEANED_TOTAL: &str = "user_sessions_cleaned_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_oauth_login(success: bool) {
    let status = if success { "success" } else { "failure" };
    metrics::counter!(OAUTH_LOGINS_TOTAL, "status" => status).increment(1);
}
