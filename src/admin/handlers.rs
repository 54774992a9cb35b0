use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::provider::StatusReport;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub cluster: String,
    pub poll_interval_secs: u64,
    pub output_path: Option<String>,
    #[serde(flatten)]
    pub provider: StatusReport,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let settings = state.settings.load();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        cluster: settings.cluster.endpoint.clone(),
        poll_interval_secs: settings.poll.interval_secs,
        output_path: settings.poll.output_path.clone(),
        provider: state.provider.status(),
    })
}
