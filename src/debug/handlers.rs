use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::debug::DebugState;
use crate::version::VersionInfo;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub app: String,
    pub token: String,
    pub phase: &'static str,
    pub failed: bool,
    pub version: &'static str,
}

pub async fn get_index(State(state): State<DebugState>) -> Html<String> {
    let phase = state.phase.get();
    Html(format!(
        "<html>\n\t<h1>Debug server: {token}</h1>\n\t<p>{app} {version} ({phase})</p>\n\t<ul>\n\t\t<li><a href=\"/debug/vars\">vars</a></li>\n\t\t<li><a href=\"/debug/status\">status</a></li>\n\t\t<li><a href=\"/metrics\">metrics</a></li>\n\t</ul>\n</html>\n",
        token = escape(&state.token),
        app = escape(&state.app_name),
        version = VersionInfo::current().version,
        phase = phase,
    ))
}

pub async fn get_status(State(state): State<DebugState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        app: state.app_name.clone(),
        token: state.token.clone(),
        phase: state.phase.get().as_str(),
        failed: state.phase.failed(),
        version: VersionInfo::current().version,
    })
}

pub async fn get_vars(State(state): State<DebugState>) -> Json<BTreeMap<String, Value>> {
    Json(state.params.snapshot())
}

pub async fn get_metrics(State(state): State<DebugState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics recorder not installed").into_response(),
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
