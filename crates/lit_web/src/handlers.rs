use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use lit_core::types::current_year;
use lit_core::{CitationFormat, Report, ReportRequest, Result, YearRange};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::AppState;

const DEFAULT_PROVIDER: &str = "arxiv";
const DEFAULT_START_YEAR: i32 = 2000;

/// Body of `POST /api/reports`, shaped like the report form.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportForm {
    #[serde(default)]
    pub research_topic: String,
    #[serde(default)]
    pub related_topic: String,
    #[serde(default)]
    pub field_of_study: String,
    #[serde(default)]
    pub type_of_publication: String,
    /// `[start, end]`, inclusive
    #[serde(default = "default_date_range")]
    pub date_range: (i32, i32),
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub citation_format: CitationFormat,
    #[serde(default = "default_provider", alias = "provider")]
    pub open_access_site: String,
}

fn default_date_range() -> (i32, i32) {
    (DEFAULT_START_YEAR, current_year())
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

impl ReportForm {
    pub fn into_request(self) -> Result<ReportRequest> {
        let (start, end) = self.date_range;
        let mut request = ReportRequest::new(&self.research_topic, YearRange::new(start, end)?, &self.open_access_site);
        request.related_topic = self.related_topic;
        request.field_of_study = self.field_of_study;
        request.type_of_publication = self.type_of_publication;
        request.keywords = self.keywords;
        request.citation_format = self.citation_format;
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub emoji: &'static str,
    pub description: &'static str,
    pub aliases: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub status: &'static str,
    pub research_summary: Report,
    pub search_results_count: usize,
}

fn error_body(message: &str) -> Value {
    json!({ "error": message, "status": "error" })
}

fn no_results_body(report: &Report) -> Value {
    json!({
        "error": "Unable to generate research report",
        "status": "error",
        "conditions": report.conditions,
        "suggestions": {
            "modify_search": [
                "Broaden your keywords",
                "Extend the date range",
                "Remove specific filters",
            ],
            "alternative_actions": [
                "Try a different database",
                "Rephrase your research topic",
                "Check spelling",
            ],
        },
    })
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn list_providers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let providers: Vec<ProviderInfo> = state
        .pipeline
        .router()
        .providers()
        .into_iter()
        .map(|(metadata, aliases)| ProviderInfo {
            name: metadata.name,
            emoji: metadata.emoji,
            description: metadata.description,
            aliases,
        })
        .collect();
    Json(providers)
}

pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ReportForm>,
) -> (StatusCode, Json<Value>) {
    if form.research_topic.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(error_body("Research topic is required")));
    }

    let request = match form.into_request() {
        Ok(request) => request,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(error_body(&e.to_string()))),
    };

    info!("📝 Report requested: '{}' via {}", request.research_topic, request.provider);
    let report = state.pipeline.generate_report(&request).await;

    if report.articles.is_empty() {
        warn!("No articles for '{}', report not delivered", request.research_topic);
        return (StatusCode::BAD_REQUEST, Json(no_results_body(&report)));
    }

    let response = ReportResponse {
        status: "success",
        search_results_count: report.articles.len(),
        research_summary: report,
    };
    match serde_json::to_value(&response) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(error_body(&e.to_string()))),
    }
}
