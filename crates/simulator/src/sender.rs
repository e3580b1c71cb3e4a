use model::position::PositionReport;
use serde::Deserialize;

use crate::SimulatorError;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Posts position reports to the ingest endpoint.
#[derive(Debug, Clone)]
pub struct ReportSender {
    client: reqwest::Client,
    endpoint: String,
}

impl ReportSender {
    pub fn new(api_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/location", api_url),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn send(&self, report: &PositionReport) -> Result<(), SimulatorError> {
        let response = self.client.post(&self.endpoint).json(report).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.to_string());
        Err(SimulatorError::Rejected { status, message })
    }
}
