//! Typed HTTP client for the equipment API.
//!
//! This is what a desktop front end (or a script) uses instead of hand-building requests. Each
//! method issues exactly one request; there are no retries.
//!
//! ```no_run
//! use chemviz::client::EquipmentClient;
//!
//! # async fn example() -> Result<(), chemviz::client::ClientError> {
//! let client = EquipmentClient::new("http://localhost:8000/api")?;
//! let created = client.upload_csv("plant.csv", std::fs::read("plant.csv").unwrap()).await?;
//! let summary = client.summary(Some(created.upload_id)).await?;
//! println!("{} records", summary.total_count);
//! # Ok(())
//! # }
//! ```

use crate::{
    api::models::uploads::{UploadCreatedResponse, UploadResponse},
    errors::ErrorResponse,
    summary::Aggregate,
    types::UploadId,
};
use reqwest::{Response, multipart};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Where a local development server listens
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response, or the response body could not be read
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an error status
    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct EquipmentClient {
    http: reqwest::Client,
    base_url: Url,
}

impl EquipmentClient {
    /// Client with no request timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::build(base_url, None)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Self::build(base_url, Some(timeout))
    }

    fn build(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        // Url::join replaces the last path segment unless the base ends with a slash
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn selection_query(upload_id: Option<UploadId>) -> Vec<(&'static str, String)> {
        upload_id.map(|id| ("upload_id", id.to_string())).into_iter().collect()
    }

    /// Turn an error status into [`ClientError::Api`], using the `{"error": ...}` body if present
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await?;
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.error)
            .unwrap_or(text);

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T> {
        Ok(Self::check(response).await?.json().await?)
    }

    /// Upload a CSV file as a new batch
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn upload_csv(&self, file_name: &str, content: Vec<u8>) -> Result<UploadCreatedResponse> {
        let part = multipart::Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = multipart::Form::new().part("file", part);

        let response = self.http.post(self.endpoint("upload/")?).multipart(form).send().await?;
        let created: UploadCreatedResponse = Self::json(response).await?;

        debug!(upload_id = created.upload_id, "Uploaded CSV");
        Ok(created)
    }

    /// Summary over all retained records, or over one upload
    pub async fn summary(&self, upload_id: Option<UploadId>) -> Result<Aggregate> {
        let response = self
            .http
            .get(self.endpoint("summary/")?)
            .query(&Self::selection_query(upload_id))
            .send()
            .await?;
        Self::json(response).await
    }

    /// Most recent uploads, newest first
    pub async fn history(&self) -> Result<Vec<UploadResponse>> {
        let response = self.http.get(self.endpoint("history/")?).send().await?;
        Self::json(response).await
    }

    pub async fn delete_upload(&self, upload_id: UploadId) -> Result<()> {
        let response = self
            .http
            .delete(self.endpoint(&format!("history/{upload_id}/"))?)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Download the PDF report bytes
    pub async fn report(&self, upload_id: Option<UploadId>) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(self.endpoint("pdf/")?)
            .query(&Self::selection_query(upload_id))
            .send()
            .await?;
        let bytes = Self::check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> EquipmentClient {
        EquipmentClient::new(&format!("{}/api", server.uri())).unwrap()
    }

    fn summary_json() -> serde_json::Value {
        serde_json::json!({
            "total_count": 2,
            "avg_flowrate": 10.0,
            "avg_pressure": 2.0,
            "avg_temperature": 80.0,
            "type_distribution": { "Pump": 2 }
        })
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = EquipmentClient::new("http://localhost:8000/api").unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_BASE_URL);
        assert_eq!(client.endpoint("summary/").unwrap().as_str(), "http://localhost:8000/api/summary/");

        assert!(matches!(EquipmentClient::new("not a url"), Err(ClientError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_upload_csv() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload/"))
            .and(body_string_contains("name=\"file\""))
            .and(body_string_contains("Pump-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "File uploaded successfully",
                "upload_id": 7,
                "summary": summary_json(),
                "data": [{
                    "Equipment Name": "Pump-1",
                    "Type": "Pump",
                    "Flowrate": 10.0,
                    "Pressure": 2.0,
                    "Temperature": 80.0
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = client_for(&server)
            .upload_csv("plant.csv", b"Equipment Name,Type\nPump-1,Pump\n".to_vec())
            .await
            .unwrap();

        assert_eq!(created.upload_id, 7);
        assert_eq!(created.summary.total_count, 2);
        assert_eq!(created.data[0].equipment_name, "Pump-1");
    }

    #[tokio::test]
    async fn test_summary_with_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/summary/"))
            .and(query_param("upload_id", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(summary_json()))
            .expect(1)
            .mount(&server)
            .await;

        let summary = client_for(&server).summary(Some(3)).await.unwrap();
        assert_eq!(summary.type_distribution["Pump"], 2);
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/summary/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({ "error": "No data found" })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/history/9/"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server);

        match client.summary(None).await.unwrap_err() {
            ClientError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "No data found");
            }
            other => panic!("expected api error, got {other:?}"),
        }

        match client.delete_upload(9).await.unwrap_err() {
            ClientError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_history_delete_and_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/history/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 2, "file_name": "b.csv", "uploaded_at": "2025-01-01T10:00:00Z" },
                { "id": 1, "file_name": "a.csv", "uploaded_at": "2025-01-01T09:00:00Z" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/history/2/"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/pdf/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.5 fake".to_vec()),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);

        let history = client.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].file_name, "b.csv");

        client.delete_upload(2).await.unwrap();

        let pdf = client.report(None).await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        // nothing listens on port 1
        let client = EquipmentClient::with_timeout("http://127.0.0.1:1/api/", Duration::from_secs(2)).unwrap();
        assert!(matches!(client.history().await, Err(ClientError::Transport(_))));
    }
}
