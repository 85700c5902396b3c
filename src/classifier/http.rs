//! Remote sentiment model served over HTTP.
//!
//! The model server accepts `POST {"text": "..."}` and answers with a JSON
//! object of class-index probabilities, e.g. `{"0": 0.1, "1": 0.2, "2": 0.7}`.

use super::{canonicalize, Classifier, ClassifierError, RawScores};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Text sent to check the server before a write.
const READINESS_PROBE: &str = "ready";

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

/// Classifier backed by a model-serving endpoint.
pub struct HttpClassifier {
    url: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl HttpClassifier {
    pub fn new(url: &str, timeout_seconds: u64) -> Result<Self, ClassifierError> {
        info!("Using remote classifier at {}", url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ClassifierError::Unavailable(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.to_string(),
            timeout_seconds,
            http_client,
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<RawScores, ClassifierError> {
        debug!("Classifying {} chars via {}", text.chars().count(), self.url);

        let response = self
            .http_client
            .post(&self.url)
            .json(&PredictRequest { text })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Request(format!(
                        "request timed out after {}s",
                        self.timeout_seconds
                    ))
                } else if e.is_connect() {
                    ClassifierError::Unavailable(format!("cannot connect to {}", self.url))
                } else {
                    ClassifierError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status { status, body });
        }

        response
            .json::<RawScores>()
            .await
            .map_err(|e| ClassifierError::Decode(e.to_string()))
    }

    fn name(&self) -> &str {
        "http"
    }

    async fn check_ready(&self) -> Result<(), ClassifierError> {
        let raw = self.classify(READINESS_PROBE).await.map_err(|e| match e {
            ClassifierError::Unavailable(_) => e,
            other => ClassifierError::Unavailable(other.to_string()),
        })?;
        canonicalize(&raw)
            .map(|_| ())
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_request_shape() {
        let body = serde_json::to_value(PredictRequest { text: "hello" }).unwrap();
        assert_eq!(body, serde_json::json!({"text": "hello"}));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Port 9 (discard) is not expected to run an HTTP server.
        let classifier = HttpClassifier::new("http://127.0.0.1:9/predict", 2).unwrap();
        let err = classifier.check_ready().await.unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }
}
