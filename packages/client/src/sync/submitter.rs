use async_trait::async_trait;

use crate::{config::SyncConfig, error::SyncError, outbox::OutboxRecord};

/// Replays one outbox record through the REST API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RestSubmitter: Send + Sync {
    /// `Ok` only when the server acknowledged the record with a 2xx.
    async fn submit(&self, record: &OutboxRecord) -> Result<(), SyncError>;
}

/// reqwest-backed submitter.
///
/// `MESSAGE` posts to `{base}/messages`, `ATTENDANCE` to `{base}/attendance`.
/// The record id travels as `Idempotency-Key` so the server can deduplicate.
pub struct HttpSubmitter {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSubmitter {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SyncError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, record: &OutboxRecord) -> String {
        format!("{}{}", self.base_url, record.kind.rest_path())
    }
}

#[async_trait]
impl RestSubmitter for HttpSubmitter {
    async fn submit(&self, record: &OutboxRecord) -> Result<(), SyncError> {
        let mut request = self
            .client
            .post(self.endpoint(record))
            .header("Idempotency-Key", &record.id)
            .json(&record.payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SyncError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
