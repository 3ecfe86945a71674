//! Remote focus sink speaking the PostgREST dialect of a hosted Postgres
//! (row CRUD under `/rest/v1/<table>`, stored procedures under
//! `/rest/v1/rpc/<name>`).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use url::Url;

use super::sink::{write_failure, FocusSink};
use crate::error::{ConfigError, Result};

const INCREMENT_RPC: &str = "rest/v1/rpc/increment_focus_time";
const TASKS_TABLE: &str = "rest/v1/tasks";

pub struct RemoteFocusSink {
    base_url: Url,
    api_key: String,
    http_client: Client,
}

impl RemoteFocusSink {
    /// # Errors
    /// `ConfigError::InvalidValue` when `base_url` is not an absolute URL.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let mut base_url = Url::parse(base_url.trim()).map_err(|e| ConfigError::InvalidValue {
            key: "sink.url".into(),
            message: e.to_string(),
        })?;
        // Url::join drops the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            http_client: Client::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| {
            ConfigError::InvalidValue {
                key: "sink.url".into(),
                message: e.to_string(),
            }
            .into()
        })
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            return req;
        }
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, req: RequestBuilder, task_id: &str, seconds: u64) -> Result<reqwest::Response> {
        let resp = self
            .authorized(req)
            .send()
            .await
            .map_err(|e| write_failure(self.name(), task_id, seconds, e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(write_failure(
                self.name(),
                task_id,
                seconds,
                format!("HTTP {status}: {body}"),
            ));
        }
        Ok(resp)
    }
}

#[async_trait]
impl FocusSink for RemoteFocusSink {
    fn name(&self) -> &str {
        "remote"
    }

    async fn increment_focus_time(&self, task_id: &str, seconds: u64) -> Result<()> {
        let req = self
            .http_client
            .post(self.endpoint(INCREMENT_RPC)?)
            .json(&json!({ "task_id": task_id, "inc_value": seconds }));
        self.send(req, task_id, seconds).await?;
        Ok(())
    }

    async fn update_focus_time(&self, task_id: &str, new_total: u64) -> Result<()> {
        let req = self
            .http_client
            .patch(self.endpoint(TASKS_TABLE)?)
            .query(&[("id", format!("eq.{task_id}"))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "focus_time": new_total }));
        self.send(req, task_id, new_total).await?;
        Ok(())
    }

    async fn read_focus_time(&self, task_id: &str) -> Result<Option<u64>> {
        let req = self
            .http_client
            .get(self.endpoint(TASKS_TABLE)?)
            .query(&[("id", format!("eq.{task_id}")), ("select", "focus_time".into())]);
        let rows: serde_json::Value = self
            .send(req, task_id, 0)
            .await?
            .json()
            .await
            .map_err(|e| write_failure(self.name(), task_id, 0, e))?;
        Ok(rows
            .as_array()
            .and_then(|rows| rows.first())
            .and_then(|row| row["focus_time"].as_u64()))
    }
}
