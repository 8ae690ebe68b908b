use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::RetryTransientMiddleware;
use reqwest_retry::policies::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use utoipa::ToSchema;

use crate::config::TonieCloudConfig;
use crate::library::model::Audiobook;

/// A creative tonie as reported by the vendor account listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub(crate) struct Tonie {
    pub id: String,
    pub name: String,
    /// Vendor fields beyond id/name are passed through verbatim.
    #[serde(flatten)]
    #[schema(value_type = std::collections::BTreeMap<String, serde_json::Value>)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Boundary to the tonie cloud. The upload worker and the tonie list
/// refresher only ever reach the vendor through this trait.
#[async_trait]
pub(crate) trait TonieCloudApi: Send + Sync {
    /// Lists the creative tonies on the configured account.
    async fn creative_tonies(&self) -> Result<Vec<Tonie>>;

    /// Replaces the tonie's chapters with the audiobook's tracks.
    /// `Ok(false)` means the vendor rejected the upload.
    async fn upload_album(&self, tonie: &Tonie, audiobook: &Audiobook) -> Result<bool>;
}

pub(crate) struct TonieCloudClient {
    base_url: String,
    username: String,
    password: String,
    client: ClientWithMiddleware,
    session: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    token: String,
}

impl TonieCloudClient {
    pub(crate) fn new(config: &TonieCloudConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let base = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("failed to build tonie cloud client")?;
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(base)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();
        Ok(Self {
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
            client,
            session: Mutex::new(None),
        })
    }

    async fn session_token(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.as_ref() {
            return Ok(token.clone());
        }
        let url = format!("{}/session", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({
                "email": self.username,
                "password": self.password,
            }))
            .send()
            .await
            .context("tonie cloud session request failed")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("tonie cloud login failed ({status}): {body}");
        }
        let body: SessionResponse = response
            .json()
            .await
            .context("decode tonie cloud session response")?;
        *session = Some(body.token.clone());
        Ok(body.token)
    }
}

#[async_trait]
impl TonieCloudApi for TonieCloudClient {
    async fn creative_tonies(&self) -> Result<Vec<Tonie>> {
        let token = self.session_token().await?;
        let url = format!("{}/creativetonies", self.base_url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&token)
            .send()
            .await
            .context("creative tonie list request failed")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("creative tonie list failed ({status}): {body}");
        }
        response
            .json::<Vec<Tonie>>()
            .await
            .context("decode creative tonie list")
    }

    async fn upload_album(&self, tonie: &Tonie, audiobook: &Audiobook) -> Result<bool> {
        let token = self.session_token().await?;
        let url = format!("{}/creativetonies/{}/chapters", self.base_url, tonie.id);

        for track in &audiobook.tracks {
            let bytes = tokio::fs::read(&track.path)
                .await
                .with_context(|| format!("failed to read track {}", track.path.display()))?;
            let file_name = track
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("track-{}", track.track_no));
            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str("application/octet-stream")?;
            let form = Form::new()
                .text("title", track.title.clone())
                .part("file", part);

            let response = self
                .client
                .post(&url)
                .bearer_auth(&token)
                .multipart(form)
                .send()
                .await
                .context("chapter upload request failed")?;
            if !response.status().is_success() {
                let status = response.status();
                if status.is_client_error() {
                    tracing::warn!(
                        tonie = %tonie.id,
                        track = %track.title,
                        status = %status,
                        "tonie cloud rejected chapter upload"
                    );
                    return Ok(false);
                }
                let body = response.text().await.unwrap_or_default();
                bail!("chapter upload failed ({status}): {body}");
            }
        }
        tracing::info!(
            tonie = %tonie.id,
            audiobook = %audiobook.id,
            tracks = audiobook.tracks.len(),
            "album uploaded"
        );
        Ok(true)
    }
}
