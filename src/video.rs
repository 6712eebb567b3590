use std::env;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{info, warn};

use crate::error::AppError;

const MUX_API_BASE: &str = "https://api.mux.com/video/v1";

#[derive(Clone, Debug)]
pub struct MuxConfig {
    pub token_id: String,
    pub token_secret: String,
}

impl MuxConfig {
    /// Both credentials must be present, otherwise there is nothing to talk to.
    pub fn new_from_env() -> Option<Self> {
        let token_id = env::var("MUX_TOKEN_ID").ok()?;
        let token_secret = env::var("MUX_TOKEN_SECRET").ok()?;

        Some(Self {
            token_id,
            token_secret,
        })
    }
}

/// Asset ids are opaque tokens: ASCII letters, digits, `-` and `_`, at most
/// 128 characters. Anything else never reaches a request url.
pub fn is_valid_asset_id(asset_id: &str) -> bool {
    !asset_id.is_empty()
        && asset_id.len() <= 128
        && asset_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Remote host of chapter videos. Only asset cleanup is needed here; upload
/// and transcoding happen elsewhere.
#[async_trait]
pub trait VideoHost: Send + Sync {
    async fn delete_asset(&self, asset_id: &str) -> Result<(), AppError>;
}

pub struct MuxHttpClient {
    client: Client,
    config: MuxConfig,
}

impl MuxHttpClient {
    pub fn new(config: MuxConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::VideoHost(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl VideoHost for MuxHttpClient {
    async fn delete_asset(&self, asset_id: &str) -> Result<(), AppError> {
        if !is_valid_asset_id(asset_id) {
            return Err(AppError::VideoHost(format!("refusing malformed asset id {:?}", asset_id)));
        }
        let url = format!("{}/assets/{}", MUX_API_BASE, asset_id);

        let response = self
            .client
            .delete(&url)
            .basic_auth(&self.config.token_id, Some(&self.config.token_secret))
            .send()
            .await
            .map_err(|e| AppError::VideoHost(format!("request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!("video asset {} already gone", asset_id);
            return Ok(());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VideoHost(format!("Mux API error {}: {}", status, body)));
        }

        info!("deleted video asset {}", asset_id);
        Ok(())
    }
}

/// Used when no video host is configured, and in tests.
pub struct NoopVideoHost;

#[async_trait]
impl VideoHost for NoopVideoHost {
    async fn delete_asset(&self, asset_id: &str) -> Result<(), AppError> {
        info!("no video host configured, skipping delete of asset {}", asset_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_validation() {
        assert!(is_valid_asset_id("a1B2-c3_d4"));
        assert!(!is_valid_asset_id(""));
        assert!(!is_valid_asset_id("../playback-ids/x"));
        assert!(!is_valid_asset_id("abc?force=1"));
        assert!(!is_valid_asset_id(&"a".repeat(129)));
    }

    #[tokio::test]
    async fn test_mux_client_rejects_malformed_id_before_request() {
        let client = MuxHttpClient::new(MuxConfig {
            token_id: "id".to_string(),
            token_secret: "secret".to_string(),
        })
        .expect("client");

        let result = client.delete_asset("../../system/signing-keys").await;
        assert!(matches!(result, Err(AppError::VideoHost(_))));
    }
}
