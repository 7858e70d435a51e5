//! Client for the local fingerprint scanner service.

use crate::config::FingerprintDeviceConfig;
use crate::error::ApiError;
use crate::image::DataUrl;
use crate::session::Thumb;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A source of thumbprint images
#[async_trait]
pub trait FingerprintScanner: Send + Sync {
    /// Prepare the reader; must be called before the first capture
    async fn init(&self) -> Result<(), ApiError>;

    async fn capture(&self, thumb: Thumb) -> Result<DataUrl, ApiError>;
}

/// HTTP scanner service running next to the capture workstation
pub struct FingerprintDevice {
    http_client: reqwest::Client,
    base_url: Url,
}

impl FingerprintDevice {
    pub fn new(config: &FingerprintDeviceConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::network(format!("invalid device URL: {}", e)))?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.capture_timeout_seconds))
            .build()
            .map_err(|e| ApiError::network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn endpoint(&self, name: &str) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::network(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    async fn post(
        &self,
        name: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<String, ApiError> {
        let mut request = self.http_client.post(self.endpoint(name)?);
        if let Some(form) = form {
            request = request.form(form);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;
        if !status.is_success() {
            return Err(ApiError::Protocol {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Pull an image out of a scanner response: JSON with an image field, or
/// bare base64 text.
pub fn parse_capture_body(body: &str) -> Result<DataUrl, ApiError> {
    let body = body.trim();
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            if let Some(false) = map.get("success").and_then(Value::as_bool) {
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("scanner reported a failed capture");
                return Err(ApiError::format(message.to_string()));
            }
            let image = ["image", "data", "fingerprint", "template"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .ok_or_else(|| ApiError::format("scanner response has no image field"))?;
            DataUrl::parse(image).map_err(|e| ApiError::format(e.to_string()))
        }
        Ok(Value::String(image)) => {
            DataUrl::parse(&image).map_err(|e| ApiError::format(e.to_string()))
        }
        _ => DataUrl::parse(body).map_err(|e| ApiError::format(e.to_string())),
    }
}

#[async_trait]
impl FingerprintScanner for FingerprintDevice {
    async fn init(&self) -> Result<(), ApiError> {
        self.post("init", None).await.map_err(|e| {
            warn!(error = %e, "Fingerprint device initialization failed");
            e
        })?;
        info!("Fingerprint device initialized at {}", self.base_url);
        Ok(())
    }

    async fn capture(&self, thumb: Thumb) -> Result<DataUrl, ApiError> {
        let fields = [("thumbprint", thumb.device_value())];
        let body = self.post("capture", Some(&fields[..])).await?;
        let image = parse_capture_body(&body)?;
        debug!(thumb = thumb.device_value(), "Captured {}", image);
        Ok(image)
    }
}
