use super::response::{
    is_empty_array_placeholder, normalize_decision, normalize_submit, LookupOutcome,
    SubmitOutcome,
};
use super::types::{
    ApprovalRequest, EnquiryBundle, FingerprintPayload, IdentificationPayload, ImageBundle,
    ImageKind, SaveDataForm,
};
use crate::activity::{ActivityConfig, ActivityWire};
use crate::config::BackendConfig;
use crate::error::ApiError;
use crate::image::DataUrl;
use crate::session::{Fingerprints, IdentificationDocument};
use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Operations offered by the imaging backend.
///
/// Implementations never retry and never return transport errors as `Err`
/// except for [`ImagingBackend::fetch_activities`], whose caller substitutes
/// a default configuration.
#[async_trait]
pub trait ImagingBackend: Send + Sync {
    /// Upload a photo or signature for a customer/relation
    async fn capture_browse(&self, cus_no: &str, kind: ImageKind, image: &DataUrl)
        -> SubmitOutcome;

    async fn submit_identification(
        &self,
        relation_no: &str,
        documents: &[IdentificationDocument],
    ) -> SubmitOutcome;

    async fn submit_fingerprints(&self, relation_no: &str, prints: &Fingerprints)
        -> SubmitOutcome;

    /// Final write of the enrollment record
    async fn save_data(&self, form: &SaveDataForm) -> SubmitOutcome;

    /// Look up approved and pending images for a relation
    async fn search_images(&self, relation_no: &str) -> LookupOutcome<ImageBundle>;

    async fn approve_image(&self, request: &ApprovalRequest) -> LookupOutcome<Value>;

    async fn reject_image(&self, request: &ApprovalRequest, reason: &str)
        -> LookupOutcome<Value>;

    async fn fetch_enquiry(&self, customer_id: &str) -> LookupOutcome<EnquiryBundle>;

    async fn fetch_relation_details(&self, encrypted_id: &str) -> LookupOutcome<EnquiryBundle>;

    async fn fetch_activities(&self) -> Result<ActivityConfig, ApiError>;

    async fn save_activities(&self, config: &ActivityConfig) -> SubmitOutcome;
}

/// HTTP implementation of [`ImagingBackend`]
pub struct ImagingClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl ImagingClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::network(format!("invalid backend URL: {}", e)))?;

        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let http_client = builder
            .build()
            .map_err(|e| ApiError::network(e.to_string()))?;

        info!("Imaging backend client targeting {}", base_url);
        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::network(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        request
            .send()
            .await
            .map_err(|e| ApiError::network(e.to_string()))
    }

    /// Read a 2xx body as text; anything else is a protocol error
    async fn read_text(&self, response: reqwest::Response) -> Result<String, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Protocol {
                status: status.as_u16(),
                body,
            });
        }
        response
            .text()
            .await
            .map_err(|e| ApiError::network(e.to_string()))
    }

    async fn submit(&self, operation: &str, request: reqwest::RequestBuilder) -> SubmitOutcome {
        let outcome = match self.send(request).await {
            Ok(response) => match self.read_text(response).await {
                Ok(body) => normalize_submit(&body),
                Err(e) => SubmitOutcome::from_error(e),
            },
            Err(e) => SubmitOutcome::from_error(e),
        };
        log_submit(operation, &outcome);
        outcome
    }

    async fn lookup<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: Result<Url, ApiError>,
    ) -> LookupOutcome<T> {
        let url = match url {
            Ok(url) => url,
            Err(e) => return LookupOutcome::from_error(e),
        };
        debug!(operation, %url, "Fetching");

        let response = match self.send(self.http_client.get(url)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(operation, error = %e, "Lookup failed");
                return LookupOutcome::from_error(e);
            }
        };
        if response.status() == StatusCode::NOT_FOUND {
            debug!(operation, "Nothing found");
            return LookupOutcome::not_found("No records found");
        }

        let body = match self.read_text(response).await {
            Ok(body) => body,
            Err(e) => {
                warn!(operation, error = %e, "Lookup failed");
                return LookupOutcome::from_error(e);
            }
        };
        if is_empty_array_placeholder(&body) {
            debug!(operation, "Empty result");
            return LookupOutcome::not_found("No records found");
        }
        match serde_json::from_str::<T>(&body) {
            Ok(data) => LookupOutcome::success("Records loaded", Some(data)),
            Err(e) => {
                warn!(operation, error = %e, "Lookup returned an unreadable body");
                LookupOutcome::from_error(ApiError::format(e.to_string()))
            }
        }
    }

    async fn decide(
        &self,
        operation: &str,
        url: Result<Url, ApiError>,
        form: Option<Form>,
        success_message: &str,
    ) -> LookupOutcome<Value> {
        let url = match url {
            Ok(url) => url,
            Err(e) => return LookupOutcome::from_error(e),
        };
        let mut request = self.http_client.post(url);
        if let Some(form) = form {
            request = request.multipart(form);
        }

        let outcome = match self.send(request).await {
            Ok(response) => match self.read_text(response).await {
                Ok(body) => normalize_decision(&body, success_message),
                Err(e) => LookupOutcome::from_error(e),
            },
            Err(e) => LookupOutcome::from_error(e),
        };
        if outcome.is_success() {
            info!(operation, "{}", outcome.message);
        } else {
            warn!(operation, status = ?outcome.status, "{}", outcome.message);
        }
        outcome
    }
}

fn log_submit(operation: &str, outcome: &SubmitOutcome) {
    match (&outcome.error, outcome.success) {
        (_, true) => info!(operation, "Backend accepted submission"),
        (Some(e), false) => warn!(operation, kind = e.kind(), error = %e, "Submission failed"),
        (None, false) => warn!(operation, message = ?outcome.message, "Backend rejected submission"),
    }
}

#[async_trait]
impl ImagingBackend for ImagingClient {
    async fn capture_browse(
        &self,
        cus_no: &str,
        kind: ImageKind,
        image: &DataUrl,
    ) -> SubmitOutcome {
        let url = match self.endpoint(&["imaging", "capture_browse"]) {
            Ok(url) => url,
            Err(e) => return SubmitOutcome::from_error(e),
        };
        let form = Form::new()
            .text("cus_no", cus_no.to_string())
            .text("a", kind.form_value())
            .text("image", image.payload().to_string());

        self.submit("capture_browse", self.http_client.post(url).multipart(form))
            .await
    }

    async fn submit_identification(
        &self,
        relation_no: &str,
        documents: &[IdentificationDocument],
    ) -> SubmitOutcome {
        let segment = format!("capture_id_details-{}", relation_no);
        let url = match self.endpoint(&["imaging", &segment]) {
            Ok(url) => url,
            Err(e) => return SubmitOutcome::from_error(e),
        };
        let payload = IdentificationPayload::from_documents(documents);
        debug!(documents = payload.documents.len(), "Submitting identification");

        self.submit("capture_id_details", self.http_client.post(url).json(&payload))
            .await
    }

    async fn submit_fingerprints(&self, relation_no: &str, prints: &Fingerprints) -> SubmitOutcome {
        let segment = format!("capture_fingerprint-{}", relation_no);
        let url = match self.endpoint(&["imaging", &segment]) {
            Ok(url) => url,
            Err(e) => return SubmitOutcome::from_error(e),
        };
        let payload = FingerprintPayload::from(prints);

        self.submit("capture_fingerprint", self.http_client.post(url).json(&payload))
            .await
    }

    async fn save_data(&self, form: &SaveDataForm) -> SubmitOutcome {
        let url = match self.endpoint(&["imaging", "savedata"]) {
            Ok(url) => url,
            Err(e) => return SubmitOutcome::from_error(e),
        };
        let multipart = form
            .fields()
            .into_iter()
            .fold(Form::new(), |acc, (name, value)| acc.text(name, value));

        // savedata answers with free text; reaching a 2xx is the acknowledgment
        let outcome = match self.send(self.http_client.post(url).multipart(multipart)).await {
            Ok(response) => match self.read_text(response).await {
                Ok(body) => {
                    let body = body.trim();
                    SubmitOutcome::ok((!body.is_empty()).then(|| body.to_string()))
                }
                Err(e) => SubmitOutcome::from_error(e),
            },
            Err(e) => SubmitOutcome::from_error(e),
        };
        log_submit("savedata", &outcome);
        outcome
    }

    async fn search_images(&self, relation_no: &str) -> LookupOutcome<ImageBundle> {
        let segment = format!("get_temp_image-{}", relation_no);
        let outcome: LookupOutcome<ImageBundle> = self
            .lookup("get_temp_image", self.endpoint(&["imaging", &segment]))
            .await;

        let empty = outcome
            .data
            .as_ref()
            .map(ImageBundle::is_empty)
            .unwrap_or(false);
        if empty {
            return LookupOutcome::not_found(format!("No images found for {}", relation_no));
        }
        outcome
    }

    async fn approve_image(&self, request: &ApprovalRequest) -> LookupOutcome<Value> {
        let segment = request.path_segment("approve_image");
        self.decide(
            "approve_image",
            self.endpoint(&["imaging", "api", &segment]),
            None,
            "Image approved",
        )
        .await
    }

    async fn reject_image(&self, request: &ApprovalRequest, reason: &str) -> LookupOutcome<Value> {
        let segment = request.path_segment("reject_image");
        let form = Form::new().text("reason", reason.to_string());
        self.decide(
            "reject_image",
            self.endpoint(&["imaging", "api", &segment]),
            Some(form),
            "Image rejected",
        )
        .await
    }

    async fn fetch_enquiry(&self, customer_id: &str) -> LookupOutcome<EnquiryBundle> {
        let segment = format!("enquiry-{}", customer_id);
        self.lookup("enquiry", self.endpoint(&["imaging", "api", &segment]))
            .await
    }

    async fn fetch_relation_details(&self, encrypted_id: &str) -> LookupOutcome<EnquiryBundle> {
        let segment = format!("view_relation_details-{}", encrypted_id);
        self.lookup("view_relation_details", self.endpoint(&["imaging", &segment]))
            .await
    }

    async fn fetch_activities(&self) -> Result<ActivityConfig, ApiError> {
        let url = self.endpoint(&["imaging", "api", "activities"])?;
        let response = self.send(self.http_client.get(url)).await?;
        let body = self.read_text(response).await?;
        let wire: ActivityWire =
            serde_json::from_str(&body).map_err(|e| ApiError::format(e.to_string()))?;

        let config = ActivityConfig::from(wire);
        debug!(?config, "Fetched activity configuration");
        Ok(config)
    }

    async fn save_activities(&self, config: &ActivityConfig) -> SubmitOutcome {
        let url = match self.endpoint(&["imaging", "api", "activities"]) {
            Ok(url) => url,
            Err(e) => return SubmitOutcome::from_error(e),
        };
        self.submit(
            "save_activities",
            self.http_client.post(url).json(&config.to_wire()),
        )
        .await
    }
}
