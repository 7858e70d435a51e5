use super::*;
use crate::activity::ActivityConfig;
use crate::config::{BackendConfig, FingerprintDeviceConfig};
use crate::error::ApiError;
use crate::image::DataUrl;
use crate::session::{DocumentSide, DocumentType, Fingerprints, IdentificationDocument, Thumb};
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client_for(server: &MockServer) -> ImagingClient {
    ImagingClient::new(&BackendConfig {
        base_url: server.uri(),
        user_agent: "biocapture-tests".to_string(),
        timeout_seconds: Some(5),
    })
    .unwrap()
}

fn approval() -> ApprovalRequest {
    ApprovalRequest {
        relation_no: "R1".to_string(),
        batch: "B1".to_string(),
        cust_no: "C1".to_string(),
        actor: "jdoe".to_string(),
        hostname: "teller01".to_string(),
        terminal_ip: "10.0.0.5".to_string(),
    }
}

#[tokio::test]
async fn test_capture_browse_sends_raw_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/imaging/capture_browse"))
        .and(body_string_contains("AAAA"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .expect(1)
        .mount(&server)
        .await;

    let image = DataUrl::parse("data:image/png;base64,AAAA").unwrap();
    let outcome = client_for(&server)
        .capture_browse("REL7", ImageKind::Photo, &image)
        .await;
    assert!(outcome.success);

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(!body.contains("data:image"));
    assert!(body.contains("name=\"cus_no\""));
    assert!(body.contains("REL7"));
    assert!(body.contains("name=\"a\""));

    // Re-prefixing the transmitted payload restores the original
    assert_eq!(
        DataUrl::from_payload("AAAA", "image/png").as_str(),
        image.as_str()
    );
}

#[tokio::test]
async fn test_identification_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/imaging/capture_id_details-REL7"))
        .and(body_json(serde_json::json!({
            "documents": [
                {"type": "passport", "sides": {"front": "FRONT"}}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut doc = IdentificationDocument::new(DocumentType::Passport);
    doc.set_side(DocumentSide::Front, Some(DataUrl::from_payload("FRONT", "image/jpeg")));

    let outcome = client_for(&server).submit_identification("REL7", &[doc]).await;
    assert!(outcome.success);
}

#[tokio::test]
async fn test_fingerprint_rejection_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/imaging/capture_fingerprint-REL7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"success": false, "message": "poor quality"})),
        )
        .mount(&server)
        .await;

    let prints = Fingerprints {
        thumbprint1: Some(DataUrl::from_payload("T1", "image/bmp")),
        thumbprint2: None,
    };
    let outcome = client_for(&server).submit_fingerprints("REL7", &prints).await;
    assert!(!outcome.success);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.message.as_deref(), Some("poor quality"));
}

#[tokio::test]
async fn test_save_data_accepts_any_2xx_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/imaging/savedata"))
        .and(body_string_contains("AMEND"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Record REL7 saved"))
        .mount(&server)
        .await;

    let form = SaveDataForm {
        pix: "PIX".to_string(),
        sigchange: "SIG".to_string(),
        relationid: "REL7".to_string(),
        batchno: "B1".to_string(),
        action: crate::session::EnrollmentMode::Amend,
    };
    let outcome = client_for(&server).save_data(&form).await;
    assert!(outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("Record REL7 saved"));
}

#[tokio::test]
async fn test_approve_one_and_code_zero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/imaging/api/approve_image-R1-B1-C1-jdoe-teller01-10.0.0.5"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/imaging/api/approve_image-R1-B1-C1-jdoe-teller01-10.0.0.5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"code":0}"#))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let first = client.approve_image(&approval()).await;
    let second = client.approve_image(&approval()).await;

    assert_eq!(first.status, LookupStatus::Success);
    assert_eq!(first.message, "Image approved");
    assert_eq!(second.status, LookupStatus::Success);
}

#[tokio::test]
async fn test_reject_sends_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/imaging/api/reject_image-R1-B1-C1-jdoe-teller01-10.0.0.5"))
        .and(body_string_contains("blurry photo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("success"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .reject_image(&approval(), "blurry photo")
        .await;
    assert!(outcome.is_success());
    assert_eq!(outcome.message, "Image rejected");
}

#[tokio::test]
async fn test_server_error_is_protocol() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let image = DataUrl::from_payload("AAAA", "image/png");
    let outcome = client_for(&server)
        .capture_browse("REL7", ImageKind::Signature, &image)
        .await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.error,
        Some(ApiError::Protocol {
            status: 500,
            body: "internal error".to_string()
        })
    );
}

#[tokio::test]
async fn test_unparseable_submit_is_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let prints = Fingerprints {
        thumbprint1: Some(DataUrl::from_payload("T1", "image/bmp")),
        thumbprint2: None,
    };
    let outcome = client_for(&server).submit_fingerprints("REL7", &prints).await;
    assert!(matches!(outcome.error, Some(ApiError::Format { .. })));
}

#[tokio::test]
async fn test_unreachable_backend_is_network() {
    let client = ImagingClient::new(&BackendConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        user_agent: "biocapture-tests".to_string(),
        timeout_seconds: Some(2),
    })
    .unwrap();

    let outcome = client.fetch_enquiry("C1").await;
    assert_eq!(outcome.status, LookupStatus::Error);
    assert!(matches!(outcome.error, Some(ApiError::Network { .. })));

    assert!(matches!(
        client.fetch_activities().await,
        Err(ApiError::Network { .. })
    ));
}

#[tokio::test]
async fn test_search_not_found_and_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/imaging/get_temp_image-MISSING"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/imaging/get_temp_image-EMPTY"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"approved": [], "unapproved": []})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/imaging/get_temp_image-REL7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "approved": {"photo": "AAAA", "signature": "BBBB", "batch": "B1"},
            "unapproved": []
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(
        client.search_images("MISSING").await.status,
        LookupStatus::NotFound
    );
    assert_eq!(
        client.search_images("EMPTY").await.status,
        LookupStatus::NotFound
    );

    let found = client.search_images("REL7").await;
    assert!(found.is_success());
    let bundle = found.data.unwrap();
    assert_eq!(bundle.approved.signature(), Some("BBBB"));
    assert!(bundle.unapproved.is_empty());
}

#[tokio::test]
async fn test_php_empty_array_lookups_are_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/imaging/get_temp_image-PHP"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Array\n(\n)\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/imaging/api/enquiry-C9"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let search = client.search_images("PHP").await;
    assert_eq!(search.status, LookupStatus::NotFound);
    assert!(search.error.is_none());

    let enquiry = client.fetch_enquiry("C9").await;
    assert_eq!(enquiry.status, LookupStatus::NotFound);
    assert!(enquiry.data.is_none());
}

#[tokio::test]
async fn test_enquiry_and_relation_details() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/imaging/api/enquiry-C1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "Ama Mensah"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/imaging/view_relation_details-xYz9"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let enquiry = client.fetch_enquiry("C1").await;
    assert!(enquiry.is_success());
    assert_eq!(
        enquiry.data.unwrap().field("name"),
        Some(&serde_json::json!("Ama Mensah"))
    );

    let details = client.fetch_relation_details("xYz9").await;
    assert!(matches!(details.error, Some(ApiError::Format { .. })));
}

#[tokio::test]
async fn test_activities_fetch_and_save() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/imaging/api/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "image": {"id": 1, "status": "1"},
            "identification": {"id": 2, "status": 0},
            "fingerprint": {"id": 3, "status": true}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/imaging/api/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let config = client.fetch_activities().await.unwrap();
    assert_eq!(
        config,
        ActivityConfig {
            image: true,
            identification: false,
            fingerprint: true,
        }
    );

    assert!(client.save_activities(&config).await.success);
}

#[tokio::test]
async fn test_fingerprint_device_capture() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/init"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/capture"))
        .and(body_string_contains("thumbprint=2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"success": true, "image": "Qk0="})),
        )
        .mount(&server)
        .await;

    let device = FingerprintDevice::new(&FingerprintDeviceConfig {
        base_url: server.uri(),
        capture_timeout_seconds: 5,
    })
    .unwrap();

    device.init().await.unwrap();
    let image = device.capture(Thumb::Second).await.unwrap();
    assert_eq!(image.payload(), "Qk0=");
    assert_eq!(image.mime_type(), Some("image/bmp"));
}
