//! Integration tests for `CloudinaryClient` using wiremock HTTP mocks.

use lookstyle_core::ImageStoreConfig;
use lookstyle_images::{
    CloudinaryClient, DeleteOutcome, ImageStore, ImageStoreError, ImageUpload,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const JPEG_MAGIC: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

/// Matches when the raw request body contains `needle`. Multipart bodies
/// carry binary file parts, so they cannot be matched as strings.
struct BodyBytesContain(Vec<u8>);

impl Match for BodyBytesContain {
    fn matches(&self, request: &Request) -> bool {
        request
            .body
            .windows(self.0.len())
            .any(|window| window == self.0.as_slice())
    }
}

/// A text part of a `multipart/form-data` body with the given value.
fn form_field(name: &str, value: &str) -> BodyBytesContain {
    BodyBytesContain(format!("name=\"{name}\"\r\n\r\n{value}\r\n").into_bytes())
}

fn test_client(base_url: &str, max_retries: u32) -> CloudinaryClient {
    let config = ImageStoreConfig {
        base_url: base_url.to_owned(),
        cloud_name: "demo".to_owned(),
        api_key: "test-key".to_owned(),
        api_secret: "test-secret".to_owned(),
        folder: "lookstyle".to_owned(),
        request_timeout_secs: 5,
        max_retries,
        retry_backoff_ms: 0,
    };
    CloudinaryClient::new(&config).expect("client construction should not fail")
}

fn jpeg(name: &str) -> ImageUpload {
    ImageUpload::new(name, Some("image/jpeg".to_owned()), JPEG_MAGIC.to_vec())
}

#[tokio::test]
async fn upload_returns_url_and_asset_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/upload"))
        .and(form_field("api_key", "test-key"))
        .and(form_field("signature_algorithm", "sha256"))
        .and(form_field("folder", "lookstyle"))
        .and(BodyBytesContain(b"filename=\"front.jpg\"".to_vec()))
        .and(BodyBytesContain(JPEG_MAGIC.to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "public_id": "lookstyle/abc123",
            "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/lookstyle/abc123.jpg",
            "format": "jpg",
            "bytes": 4
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let stored = client
        .upload(jpeg("front.jpg"), "lookstyle")
        .await
        .expect("upload should succeed");

    assert_eq!(stored.asset_id, "lookstyle/abc123");
    assert_eq!(
        stored.url,
        "https://res.cloudinary.com/demo/image/upload/v1/lookstyle/abc123.jpg"
    );
}

#[tokio::test]
async fn upload_retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/upload"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "public_id": "lookstyle/retry",
            "secure_url": "https://cdn.example/lookstyle/retry.jpg"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let stored = client
        .upload(jpeg("back.jpg"), "lookstyle")
        .await
        .expect("upload should succeed after retry");
    assert_eq!(stored.asset_id, "lookstyle/retry");
}

#[tokio::test]
async fn upload_does_not_retry_client_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/upload"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({"error": {"message": "Invalid Signature"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 3);
    let err = client
        .upload(jpeg("front.jpg"), "lookstyle")
        .await
        .expect_err("401 should fail");

    match err {
        ImageStoreError::UnexpectedStatus { status, body, .. } => {
            assert_eq!(status, 401);
            assert!(body.contains("Invalid Signature"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn upload_with_malformed_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let err = client
        .upload(jpeg("front.jpg"), "lookstyle")
        .await
        .expect_err("html body should fail");
    assert!(matches!(err, ImageStoreError::Deserialize { .. }), "got {err:?}");
}

#[tokio::test]
async fn destroy_ok_is_deleted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/destroy"))
        .and(body_string_contains("public_id=lookstyle%2Fabc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let outcome = client.delete("lookstyle/abc123").await.expect("destroy");
    assert_eq!(outcome, DeleteOutcome::Deleted);
}

#[tokio::test]
async fn destroy_not_found_is_ignored() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/destroy"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": "not found"})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let outcome = client.delete("lookstyle/gone").await.expect("destroy");
    assert_eq!(outcome, DeleteOutcome::NotFoundIgnored);
}

#[tokio::test]
async fn destroy_http_404_is_ignored() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/destroy"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"result": "not found"})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let outcome = client.delete("lookstyle/gone").await.expect("destroy");
    assert_eq!(outcome, DeleteOutcome::NotFoundIgnored);
}

#[tokio::test]
async fn destroy_unknown_result_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/destroy"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": "error"})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let err = client.delete("lookstyle/abc").await.expect_err("should fail");
    assert!(
        matches!(err, ImageStoreError::Rejected { ref detail, .. } if detail == "error"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn destroy_gives_up_after_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/destroy"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let err = client.delete("lookstyle/abc").await.expect_err("should fail");
    assert!(
        matches!(err, ImageStoreError::UnexpectedStatus { status: 500, .. }),
        "got {err:?}"
    );
}
