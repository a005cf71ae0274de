use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pii_redact::{router, UploadPolicy};
use redact_core::detect::{DetectError, PatternDetector, PiiDetector};
use redact_core::model::{Word, WordIndex};
use redact_core::ocr::{OcrEngine, OcrError, OcrOutput};
use redact_core::Pipeline;
use tower::ServiceExt;

const BOUNDARY: &str = "X-PII-REDACT-BOUNDARY";

struct FakeOcr {
    fail: bool,
}

impl OcrEngine for FakeOcr {
    fn extract_text(&self, _image: &[u8]) -> Result<OcrOutput, OcrError> {
        if self.fail {
            return Err(OcrError::Engine("document service unavailable".to_string()));
        }
        let words: WordIndex = [
            ("SSN:", [10.0, 10.0, 50.0, 10.0, 50.0, 30.0, 10.0, 30.0]),
            ("123-45-6789", [60.0, 10.0, 160.0, 10.0, 160.0, 30.0, 60.0, 30.0]),
        ]
        .into_iter()
        .map(|(text, coords)| Word::from_coords(text, coords.to_vec(), 0.99))
        .collect::<Result<_, _>>()?;

        Ok(OcrOutput {
            text: "SSN: 123-45-6789".to_string(),
            words,
        })
    }

    fn name(&self) -> &'static str {
        "fake-ocr"
    }
}

struct CountingDetector {
    inner: PatternDetector,
    calls: Arc<AtomicUsize>,
}

impl PiiDetector for CountingDetector {
    fn detect_pii(&self, text: &str) -> Result<Vec<String>, DetectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.detect_pii(text)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

fn app_with(fail_ocr: bool, policy: UploadPolicy) -> (Router, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let detector = CountingDetector {
        inner: PatternDetector::default(),
        calls: calls.clone(),
    };
    let pipeline = Pipeline::new(Box::new(FakeOcr { fail: fail_ocr }), Box::new(detector));
    (router(Arc::new(pipeline), policy), calls)
}

fn app() -> (Router, Arc<AtomicUsize>) {
    app_with(false, UploadPolicy::default())
}

fn white_png() -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 50, Rgb([255, 255, 255])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    match filename {
        Some(filename) => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n").as_bytes(),
        ),
        None => body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{field}\"\r\n").as_bytes()),
    }
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/redact-pii")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"status": "healthy", "service": "PII Redaction API"})
    );
}

#[tokio::test]
async fn test_redacts_ssn() {
    let (app, calls) = app();
    let response = app
        .oneshot(upload(multipart_body("file", Some("intake form.jpg"), &white_png())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"intake_form.png\""
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let img = image::load_from_memory(&bytes).unwrap().to_rgb8();
    assert_eq!(*img.get_pixel(100, 20), Rgb([0, 0, 0]));
    assert_eq!(*img.get_pixel(20, 20), Rgb([255, 255, 255]));
}

#[tokio::test]
async fn test_missing_file_field() {
    let (app, calls) = app();
    let response = app
        .oneshot(upload(multipart_body("document", Some("form.png"), b"data")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file part in the request");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_not_multipart() {
    let (app, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/redact-pii")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file part in the request");
}

#[tokio::test]
async fn test_no_file_selected() {
    let (app, _) = app();
    let response = app
        .oneshot(upload(multipart_body("file", Some(""), b"data")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file selected");
}

#[tokio::test]
async fn test_plain_form_field_named_file() {
    let (app, _) = app();
    let response = app
        .oneshot(upload(multipart_body("file", None, b"data")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file selected");
}

#[tokio::test]
async fn test_disallowed_extension() {
    let (app, _) = app();
    let response = app
        .oneshot(upload(multipart_body("file", Some("scan.pdf"), b"%PDF-1.7")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "File type not allowed. Allowed types: png, jpg, jpeg, bmp, gif, tiff"
    );
}

#[tokio::test]
async fn test_empty_file() {
    let (app, calls) = app();
    let response = app
        .oneshot(upload(multipart_body("file", Some("blank.png"), b"")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Empty file");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_file_too_large() {
    let policy = UploadPolicy {
        max_upload_mb: 1,
        ..UploadPolicy::default()
    };
    let (app, calls) = app_with(false, policy);
    let oversized = vec![0u8; 1024 * 1024 + 512 * 1024];
    let response = app
        .oneshot(upload(multipart_body("file", Some("huge.png"), &oversized)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(response).await["error"], "File too large. Maximum file size is 1MB.");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_extraction_failure_is_500() {
    let (app, calls) = app_with(true, UploadPolicy::default());
    let response = app
        .oneshot(upload(multipart_body("file", Some("form.png"), &white_png())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "ExtractionError");
    assert!(body["error"].as_str().unwrap().contains("document service unavailable"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_undecodable_upload_is_render_error() {
    let (app, _) = app();
    let response = app
        .oneshot(upload(multipart_body("file", Some("form.png"), b"not really a png")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["kind"], "RenderError");
}
