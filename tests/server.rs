//! HTTP tests: the router is driven in-process with `tower::ServiceExt::oneshot`.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use edgequake_extract::server::router;
use edgequake_extract::{
    Config, ExtractError, Extractor, PromptTemplate, Provider, ProviderId, ProviderRegistry,
    ProviderRequest, ProviderSettings,
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const BOUNDARY: &str = "----extract-test-boundary";

struct Canned {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Provider for Canned {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    fn supports_native_pdf(&self) -> bool {
        true
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<String, ExtractError> {
        self.prompts.lock().unwrap().push(request.prompt().to_string());
        self.reply
            .clone()
            .map_err(|msg| ExtractError::provider("gemini", msg))
    }
}

fn app(reply: Result<&str, &str>) -> (Router, Arc<Canned>) {
    let config = Config::builder()
        .provider(ProviderId::Gemini, ProviderSettings::new("unused"))
        .prompt(
            "ocr",
            PromptTemplate {
                name: "OCR to CSV".into(),
                provider: "gemini".into(),
                file_ext: "csv".into(),
                prompt: "Template prompt".into(),
            },
        )
        .prompt(
            "summary",
            PromptTemplate {
                name: "Website summary".into(),
                provider: "gemini".into(),
                file_ext: "md".into(),
                prompt: "Summarise the page".into(),
            },
        )
        .default_prompt("OCR to CSV")
        .build()
        .unwrap();

    let provider = Arc::new(Canned {
        reply: reply.map(str::to_string).map_err(str::to_string),
        prompts: Mutex::new(Vec::new()),
    });
    let mut registry = ProviderRegistry::new(ProviderId::Gemini);
    registry.register(provider.clone());

    let extractor = Extractor::from_parts(config, registry, None, None);
    (router(Arc::new(extractor)), provider)
}

fn multipart_body(file: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn ocr_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn error_message(response: axum::response::Response) -> String {
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    json["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_at_root_and_api() {
    for uri in ["/health", "/api/health"] {
        let (app, _) = app(Ok("unused"));
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert_eq!(body_string(response).await, r#"{"status":"healthy"}"#);
    }
}

#[tokio::test]
async fn ocr_upload_returns_attachment() {
    let (app, provider) = app(Ok("```csv\nItem^^Price\nWidget, large^^1,000\n```"));
    let body = multipart_body(
        Some(("notes.txt", b"widget list")),
        &[("prompt_text", "List the items"), ("file_ext", "csv")],
    );

    let response = app.oneshot(ocr_request("/api/ocr", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"notes.csv\""
    );
    assert_eq!(body_string(response).await, "Item,Price\nWidget large,1000");
    assert_eq!(
        provider.prompts.lock().unwrap().as_slice(),
        ["List the items\n\nDocument content:\nwidget list"]
    );
}

#[tokio::test]
async fn template_fills_missing_fields() {
    let (app, provider) = app(Ok("done"));
    let body = multipart_body(Some(("scan.pdf", b"%PDF-1.4")), &[("prompt", "OCR to CSV")]);

    let response = app.oneshot(ocr_request("/ocr", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"scan.csv\""
    );
    assert_eq!(provider.prompts.lock().unwrap()[0], "Template prompt");
}

#[tokio::test]
async fn missing_file_is_a_bad_request() {
    let (app, provider) = app(Ok("unused"));
    let body = multipart_body(None, &[("prompt_text", "anything")]);

    let response = app.oneshot(ocr_request("/ocr", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(response).await.contains("file"));
    assert!(provider.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_template_is_a_bad_request() {
    let (app, _) = app(Ok("unused"));
    let body = multipart_body(Some(("a.txt", b"x")), &[("prompt", "nope")]);

    let response = app.oneshot(ocr_request("/ocr", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(response).await.contains("nope"));
}

#[tokio::test]
async fn url_template_is_rejected_for_uploads() {
    let (app, provider) = app(Ok("unused"));
    let body = multipart_body(Some(("a.txt", b"x")), &[("prompt", "summary")]);

    let response = app.oneshot(ocr_request("/ocr", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(response).await.contains("/summary"));
    assert!(provider.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn default_template_applies_without_prompt() {
    let (app, provider) = app(Ok("ok"));
    let body = multipart_body(Some(("a.txt", b"x")), &[]);

    let response = app.oneshot(ocr_request("/ocr", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"a.csv\""
    );
    assert_eq!(
        provider.prompts.lock().unwrap()[0],
        "Template prompt\n\nDocument content:\nx"
    );
}

#[tokio::test]
async fn provider_failure_is_a_server_error() {
    let (app, _) = app(Err("HTTP 429 Too Many Requests: slow down"));
    let body = multipart_body(Some(("a.txt", b"x")), &[("prompt_text", "p")]);

    let response = app.oneshot(ocr_request("/ocr", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let msg = error_message(response).await;
    assert!(msg.contains("429"), "got: {msg}");
}

#[tokio::test]
async fn summary_without_url_is_a_bad_request() {
    let (app, _) = app(Ok("unused"));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/summary")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("prompt_text=Summarise"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(response).await.contains("url"));
}

#[tokio::test]
async fn summary_without_scraper_is_a_server_error() {
    let (app, provider) = app(Ok("unused"));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/summary")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("url=example.com&prompt_text=Summarise"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(provider.prompts.lock().unwrap().is_empty());
}
