//! Integration tests for the analysis pipeline.
//!
//! No network access is needed: inference goes either to a stub
//! [`InferenceClient`] that records prompts and counts calls, or to a local
//! `mockito` server standing in for the Hugging Face endpoint. Documents are
//! synthesised in memory with docx-rs and lopdf.

use async_trait::async_trait;
use cv_bid_analyser::{
    analyze, analyze_files, analyze_sync, analyze_to_file, present, AnalyserError, AnalysisConfig,
    AnalysisProgressCallback, ApiToken, DocumentRole, HuggingFaceClient, InferenceClient,
    InferenceResponse, ModelPreset, PromptTemplate, Severity, Stage, UploadedDocument,
};
use docx_rs::{Docx, Paragraph, Run};
use mockito::Matcher;
use serde_json::json;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Inference stub: replies with a canned body, decoded like a real response.
struct StubClient {
    body: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubClient {
    fn new(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: body.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl InferenceClient for StubClient {
    async fn generate(&self, prompt: String) -> Result<String, AnalyserError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt);
        InferenceResponse::decode(&self.body).into_text()
    }

    fn model_name(&self) -> String {
        "stub".to_string()
    }
}

/// Records every progress event in order.
#[derive(Default)]
struct EventLog {
    stages: Mutex<Vec<Stage>>,
    extracted: Mutex<Vec<(DocumentRole, String, usize)>>,
    completed: Mutex<Vec<bool>>,
}

impl AnalysisProgressCallback for EventLog {
    fn on_stage(&self, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_document_extracted(&self, role: DocumentRole, filename: &str, chars: usize) {
        self.extracted
            .lock()
            .unwrap()
            .push((role, filename.to_string(), chars));
    }

    fn on_analysis_complete(&self, success: bool) {
        self.completed.lock().unwrap().push(success);
    }
}

fn docx_with_lines(lines: &[&str]) -> Vec<u8> {
    let mut docx = Docx::new();
    for line in lines {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*line)));
    }
    let mut buf = Cursor::new(Vec::new());
    docx.build().pack(&mut buf).expect("pack docx");
    buf.into_inner()
}

fn docx_upload(filename: &str, lines: &[&str]) -> UploadedDocument {
    UploadedDocument::new(docx_with_lines(lines), filename)
}

/// A one-page PDF showing `text` in a standard Type1 font.
fn pdf_with_text(text: &str) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save pdf");
    buf
}

fn config_with(client: Arc<StubClient>, log: Option<Arc<EventLog>>) -> AnalysisConfig {
    let mut builder = AnalysisConfig::builder().client(client as Arc<dyn InferenceClient>);
    if let Some(log) = log {
        builder = builder.progress_callback(log as Arc<dyn AnalysisProgressCallback>);
    }
    builder.build().unwrap()
}

// ── End to end with a stub client ────────────────────────────────────────────

#[tokio::test]
async fn test_python_backend_match() {
    let client = StubClient::new(r#"[{"generated_text": "Match: 80%"}]"#);
    let config = config_with(client.clone(), None);

    let cv = docx_upload("cv.docx", &["Python, 5 years backend"]);
    let bid = docx_upload("job.docx", &["Looking for Python backend engineer, 3+ years"]);

    let result = analyze(Some(cv), Some(bid), &config).await;
    let notice = present(&result);

    assert_eq!(notice.severity, Severity::Success);
    assert!(notice.body.contains("Match: 80%"), "body: {:?}", notice.body);
    assert_eq!(client.calls(), 1);

    // Job description comes before the CV in the prompt.
    let prompt = client.last_prompt();
    let job_at = prompt
        .find("Looking for Python backend engineer, 3+ years")
        .expect("job text in prompt");
    let cv_at = prompt.find("Python, 5 years backend").expect("cv text in prompt");
    assert!(job_at < cv_at);

    let output = result.unwrap();
    assert_eq!(output.model, "stub");
    assert_eq!(output.raw_response, "Match: 80%");
    assert_eq!(output.analysis, "Match: 80%\n");
    assert_eq!(output.stats.prompt_chars, prompt.chars().count());
}

#[tokio::test]
async fn test_pdf_cv_against_docx_bid() {
    let client = StubClient::new(r#"{"generated_text": "Match: 65%"}"#);
    let config = config_with(client.clone(), None);

    let cv = UploadedDocument::new(pdf_with_text("Rust and Go, 7 years"), "cv.pdf");
    let bid = docx_upload("bid.docx", &["Systems engineer wanted"]);

    let output = analyze(Some(cv), Some(bid), &config).await.unwrap();
    assert_eq!(output.analysis, "Match: 65%\n");
    assert!(client.last_prompt().contains("Rust and Go, 7 years"));
}

#[tokio::test]
async fn test_long_documents_are_truncated() {
    let client = StubClient::new(r#"[{"generated_text": "ok"}]"#);
    let config = AnalysisConfig::builder()
        .client(client.clone() as Arc<dyn InferenceClient>)
        .truncation_limit(100)
        .build()
        .unwrap();

    let long_cv = "c".repeat(5000);
    let long_bid = "b".repeat(5000);
    let cv = docx_upload("cv.docx", &[&long_cv]);
    let bid = docx_upload("bid.docx", &[&long_bid]);

    let output = analyze(Some(cv), Some(bid), &config).await.unwrap();
    assert!(output.stats.truncated());

    let prompt = client.last_prompt();
    assert!(prompt.contains(&"b".repeat(100)));
    assert!(!prompt.contains(&"b".repeat(101)));
    assert!(prompt.contains(&"c".repeat(100)));
    assert!(!prompt.contains(&"c".repeat(101)));
}

#[tokio::test]
async fn test_custom_template_is_used() {
    let client = StubClient::new(r#"[{"generated_text": "fine"}]"#);
    let config = AnalysisConfig::builder()
        .client(client.clone() as Arc<dyn InferenceClient>)
        .template(PromptTemplate::Custom("JOB={bid}\nCV={cv}".into()))
        .build()
        .unwrap();

    let cv = docx_upload("cv.docx", &["Alice"]);
    let bid = docx_upload("bid.docx", &["Builder"]);
    analyze(Some(cv), Some(bid), &config).await.unwrap();

    assert_eq!(client.last_prompt(), "JOB=Builder\nCV=Alice");
}

// ── Validation: nothing runs without both documents ──────────────────────────

#[tokio::test]
async fn test_missing_upload_skips_extraction() {
    let client = StubClient::new(r#"[{"generated_text": "unused"}]"#);
    let log = Arc::new(EventLog::default());
    let config = config_with(client.clone(), Some(log.clone()));

    let bid = docx_upload("bid.docx", &["Looking for a welder"]);
    let result = analyze(None, Some(bid), &config).await;

    match result {
        Err(AnalyserError::MissingUpload { ref missing }) => {
            assert_eq!(missing, &vec![DocumentRole::Candidate])
        }
        ref other => panic!("expected MissingUpload, got {other:?}"),
    }
    assert_eq!(present(&result).severity, Severity::Warning);
    assert_eq!(*log.stages.lock().unwrap(), vec![Stage::Validating]);
    assert!(log.extracted.lock().unwrap().is_empty());
    assert_eq!(*log.completed.lock().unwrap(), vec![false]);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_missing_path_is_not_read() {
    let client = StubClient::new(r#"[{"generated_text": "unused"}]"#);
    let config = config_with(client.clone(), None);

    // The CV path does not exist; a missing bid must be reported first.
    let result = analyze_files(Some("/no/such/cv.pdf"), None, &config).await;
    match result {
        Err(AnalyserError::MissingUpload { missing }) => {
            assert_eq!(missing, vec![DocumentRole::Comparison])
        }
        other => panic!("expected MissingUpload, got {other:?}"),
    }
}

// ── Empty text never reaches the model ───────────────────────────────────────

#[tokio::test]
async fn test_blank_document_makes_no_request() {
    let client = StubClient::new(r#"[{"generated_text": "unused"}]"#);
    let config = config_with(client.clone(), None);

    let cv = docx_upload("cv.docx", &["   ", "\t"]);
    let bid = docx_upload("bid.docx", &["Real job text"]);
    let result = analyze(Some(cv), Some(bid), &config).await;

    match result {
        Err(AnalyserError::EmptyInput { ref empty }) => {
            assert_eq!(empty, &vec![DocumentRole::Candidate])
        }
        ref other => panic!("expected EmptyInput, got {other:?}"),
    }
    let notice = present(&result);
    assert_eq!(notice.severity, Severity::Error);
    assert_eq!(notice.headline, "One or both documents appear to be empty.");
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_unsupported_suffix_counts_as_empty() {
    let client = StubClient::new(r#"[{"generated_text": "unused"}]"#);
    let config = config_with(client.clone(), None);

    let cv = UploadedDocument::new(b"Python developer".to_vec(), "cv.txt");
    let bid = UploadedDocument::new(b"Python job".to_vec(), "job.rtf");
    let result = analyze(Some(cv), Some(bid), &config).await;

    match result {
        Err(AnalyserError::EmptyInput { empty }) => assert_eq!(empty.len(), 2),
        other => panic!("expected EmptyInput, got {other:?}"),
    }
    assert_eq!(client.calls(), 0);
}

// ── Extraction and decode failures ───────────────────────────────────────────

#[tokio::test]
async fn test_corrupt_document_names_its_role() {
    let client = StubClient::new(r#"[{"generated_text": "unused"}]"#);
    let config = config_with(client.clone(), None);

    let cv = docx_upload("cv.docx", &["Python"]);
    let bid = UploadedDocument::new(b"garbage bytes".to_vec(), "tender.pdf");
    let result = analyze(Some(cv), Some(bid), &config).await;

    match result {
        Err(AnalyserError::Extraction {
            role, ref filename, ..
        }) => {
            assert_eq!(role, DocumentRole::Comparison);
            assert_eq!(filename, "tender.pdf");
        }
        ref other => panic!("expected Extraction, got {other:?}"),
    }
    assert!(present(&result).headline.contains("tender.pdf"));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_malformed_response_is_decode_error() {
    let client = StubClient::new("Service Unavailable");
    let config = config_with(client.clone(), None);

    let cv = docx_upload("cv.docx", &["Python"]);
    let bid = docx_upload("bid.docx", &["Python job"]);
    let result = analyze(Some(cv), Some(bid), &config).await;

    assert!(matches!(result, Err(AnalyserError::Decode { .. })));
    assert_eq!(
        present(&result).headline,
        "Error decoding model response. Please check Hugging Face token or try another model."
    );
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_blank_answer_is_not_a_success() {
    let client = StubClient::new(r#"[{"generated_text": "  \n"}]"#);
    let config = config_with(client.clone(), None);

    let cv = docx_upload("cv.docx", &["Python"]);
    let bid = docx_upload("bid.docx", &["Python job"]);
    let result = analyze(Some(cv), Some(bid), &config).await;

    match result {
        Err(AnalyserError::Decode { ref detail }) => assert!(detail.contains("empty"), "{detail}"),
        ref other => panic!("expected Decode, got {other:?}"),
    }
    assert_eq!(present(&result).severity, Severity::Error);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_prompt_echo_alone_is_not_a_success() {
    struct EchoClient;

    #[async_trait]
    impl InferenceClient for EchoClient {
        async fn generate(&self, prompt: String) -> Result<String, AnalyserError> {
            Ok(prompt)
        }
    }

    let config = AnalysisConfig::builder()
        .client(Arc::new(EchoClient))
        .build()
        .unwrap();

    let cv = docx_upload("cv.docx", &["Python"]);
    let bid = docx_upload("bid.docx", &["Python job"]);
    let result = analyze(Some(cv), Some(bid), &config).await;

    assert!(matches!(result, Err(AnalyserError::Decode { .. })), "{result:?}");
    assert_ne!(present(&result).severity, Severity::Success);
}

// ── Progress events ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stages_reported_in_order() {
    let client = StubClient::new(r#"[{"generated_text": "Match: 50%"}]"#);
    let log = Arc::new(EventLog::default());
    let config = config_with(client, Some(log.clone()));

    let cv = docx_upload("cv.docx", &["Nurse, 10 years"]);
    let bid = docx_upload("bid.docx", &["Ward manager"]);
    analyze(Some(cv), Some(bid), &config).await.unwrap();

    assert_eq!(
        *log.stages.lock().unwrap(),
        vec![
            Stage::Validating,
            Stage::Extracting,
            Stage::PromptReady,
            Stage::Requesting
        ]
    );
    let extracted = log.extracted.lock().unwrap();
    assert_eq!(extracted.len(), 2);
    assert_eq!(extracted[0].0, DocumentRole::Candidate);
    assert_eq!(extracted[0].1, "cv.docx");
    assert_eq!(extracted[0].2, "Nurse, 10 years".len());
    assert_eq!(extracted[1].0, DocumentRole::Comparison);
    assert_eq!(*log.completed.lock().unwrap(), vec![true]);
}

// ── Files on disk ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_analyze_to_file_writes_answer() {
    let dir = tempfile::tempdir().unwrap();
    let cv_path = dir.path().join("cv.docx");
    let bid_path = dir.path().join("bid.docx");
    std::fs::write(&cv_path, docx_with_lines(&["Chef, 4 years"])).unwrap();
    std::fs::write(&bid_path, docx_with_lines(&["Head chef wanted"])).unwrap();
    let out_path = dir.path().join("reports").join("analysis.md");

    let client = StubClient::new(r#"[{"generated_text": "```markdown\n## Match\n70%\n```"}]"#);
    let config = config_with(client, None);

    let output = analyze_to_file(
        Some(cv_path.to_str().unwrap()),
        Some(bid_path.to_str().unwrap()),
        &out_path,
        &config,
    )
    .await
    .unwrap();

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(written, "## Match\n70%\n");
    assert_eq!(written, output.analysis);
    assert!(!dir.path().join("reports").join("analysis.md.tmp").exists());
}

#[test]
fn test_sync_wrapper_runs_outside_a_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let cv_path = dir.path().join("cv.docx");
    let bid_path = dir.path().join("bid.docx");
    std::fs::write(&cv_path, docx_with_lines(&["Electrician"])).unwrap();
    std::fs::write(&bid_path, docx_with_lines(&["Site electrician"])).unwrap();

    let client = StubClient::new(r#"[{"generated_text": "Match: 95%"}]"#);
    let config = config_with(client.clone(), None);

    let output = analyze_sync(
        Some(cv_path.to_str().unwrap()),
        Some(bid_path.to_str().unwrap()),
        &config,
    )
    .unwrap();
    assert_eq!(output.analysis, "Match: 95%\n");
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_nonexistent_path_is_reported() {
    let client = StubClient::new(r#"[{"generated_text": "unused"}]"#);
    let config = config_with(client.clone(), None);

    let result = analyze_files(Some("/no/such/cv.docx"), Some("/no/such/bid.docx"), &config).await;
    assert!(matches!(result, Err(AnalyserError::DocumentNotFound { .. })));
    assert_eq!(client.calls(), 0);
}

// ── Credentials ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bad_secrets_file_fails_before_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let secrets = dir.path().join("secrets.toml");
    std::fs::write(&secrets, "[huggingface\ntoken = ").unwrap();

    let log = Arc::new(EventLog::default());
    let config = AnalysisConfig::builder()
        .secrets_path(&secrets)
        .progress_callback(log.clone() as Arc<dyn AnalysisProgressCallback>)
        .build()
        .unwrap();

    let cv = docx_upload("cv.docx", &["Python"]);
    let bid = docx_upload("bid.docx", &["Python job"]);
    let result = analyze(Some(cv), Some(bid), &config).await;

    assert!(matches!(result, Err(AnalyserError::SecretsFile { .. })));
    assert!(log.extracted.lock().unwrap().is_empty());
}

// ── HTTP wire format against a local server ──────────────────────────────────

#[tokio::test]
async fn test_hf_client_sends_bearer_and_inputs() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/google/flan-t5-base")
        .match_header("authorization", "Bearer hf_test_token")
        .match_body(Matcher::Json(json!({ "inputs": "Compare these" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"generated_text": "Match: 90%"}]"#)
        .create_async()
        .await;

    let client = HuggingFaceClient::new(
        format!("{}/models/google/flan-t5-base", server.url()),
        ApiToken::new("hf_test_token"),
        None,
        None,
    )
    .unwrap();

    let text = client.generate("Compare these".into()).await.unwrap();
    assert_eq!(text, "Match: 90%");
    assert_eq!(client.model_name(), "google/flan-t5-base");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_hf_client_sends_max_new_tokens() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/generate")
        .match_body(Matcher::Json(json!({
            "inputs": "prompt",
            "parameters": { "max_new_tokens": 512 }
        })))
        .with_status(200)
        .with_body(r###"{"generated_text": "## Match\n75%"}"###)
        .create_async()
        .await;

    let client = HuggingFaceClient::new(
        format!("{}/generate", server.url()),
        ApiToken::new("hf_x"),
        Some(512),
        Some(10),
    )
    .unwrap();

    assert_eq!(client.generate("prompt".into()).await.unwrap(), "## Match\n75%");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_hf_client_loading_error_is_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/google/flan-t5-base")
        .with_status(503)
        .with_body(r#"{"error": "Model google/flan-t5-base is currently loading", "estimated_time": 20.0}"#)
        .create_async()
        .await;

    let client = HuggingFaceClient::new(
        format!("{}/models/google/flan-t5-base", server.url()),
        ApiToken::new("hf_x"),
        None,
        None,
    )
    .unwrap();

    match client.generate("p".into()).await {
        Err(AnalyserError::Decode { detail }) => assert!(detail.contains("loading"), "{detail}"),
        other => panic!("expected Decode, got {other:?}"),
    }
}

#[tokio::test]
async fn test_hf_client_stalled_body_is_api_timeout() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Headers and the first bytes of a 100-byte body, then silence.
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.ends_with(b"}") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n[{\"ge",
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(socket);
    });

    let client = HuggingFaceClient::new(
        format!("http://{addr}/models/google/flan-t5-base"),
        ApiToken::new("hf_x"),
        None,
        Some(1),
    )
    .unwrap();

    let result = client.generate("Compare".into()).await;
    server.abort();

    match result {
        Err(AnalyserError::ApiTimeout { secs }) => assert_eq!(secs, 1),
        other => panic!("expected ApiTimeout, got {other:?}"),
    }
    let notice = present(&Err(AnalyserError::ApiTimeout { secs: 1 }));
    assert!(!notice.headline.contains("decoding"));
}

#[tokio::test]
async fn test_preset_request_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/mistralai/Mistral-7B-Instruct-v0.2")
        .match_header("authorization", "Bearer hf_e2e")
        .match_body(Matcher::PartialJson(json!({ "parameters": { "max_new_tokens": 512 } })))
        .with_status(200)
        .with_body(r#"[{"generated_text": "Match: 80%"}]"#)
        .create_async()
        .await;

    let config = AnalysisConfig::builder()
        .preset(ModelPreset::Mistral7BInstruct)
        .endpoint(format!(
            "{}/models/mistralai/Mistral-7B-Instruct-v0.2",
            server.url()
        ))
        .api_token(ApiToken::new("hf_e2e"))
        .build()
        .unwrap();

    let cv = docx_upload("cv.docx", &["Python, 5 years backend"]);
    let bid = docx_upload("job.docx", &["Looking for Python backend engineer, 3+ years"]);
    let output = analyze(Some(cv), Some(bid), &config).await.unwrap();

    assert_eq!(output.analysis, "Match: 80%\n");
    assert_eq!(output.model, "mistralai/Mistral-7B-Instruct-v0.2");
    assert_eq!(output.stats.truncation_limit, 2000);
    mock.assert_async().await;
}
