#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_chat::{
    agents::ReplyAgent,
    db::MemoryRepository,
    llm::LLMAdapter,
    storage::FileStorage,
    types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage},
    AppState, Config,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "pdf-chat-test-boundary";

/// Build a PDF with one page per entry, each page showing its text.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
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
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Multipart body with a single file field.
pub fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Adapter that replies with fixed text, or fails with a fixed message.
pub struct ScriptedAdapter {
    reply: Result<String, String>,
}

impl ScriptedAdapter {
    pub fn answering(text: &str) -> Arc<dyn LLMAdapter> {
        Arc::new(Self { reply: Ok(text.to_string()) })
    }

    pub fn failing(error: &str) -> Arc<dyn LLMAdapter> {
        Arc::new(Self { reply: Err(error.to_string()) })
    }
}

#[async_trait]
impl LLMAdapter for ScriptedAdapter {
    async fn create_chat_completion(&self, _request: &LLMRequest) -> AppResult<LLMResponse> {
        match &self.reply {
            Ok(content) => Ok(LLMResponse {
                content: content.clone(),
                finish_reason: "stop".to_string(),
                usage: TokenUsage::default(),
            }),
            Err(e) => Err(AppError::LLMApi(e.clone())),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub media: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

impl TestApp {
    pub async fn new(adapter: Option<Arc<dyn LLMAdapter>>) -> Self {
        let media = TempDir::new().unwrap();
        let config = Config::from_lookup(|_| None).unwrap();
        let files = FileStorage::new(media.path());
        files.init().await.unwrap();

        let repo = Arc::new(MemoryRepository::new());
        let state = AppState {
            repo: repo.clone(),
            files,
            reply_agent: Arc::new(ReplyAgent::new(adapter, config.llm.model.clone())),
            config,
        };

        Self {
            router: pdf_chat::create_router(state),
            repo,
            media,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn upload(&self, filename: &str, data: &[u8]) -> TestResponse {
        let request = Request::post("/api/upload/")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(multipart_body("file", filename, data)))
            .unwrap();
        self.send(request).await
    }

    pub async fn chat(&self, body: Value) -> TestResponse {
        let request = Request::post("/api/chat/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Upload a PDF and return the created document's id.
    pub async fn upload_pages(&self, filename: &str, pages: &[&str]) -> String {
        let response = self.upload(filename, &pdf_with_pages(pages)).await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.json()["id"].as_str().unwrap().to_string()
    }
}
