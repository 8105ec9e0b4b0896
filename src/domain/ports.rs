use crate::domain::model::{DeliveryOutcome, Destination, SearchCandidate};
use crate::utils::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// 統一的 HTTP 回應：狀態碼、標頭與完整內容
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn with_status(status: u16) -> Self {
        Self::new(status, HeaderMap::new(), Vec::new())
    }

    pub fn with_body(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, HeaderMap::new(), body.into())
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// 非 2xx 時轉成錯誤
    pub fn error_for_status(self, url: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(BotError::HttpStatusError {
                status: self.status,
                url: url.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// multipart 表單的可重送描述（reqwest 的 Form 無法複製）
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(
        mut self,
        field: impl Into<String>,
        filename: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.files.push(FilePart {
            field: field.into(),
            filename: filename.into(),
            mime: mime.into(),
            bytes,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(MultipartBody),
}

/// 對外 HTTP 存取。沒有拿到回應時回傳 `BotError::NetworkError`，
/// 任何 HTTP 狀態碼都以 `HttpResponse` 回傳，由呼叫端判斷
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse>;
    async fn post(&self, url: &str, body: RequestBody, timeout: Duration) -> Result<HttpResponse>;
}

#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn search(&self, destination: &Destination) -> Result<Vec<SearchCandidate>>;
}

#[async_trait]
pub trait PhotoSender: Send + Sync {
    async fn send(&self, destination: &Destination, candidate: &SearchCandidate) -> DeliveryOutcome;

    async fn deliver(&self, destination: &Destination, candidate: &SearchCandidate) -> bool {
        self.send(destination, candidate).await.is_delivered()
    }
}
