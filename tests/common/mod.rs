#![allow(dead_code)]

use async_trait::async_trait;
use botpic::domain::model::{DeliveryOutcome, Destination, InferredYear, SearchCandidate};
use botpic::domain::ports::{
    CandidateSource, HttpResponse, PhotoSender, RequestBody, Transport,
};
use botpic::{BotError, Result};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// 記錄一次呼叫
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub body: Option<RequestBody>,
    pub at: Instant,
}

/// 依序回放預先排好的回應；`None` 代表網路錯誤
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Option<HttpResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, response: HttpResponse) -> Self {
        self.replies.lock().unwrap().push_back(Some(response));
        self
    }

    pub fn fail(self) -> Self {
        self.replies.lock().unwrap().push_back(None);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.calls().iter().map(|c| c.method).collect()
    }

    fn next(&self, method: &'static str, url: &str, body: Option<RequestBody>) -> Result<HttpResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            url: url.to_string(),
            body,
            at: Instant::now(),
        });

        match self.replies.lock().unwrap().pop_front() {
            Some(Some(response)) => Ok(response),
            Some(None) => Err(BotError::ProcessingError {
                message: "scripted network failure".to_string(),
            }),
            None => Err(BotError::ProcessingError {
                message: format!("unexpected {} {}", method, url),
            }),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse> {
        self.next("GET", url, None)
    }

    async fn post(&self, url: &str, body: RequestBody, _timeout: Duration) -> Result<HttpResponse> {
        self.next("POST", url, Some(body))
    }
}

pub fn destination(id: &str, label: &str) -> Destination {
    Destination {
        id: id.to_string(),
        latitude: 55.745093,
        longitude: 37.495266,
        radius: 1500.0,
        label: label.to_string(),
    }
}

pub fn candidate(url: &str) -> SearchCandidate {
    SearchCandidate {
        image_url: url.to_string(),
        title: "Вид на Фили".to_string(),
        year: InferredYear::Known("1955".to_string()),
    }
}

/// 一頁 Commons 搜尋結果
pub fn commons_page(title: &str, url: &str, description: &str) -> Value {
    json!({
        "title": format!("File:{}", title),
        "imageinfo": [{
            "thumburl": url,
            "url": url,
            "extmetadata": {
                "ImageDescription": {"value": description}
            }
        }]
    })
}

/// 以 (key, page) 清單組出回應，保留給定的順序
pub fn commons_response(pages: Vec<(&str, Value)>) -> HttpResponse {
    let mut map = serde_json::Map::new();
    for (key, page) in pages {
        map.insert(key.to_string(), page);
    }
    HttpResponse::with_body(200, json!({"query": {"pages": map}}).to_string())
}

/// 回傳固定的候選清單並記錄被查詢的目標
#[derive(Default)]
pub struct FixedSource {
    pub candidates: Vec<SearchCandidate>,
    pub queried: Mutex<Vec<String>>,
}

#[async_trait]
impl CandidateSource for FixedSource {
    async fn search(&self, destination: &Destination) -> Result<Vec<SearchCandidate>> {
        self.queried.lock().unwrap().push(destination.id.clone());
        Ok(self.candidates.clone())
    }
}

pub struct RecordingSender {
    pub outcome: DeliveryOutcome,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    pub fn new(outcome: DeliveryOutcome) -> Self {
        Self {
            outcome,
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PhotoSender for RecordingSender {
    async fn send(&self, destination: &Destination, candidate: &SearchCandidate) -> DeliveryOutcome {
        self.sent
            .lock()
            .unwrap()
            .push((destination.id.clone(), candidate.image_url.clone()));
        self.outcome
    }
}

/// 指定的目標搜尋失敗，其餘回傳固定候選
pub struct FailingSource {
    pub failing_id: String,
    pub candidates: Vec<SearchCandidate>,
}

#[async_trait]
impl CandidateSource for FailingSource {
    async fn search(&self, destination: &Destination) -> Result<Vec<SearchCandidate>> {
        if destination.id == self.failing_id {
            return Err(BotError::ProcessingError {
                message: format!("search for {} failed", destination.id),
            });
        }
        Ok(self.candidates.clone())
    }
}
