use crate::core::filter::{dedup_by_url, evaluate, RawImage};
use crate::domain::model::{Destination, SearchCandidate};
use crate::domain::ports::{CandidateSource, HttpResponse, Transport};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const COMMONS_API_URL: &str = "https://commons.wikimedia.org/w/api.php";

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub api_url: String,
    pub request_timeout: Duration,
    /// 兩個搜尋詞之間的間隔
    pub term_pause: Duration,
    /// 累積到這個數量的不重複結果就停止
    pub result_target: usize,
    pub page_limit: u32,
    pub thumb_width: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_url: COMMONS_API_URL.to_string(),
            request_timeout: Duration::from_secs(20),
            term_pause: Duration::from_millis(500),
            result_target: 20,
            page_limit: 30,
            thumb_width: 1280,
        }
    }
}

/// 依地區名稱組出搜尋詞；沒有名稱時改用整個城市
pub fn search_terms(locality: &str) -> Vec<String> {
    let locality = locality.trim();
    if locality.is_empty() {
        return vec![
            "Moscow painting".to_string(),
            "Moscow cityscape painting".to_string(),
        ];
    }

    vec![
        format!("{} Москва картина", locality),
        format!("{} Moscow painting", locality),
        format!("{} Moscow cityscape painting", locality),
    ]
}

/// 欄位型別不符時視為不存在，而不是整份回應失敗
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default, deserialize_with = "lenient")]
    query: Option<QueryBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryBlock {
    #[serde(default, deserialize_with = "lenient")]
    pages: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct PageEntry {
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    imageinfo: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageInfo {
    #[serde(default, deserialize_with = "lenient")]
    thumburl: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    extmetadata: Option<ExtMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtMetadata {
    #[serde(rename = "ObjectName", default, deserialize_with = "lenient")]
    object_name: Option<MetaField>,
    #[serde(rename = "ImageDescription", default, deserialize_with = "lenient")]
    image_description: Option<MetaField>,
    #[serde(rename = "Categories", default, deserialize_with = "lenient")]
    categories: Option<MetaField>,
}

#[derive(Debug, Default, Deserialize)]
struct MetaField {
    #[serde(default)]
    value: Option<Value>,
}

fn meta_text(field: &Option<MetaField>) -> String {
    field
        .as_ref()
        .and_then(|f| f.value.as_ref())
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl PageEntry {
    fn into_raw(self) -> Option<RawImage> {
        let first = self.imageinfo?.into_iter().next()?;
        let info: ImageInfo = serde_json::from_value(first).ok()?;
        let image_url = info
            .thumburl
            .filter(|u| !u.is_empty())
            .or(info.url)
            .filter(|u| !u.is_empty())?;
        let meta = info.extmetadata.unwrap_or_default();

        Some(RawImage {
            image_url,
            title: self
                .title
                .unwrap_or_default()
                .replace("File:", "")
                .trim()
                .to_string(),
            object_name: meta_text(&meta.object_name),
            description_html: meta_text(&meta.image_description),
            categories: meta_text(&meta.categories),
        })
    }
}

/// 解析搜尋回應；不是 JSON 時回傳錯誤，結構不符的頁面直接略過
pub fn parse_search_response(response: &HttpResponse) -> Result<Vec<RawImage>> {
    let parsed: SearchResponse = response.json()?;
    let pages = parsed
        .query
        .and_then(|q| q.pages)
        .unwrap_or_default();

    Ok(pages
        .into_iter()
        .filter_map(|(_, page)| serde_json::from_value::<PageEntry>(page).ok())
        .filter_map(PageEntry::into_raw)
        .collect())
}

/// Wikimedia Commons 圖片搜尋
pub struct CommonsSearch<T: Transport> {
    transport: Arc<T>,
    settings: SearchSettings,
}

impl<T: Transport> CommonsSearch<T> {
    pub fn new(transport: Arc<T>, settings: SearchSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn query_url(&self, term: &str) -> Result<String> {
        let limit = self.settings.page_limit.to_string();
        let width = self.settings.thumb_width.to_string();
        let url = Url::parse_with_params(
            &self.settings.api_url,
            &[
                ("action", "query"),
                ("format", "json"),
                ("prop", "imageinfo"),
                ("generator", "search"),
                ("gsrsearch", term),
                ("gsrnamespace", "6"),
                ("gsrlimit", limit.as_str()),
                ("iiprop", "url|extmetadata"),
                ("iiurlwidth", width.as_str()),
            ],
        )?;
        Ok(url.into())
    }

    /// 單一搜尋詞；任何失敗都當作沒有結果
    async fn search_term(&self, term: &str) -> Vec<RawImage> {
        let url = match self.query_url(term) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("   ❌ Commons query could not be built: {}", e);
                return Vec::new();
            }
        };

        let response = match self
            .transport
            .get(&url, self.settings.request_timeout)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("   ❌ Commons HTTP error: {}", e);
                return Vec::new();
            }
        };

        if response.status() != 200 {
            tracing::warn!("   ❌ Commons status {}", response.status());
            return Vec::new();
        }

        match parse_search_response(&response) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("   ❌ Commons answered with non-JSON body: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl<T: Transport> CandidateSource for CommonsSearch<T> {
    async fn search(&self, destination: &Destination) -> Result<Vec<SearchCandidate>> {
        let terms = search_terms(&destination.label);
        let total = terms.len();
        let mut accepted: Vec<SearchCandidate> = Vec::new();

        for (index, term) in terms.iter().enumerate() {
            tracing::info!("   🎨 Commons search ({}/{}): '{}'", index + 1, total, term);

            let raw = self.search_term(term).await;
            let fetched = raw.len();
            accepted.extend(raw.iter().filter_map(evaluate));
            accepted = dedup_by_url(accepted);
            tracing::debug!(
                "   {} raw results, {} unique paintings so far",
                fetched,
                accepted.len()
            );

            if accepted.len() >= self.settings.result_target {
                break;
            }
            if index + 1 < total {
                tokio::time::sleep(self.settings.term_pause).await;
            }
        }

        tracing::info!("   🎨 Commons total: {} paintings found", accepted.len());
        Ok(accepted)
    }
}
