use crate::domain::model::{InferredYear, SearchCandidate, DEFAULT_TITLE};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// 出現任一即淘汰（明信片、版畫、照片、地圖等）
pub const BAD_MARKERS: &[&str] = &[
    "postcard",
    "postcards",
    "открытка",
    "открытки",
    "engraving",
    "гравюра",
    "гравюры",
    "lithograph",
    "литография",
    "photo",
    "photograph",
    "фото",
    "панорама",
    "panorama",
    "map",
    "карта",
    "scheme",
    "схема",
    "logo",
    "логотип",
];

/// 至少要出現一個才接受（油畫、水彩、素描）
pub const GOOD_MARKERS: &[&str] = &[
    "painting",
    "paintings",
    "oil on canvas",
    "oil painting",
    "масло по холсту",
    "живопись",
    "watercolour",
    "watercolor",
    "акварель",
    "drawing",
    "drawings",
    "graphite",
    "рисунок",
    "рисунки",
];

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(18|19|20)\d{2}").expect("valid year pattern"));

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    BadMarker(&'static str),
    NoGoodMarker,
}

/// 搜尋結果中取出的原始欄位，尚未過濾
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawImage {
    pub image_url: String,
    pub title: String,
    pub object_name: String,
    pub description_html: String,
    pub categories: String,
}

impl RawImage {
    pub fn description(&self) -> String {
        strip_html(&self.description_html)
    }

    /// 合併所有文字並轉小寫，供關鍵字判斷與年份擷取
    pub fn text_blob(&self) -> String {
        [
            self.title.as_str(),
            self.object_name.as_str(),
            self.description().as_str(),
            self.categories.as_str(),
        ]
        .join(" ")
        .to_lowercase()
    }

    pub fn display_title(&self) -> String {
        let description = self.description();
        let parts: Vec<&str> = [self.title.trim(), description.trim()]
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            parts.join("\n\n")
        }
    }
}

pub fn strip_html(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}

/// 淘汰標記優先於接受標記；兩者皆無時不接受
pub fn classify(blob: &str) -> Verdict {
    if let Some(bad) = BAD_MARKERS.iter().find(|m| blob.contains(*m)) {
        return Verdict::BadMarker(*bad);
    }
    if GOOD_MARKERS.iter().any(|m| blob.contains(m)) {
        Verdict::Accepted
    } else {
        Verdict::NoGoodMarker
    }
}

pub fn extract_year(blob: &str) -> InferredYear {
    YEAR_RE
        .find(blob)
        .map(|m| InferredYear::Known(m.as_str().to_string()))
        .unwrap_or(InferredYear::Unknown)
}

pub fn evaluate(raw: &RawImage) -> Option<SearchCandidate> {
    if raw.image_url.is_empty() {
        return None;
    }

    let blob = raw.text_blob();
    match classify(&blob) {
        Verdict::Accepted => Some(SearchCandidate {
            image_url: raw.image_url.clone(),
            title: raw.display_title(),
            year: extract_year(&blob),
        }),
        verdict => {
            tracing::debug!("Skipping {}: {:?}", raw.image_url, verdict);
            None
        }
    }
}

/// 依 URL 去重，保留第一次出現的項目與原本順序
pub fn dedup_by_url(candidates: Vec<SearchCandidate>) -> Vec<SearchCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.image_url.clone()))
        .collect()
}
