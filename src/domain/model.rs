use serde::{Deserialize, Serialize};
use std::fmt;

/// 圖片年份未知時的顯示文字
pub const YEAR_UNKNOWN: &str = "год неизвестен";

/// 沒有標題時的預設說明
pub const DEFAULT_TITLE: &str = "Картина с видом района";

/// 一個發送目標（群組），附帶地理中心與顯示名稱
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// 搜尋半徑（公尺）
    pub radius: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InferredYear {
    Known(String),
    Unknown,
}

impl fmt::Display for InferredYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferredYear::Known(year) => f.write_str(year),
            InferredYear::Unknown => f.write_str(YEAR_UNKNOWN),
        }
    }
}

/// 通過過濾的候選圖片，只存在於單次搜尋期間
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub image_url: String,
    pub title: String,
    pub year: InferredYear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    SentByReference,
    SentAsFile,
    DownloadFailed,
    UploadFailed,
}

impl DeliveryOutcome {
    pub fn is_delivered(self) -> bool {
        matches!(
            self,
            DeliveryOutcome::SentByReference | DeliveryOutcome::SentAsFile
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttempt {
    pub destination_id: String,
    pub candidate: SearchCandidate,
    pub outcome: DeliveryOutcome,
}

/// 單次執行的統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sent: usize,
    pub errors: usize,
    /// 依處理順序記錄的目標識別碼
    pub processed: Vec<String>,
    pub attempts: Vec<DeliveryAttempt>,
}
