use chrono::{DateTime, FixedOffset, Timelike, Utc};

/// 固定 UTC+3（莫斯科時間，無日光節約）
const MOSCOW_OFFSET_SECS: i32 = 3 * 3600;

pub fn moscow_offset() -> FixedOffset {
    FixedOffset::east_opt(MOSCOW_OFFSET_SECS).expect("UTC+3 is a valid offset")
}

pub fn moscow_time(utc: DateTime<Utc>) -> DateTime<FixedOffset> {
    utc.with_timezone(&moscow_offset())
}

pub fn moscow_now() -> DateTime<FixedOffset> {
    moscow_time(Utc::now())
}

/// 只在指定整點時段執行的設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HourWindow {
    Always,
    At(u32),
    /// 無法解析的值，記錄後忽略
    Invalid(String),
}

impl HourWindow {
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            None | Some("") => return HourWindow::Always,
            Some(raw) => raw,
        };

        match raw.parse::<u32>() {
            Ok(hour) if hour <= 23 => HourWindow::At(hour),
            _ => HourWindow::Invalid(raw.to_string()),
        }
    }

    pub fn allows(&self, now: &DateTime<FixedOffset>) -> bool {
        match self {
            HourWindow::At(hour) => now.hour() == *hour,
            HourWindow::Always | HourWindow::Invalid(_) => true,
        }
    }
}
