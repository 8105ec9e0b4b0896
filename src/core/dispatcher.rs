use crate::domain::model::{DeliveryOutcome, Destination, InferredYear, SearchCandidate};
use crate::domain::ports::{MultipartBody, PhotoSender, RequestBody, Transport};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram 照片說明的長度上限（字元）
pub const CAPTION_LIMIT: usize = 1024;

const PHOTO_FILENAME: &str = "photo.jpg";
const PHOTO_MIME: &str = "image/jpeg";
const LOG_BODY_LIMIT: usize = 300;

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub api_base: String,
    pub bot_token: String,
    pub reference_timeout: Duration,
    pub download_timeout: Duration,
    pub upload_timeout: Duration,
    /// 收到 429 後重送前的等待
    pub rate_limit_pause: Duration,
}

impl DispatchSettings {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.into(),
            reference_timeout: Duration::from_secs(20),
            download_timeout: Duration::from_secs(25),
            upload_timeout: Duration::from_secs(30),
            rate_limit_pause: Duration::from_secs(3),
        }
    }

    pub fn send_photo_url(&self) -> String {
        format!(
            "{}/bot{}/sendPhoto",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn compose_caption(title: &str, year: &InferredYear, label: &str) -> String {
    let year_line = match year {
        InferredYear::Known(y) => format!("📅 {} год", y),
        InferredYear::Unknown => format!("📅 {}", year),
    };
    let tail = format!("\n{}\n📍 {}", year_line, label);
    let head = "🏛 ";

    let budget = CAPTION_LIMIT.saturating_sub(head.chars().count() + tail.chars().count());
    let title = title.trim();
    if title.chars().count() <= budget {
        return format!("{}{}{}", head, title, tail);
    }

    // 留一個字元給省略號
    let shortened = truncate_chars(title, budget.saturating_sub(1)).trim_end();
    format!("{}{}…{}", head, shortened, tail)
}

/// 透過 Bot API 發送照片：先用 URL，失敗再下載後以檔案上傳
pub struct TelegramDispatcher<T: Transport> {
    transport: Arc<T>,
    settings: DispatchSettings,
}

impl<T: Transport> TelegramDispatcher<T> {
    pub fn new(transport: Arc<T>, settings: DispatchSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    async fn post_reference(&self, url: &str, payload: &serde_json::Value) -> Result<(u16, String)> {
        let response = self
            .transport
            .post(
                url,
                RequestBody::Json(payload.clone()),
                self.settings.reference_timeout,
            )
            .await?;
        Ok((response.status(), response.text()))
    }

    /// 以 URL 發送；成功回傳 true，其餘情況交給檔案上傳
    async fn send_by_reference(&self, destination: &Destination, image_url: &str, caption: &str) -> bool {
        let api_url = self.settings.send_photo_url();
        let payload = json!({
            "chat_id": destination.id,
            "photo": image_url,
            "caption": caption,
        });
        let label = &destination.label;

        let (status, body) = match self.post_reference(&api_url, &payload).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("⚠️  {}: sending by URL failed: {}", label, e);
                return false;
            }
        };

        if status == 200 {
            tracing::info!("✅ {}: sent by URL", label);
            return true;
        }

        if status == 429 {
            tracing::warn!(
                "⚠️  {}: 429 Too Many Requests, retrying by URL in {:?}",
                label,
                self.settings.rate_limit_pause
            );
            tokio::time::sleep(self.settings.rate_limit_pause).await;

            match self.post_reference(&api_url, &payload).await {
                Ok((200, _)) => {
                    tracing::info!("✅ {}: sent by URL (retry)", label);
                    return true;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("⚠️  {}: URL retry failed: {}", label, e);
                    return false;
                }
            }
        }

        tracing::warn!(
            "⚠️  {}: could not send by URL: {}",
            label,
            truncate_chars(&body, LOG_BODY_LIMIT)
        );
        false
    }

    async fn download(&self, image_url: &str) -> Result<Vec<u8>> {
        let response = self
            .transport
            .get(image_url, self.settings.download_timeout)
            .await?
            .error_for_status(image_url)?;
        Ok(response.into_bytes())
    }

    async fn send_as_file(&self, destination: &Destination, bytes: Vec<u8>, caption: &str) -> DeliveryOutcome {
        let label = &destination.label;
        let form = MultipartBody::new()
            .text("chat_id", destination.id.clone())
            .text("caption", caption)
            .file("photo", PHOTO_FILENAME, PHOTO_MIME, bytes);

        let response = match self
            .transport
            .post(
                &self.settings.send_photo_url(),
                RequestBody::Multipart(form),
                self.settings.upload_timeout,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("❌ {}: file upload request failed: {}", label, e);
                return DeliveryOutcome::UploadFailed;
            }
        };

        if response.status() == 200 {
            tracing::info!("✅ {}: sent as file", label);
            DeliveryOutcome::SentAsFile
        } else {
            tracing::error!(
                "❌ {}: file upload rejected ({}): {}",
                label,
                response.status(),
                truncate_chars(&response.text(), LOG_BODY_LIMIT)
            );
            DeliveryOutcome::UploadFailed
        }
    }
}

#[async_trait]
impl<T: Transport> PhotoSender for TelegramDispatcher<T> {
    async fn send(&self, destination: &Destination, candidate: &SearchCandidate) -> DeliveryOutcome {
        let caption = compose_caption(&candidate.title, &candidate.year, &destination.label);

        if self
            .send_by_reference(destination, &candidate.image_url, &caption)
            .await
        {
            return DeliveryOutcome::SentByReference;
        }

        let bytes = match self.download(&candidate.image_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("❌ {}: image download failed: {}", destination.label, e);
                return DeliveryOutcome::DownloadFailed;
            }
        };

        self.send_as_file(destination, bytes, &caption).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_layout() {
        let caption = compose_caption(
            "Fili park.jpg\n\nOil on canvas",
            &InferredYear::Known("1956".to_string()),
            "Фили",
        );
        assert_eq!(caption, "🏛 Fili park.jpg\n\nOil on canvas\n📅 1956 год\n📍 Фили");
    }

    #[test]
    fn test_caption_unknown_year() {
        let caption = compose_caption("Картина", &InferredYear::Unknown, "Арбат");
        assert_eq!(caption, "🏛 Картина\n📅 год неизвестен\n📍 Арбат");
    }

    #[test]
    fn test_long_caption_is_truncated() {
        let title = "ж".repeat(3000);
        let caption = compose_caption(&title, &InferredYear::Known("1901".to_string()), "Тушино");

        assert_eq!(caption.chars().count(), CAPTION_LIMIT);
        assert!(caption.ends_with("\n📅 1901 год\n📍 Тушино"));
        assert!(caption.contains('…'));
    }

    #[test]
    fn test_send_photo_url() {
        let mut settings = DispatchSettings::new("123:ABC");
        assert_eq!(settings.send_photo_url(), "https://api.telegram.org/bot123:ABC/sendPhoto");

        settings.api_base = "http://127.0.0.1:9000/".to_string();
        assert_eq!(settings.send_photo_url(), "http://127.0.0.1:9000/bot123:ABC/sendPhoto");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("Москва", 3), "Мос");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
