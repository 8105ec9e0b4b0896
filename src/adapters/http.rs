use crate::domain::ports::{HttpResponse, RequestBody, Transport};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// 已知只允許經由代理對外連線的託管環境
const RESTRICTED_HOST_MARKERS: [&str; 3] = [
    "PYTHONANYWHERE_DOMAIN",
    "PYTHONANYWHERE_SITE",
    "PYTHONANYWHERE_USER",
];

const PROXY_MARKERS: [&str; 4] = ["HTTP_PROXY", "HTTPS_PROXY", "http_proxy", "https_proxy"];

pub fn is_restricted_host(has_var: impl Fn(&str) -> bool) -> bool {
    RESTRICTED_HOST_MARKERS.iter().any(|k| has_var(*k))
}

pub fn should_try_proxy(has_var: impl Fn(&str) -> bool) -> bool {
    is_restricted_host(&has_var) || PROXY_MARKERS.iter().any(|k| has_var(*k))
}

/// 受限環境下執行結束時的提示
pub fn end_of_run_note(errors: usize, proxy_engaged: bool, policy: ProxyPolicy) -> Option<&'static str> {
    if proxy_engaged {
        Some("Direct network access failed during this run; system proxy mode was used.")
    } else if errors > 0 && policy.should_try_proxy {
        Some("The network seems unreachable without a proxy; check HTTPS_PROXY before the next run.")
    } else {
        None
    }
}

fn env_has(key: &str) -> bool {
    std::env::var_os(key).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyPolicy {
    pub should_try_proxy: bool,
}

impl ProxyPolicy {
    pub fn from_env() -> Self {
        Self {
            should_try_proxy: should_try_proxy(env_has),
        }
    }

    pub fn never() -> Self {
        Self {
            should_try_proxy: false,
        }
    }

    pub fn always() -> Self {
        Self {
            should_try_proxy: true,
        }
    }
}

/// 暫時性狀態碼的自動重試設定
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub retry_statuses: Vec<u16>,
    /// Retry-After 標頭的上限
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(600),
            retry_statuses: vec![429, 500, 502, 503, 504],
            max_retry_after: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// 第 n 次重試（從 0 起算）前的等待：base * 2^n
    pub fn backoff(&self, retry_index: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(retry_index)
    }

    fn delay_for(&self, response: &HttpResponse, retry_index: u32) -> Duration {
        response
            .header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs).min(self.max_retry_after))
            .unwrap_or_else(|| self.backoff(retry_index))
    }
}

/// 直連失敗時一次性切換到系統代理的 HTTP 傳輸層
pub struct ResilientTransport {
    direct: Client,
    proxied: Client,
    proxy_policy: ProxyPolicy,
    retry: RetryPolicy,
    proxy_mode: AtomicBool,
}

impl ResilientTransport {
    pub fn new(proxy_policy: ProxyPolicy, retry: RetryPolicy) -> Result<Self> {
        let direct = Client::builder()
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()?;
        // 預設的 builder 會讀取 HTTP(S)_PROXY 等系統代理設定
        let proxied = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self::with_clients(direct, proxied, proxy_policy, retry))
    }

    pub fn with_clients(
        direct: Client,
        proxied: Client,
        proxy_policy: ProxyPolicy,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            direct,
            proxied,
            proxy_policy,
            retry,
            proxy_mode: AtomicBool::new(false),
        }
    }

    pub fn proxy_mode_engaged(&self) -> bool {
        self.proxy_mode.load(Ordering::SeqCst)
    }

    /// 只有第一次切換時回傳 true
    pub fn enable_proxy_mode_once(&self) -> bool {
        let switched = self
            .proxy_mode
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if switched {
            tracing::info!("🌐 Switching to system proxy mode for the rest of the run");
        }
        switched
    }

    fn active_client(&self) -> &Client {
        if self.proxy_mode_engaged() {
            &self.proxied
        } else {
            &self.direct
        }
    }

    async fn send_once(
        &self,
        client: &Client,
        method: &Method,
        url: &str,
        body: Option<&RequestBody>,
        timeout: Duration,
    ) -> Result<HttpResponse> {
        let mut request = client.request(method.clone(), url).timeout(timeout);

        match body {
            Some(RequestBody::Json(value)) => {
                request = request.json(value);
            }
            Some(RequestBody::Multipart(multipart)) => {
                let mut form = Form::new();
                for (name, value) in &multipart.fields {
                    form = form.text(name.clone(), value.clone());
                }
                for file in &multipart.files {
                    let part = Part::bytes(file.bytes.clone())
                        .file_name(file.filename.clone())
                        .mime_str(&file.mime)?;
                    form = form.part(file.field.clone(), part);
                }
                request = request.multipart(form);
            }
            None => {}
        }

        let mut response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();

        // 逐塊讀取內容
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            bytes.extend_from_slice(&chunk);
        }

        tracing::debug!("{} {} -> {} ({} bytes)", method, url, status, bytes.len());
        Ok(HttpResponse::new(status, headers, bytes))
    }

    async fn send_with_retry(
        &self,
        client: &Client,
        method: &Method,
        url: &str,
        body: Option<&RequestBody>,
        timeout: Duration,
    ) -> Result<HttpResponse> {
        let mut retry_index = 0;
        loop {
            let response = self.send_once(client, method, url, body, timeout).await?;
            if retry_index >= self.retry.max_retries || !self.retry.is_retryable(response.status()) {
                return Ok(response);
            }

            let delay = self.retry.delay_for(&response, retry_index);
            tracing::debug!(
                "HTTP {} from {}, retry {}/{} in {:?}",
                response.status(),
                url,
                retry_index + 1,
                self.retry.max_retries,
                delay
            );
            tokio::time::sleep(delay).await;
            retry_index += 1;
        }
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<RequestBody>,
        timeout: Duration,
    ) -> Result<HttpResponse> {
        let was_proxied = self.proxy_mode_engaged();
        let result = self
            .send_with_retry(self.active_client(), &method, url, body.as_ref(), timeout)
            .await;

        match result {
            Err(e) if e.is_network() && !was_proxied && self.proxy_policy.should_try_proxy => {
                tracing::warn!("⚠️ Direct request to {} failed: {}", url, e);
                self.enable_proxy_mode_once();
                self.send_with_retry(&self.proxied, &method, url, body.as_ref(), timeout)
                    .await
            }
            other => other,
        }
    }
}

#[async_trait]
impl Transport for ResilientTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse> {
        self.execute(Method::GET, url, None, timeout).await
    }

    async fn post(&self, url: &str, body: RequestBody, timeout: Duration) -> Result<HttpResponse> {
        self.execute(Method::POST, url, Some(body), timeout).await
    }
}
