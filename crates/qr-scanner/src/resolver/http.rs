//! HTTP scan 조회 클라이언트
//!
//! `GET {base_url}/api/qr-codes/scan/{hash}`를 호출합니다.
//!
//! | 응답 | 결과 |
//! |---|---|
//! | 2xx + JSON | `Ok(ScanLookupResponse)` |
//! | 404 | `Ok(success: false)` (매칭 없음) |
//! | 그 밖의 non-2xx | `Err(LookupError::Http)` |
//! | 연결 실패/타임아웃 | `Err(LookupError::Network)` |
//! | JSON 파싱 실패 | `Err(LookupError::Decode)` |

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use tracing::debug;

use tracelink_core::config::ResolverConfig;
use tracelink_core::error::LookupError;
use tracelink_core::pipeline::{RequestContext, ScanLookup};
use tracelink_core::types::ScanLookupResponse;

const USER_AGENT: &str = concat!("tracelink/", env!("CARGO_PKG_VERSION"));

/// scan 엔드포인트 경로 세그먼트
const SCAN_PATH: [&str; 3] = ["api", "qr-codes", "scan"];

/// reqwest 기반 scan 조회 구현
#[derive(Debug, Clone)]
pub struct HttpScanLookup {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpScanLookup {
    /// 기본 URL과 타임아웃으로 클라이언트를 생성합니다.
    ///
    /// # Errors
    ///
    /// - URL이 http/https가 아니거나 파싱할 수 없으면 `InvalidUrl`
    /// - HTTP 클라이언트 초기화 실패 시 `Network`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| LookupError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(LookupError::InvalidUrl(format!(
                "{base_url}: must be an http or https URL"
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// core의 `ResolverConfig`에서 클라이언트를 생성합니다.
    pub fn from_core(config: &ResolverConfig) -> Result<Self, LookupError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    /// 조회 URL을 만듭니다. 해시는 하나의 경로 세그먼트로 인코딩됩니다.
    pub fn scan_url(&self, hash: &str) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| LookupError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(SCAN_PATH)
            .push(hash);
        Ok(url)
    }
}

impl ScanLookup for HttpScanLookup {
    async fn scan_by_hash(
        &self,
        hash: &str,
        ctx: &RequestContext,
    ) -> Result<ScanLookupResponse, LookupError> {
        let url = self.scan_url(hash)?;
        debug!(url = %url, authenticated = ctx.auth_token.is_some(), "querying scan endpoint");

        let mut request = self.client.get(url).header(ACCEPT, "application/json");
        if let Some(token) = &ctx.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(hash, "scan endpoint returned 404");
            return Ok(ScanLookupResponse {
                success: false,
                data: None,
            });
        }
        if !status.is_success() {
            return Err(LookupError::Http {
                status: status.as_u16(),
            });
        }

        response
            .json::<ScanLookupResponse>()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))
    }
}
