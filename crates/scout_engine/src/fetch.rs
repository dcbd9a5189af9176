use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use scout_logging::{scout_debug, scout_error, scout_info, scout_warn};

use crate::{decode_body, FailureKind, FetchError, FetchedPage, HeaderSet};

/// Substring of a redirect location that marks the SSO login boundary.
pub const SSO_MARKER: &str = "SSO.saml2";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Authenticated page retrieval. Only a 200 response counts as a page;
/// every other outcome is returned as a classified [`FetchError`].
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn get(&self, url: &str, headers: &HeaderSet) -> Result<FetchedPage, FetchError>;
}

/// [`PageSource`] over reqwest. Redirects are never followed so that an SSO
/// bounce surfaces as a 302/303 instead of a login page.
#[derive(Debug, Clone)]
pub struct ReqwestSession {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestSession {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(too_large(max_bytes, content_len));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(too_large(max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    async fn fetch_page(&self, url: &str, headers: &HeaderSet) -> Result<FetchedPage, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let header_map = to_header_map(headers)?;

        scout_debug!("GET {}", parsed);
        let response = self
            .client
            .get(parsed)
            .headers(header_map)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        match status {
            200 => {}
            302 | 303 => {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                return Err(classify_redirect(status, location));
            }
            _ => {
                let body = match self.read_body(response).await {
                    Ok(body) => body,
                    Err(err) => {
                        scout_debug!(
                            "Could not read {} error body from {}: {}",
                            status,
                            url,
                            err
                        );
                        Vec::new()
                    }
                };
                return Err(FetchError::new(
                    FailureKind::HttpStatus(status),
                    String::from_utf8_lossy(&body).into_owned(),
                ));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        let bytes = self.read_body(response).await?;
        let body = decode_body(&bytes, content_type.as_deref());
        if body.had_errors {
            scout_warn!(
                "Body of {} is not valid {}; invalid bytes were replaced",
                url,
                body.encoding
            );
        }

        scout_info!("Authenticated. {} bytes from {}", bytes.len(), url);
        Ok(FetchedPage {
            status,
            url: url.to_string(),
            content_type,
            html: body.text,
        })
    }
}

#[async_trait::async_trait]
impl PageSource for ReqwestSession {
    async fn get(&self, url: &str, headers: &HeaderSet) -> Result<FetchedPage, FetchError> {
        let result = self.fetch_page(url, headers).await;
        if let Err(err) = &result {
            log_failure(url, err);
        }
        result
    }
}

/// Classifies a 302/303 by its `Location`: an SSO login target means the
/// session credential has expired, anything else is a plain redirect failure.
pub fn classify_redirect(status: u16, location: String) -> FetchError {
    if location.contains(SSO_MARKER) {
        FetchError::new(
            FailureKind::AuthExpired { location },
            "SSO detected. Authentication required.",
        )
    } else {
        FetchError::new(
            FailureKind::Redirected { status, location },
            "redirects are not followed",
        )
    }
}

fn to_header_map(headers: &HeaderSet) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::new();
    for (key, value) in headers.iter() {
        // An unset cookie is omitted rather than sent blank.
        if value.is_empty() {
            continue;
        }
        let header_value = HeaderValue::from_str(value).map_err(|err| {
            FetchError::new(
                FailureKind::InvalidHeader { name: key.as_str() },
                err.to_string(),
            )
        })?;
        map.insert(HeaderName::from_static(key.as_str()), header_value);
    }
    Ok(map)
}

fn too_large(max_bytes: u64, actual: u64) -> FetchError {
    FetchError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

fn log_failure(url: &str, err: &FetchError) {
    match &err.kind {
        FailureKind::AuthExpired { location } => {
            scout_info!("Redirect detected: {}", location);
            scout_warn!("SSO detected. Authentication required.");
        }
        FailureKind::Redirected { status, location } => {
            scout_info!("Redirect detected ({}): {}", status, location);
        }
        FailureKind::HttpStatus(status) => {
            scout_error!("Error response {} from {}: {}", status, url, err.message);
        }
        kind => {
            scout_error!("Request error for {}: {} ({})", url, kind, err.message);
        }
    }
}
