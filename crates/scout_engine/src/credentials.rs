use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use scout_logging::scout_info;

/// The fixed set of request headers sent with every session request.
/// Declaration order is the order headers are sent in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderKey {
    Accept,
    AcceptLanguage,
    CacheControl,
    SecChUa,
    SecChUaMobile,
    SecChUaPlatform,
    SecFetchDest,
    SecFetchMode,
    SecFetchSite,
    UpgradeInsecureRequests,
    Cookie,
}

impl HeaderKey {
    pub const ALL: [HeaderKey; 11] = [
        HeaderKey::Accept,
        HeaderKey::AcceptLanguage,
        HeaderKey::CacheControl,
        HeaderKey::SecChUa,
        HeaderKey::SecChUaMobile,
        HeaderKey::SecChUaPlatform,
        HeaderKey::SecFetchDest,
        HeaderKey::SecFetchMode,
        HeaderKey::SecFetchSite,
        HeaderKey::UpgradeInsecureRequests,
        HeaderKey::Cookie,
    ];

    /// Lower-case wire name of the header.
    pub fn as_str(self) -> &'static str {
        match self {
            HeaderKey::Accept => "accept",
            HeaderKey::AcceptLanguage => "accept-language",
            HeaderKey::CacheControl => "cache-control",
            HeaderKey::SecChUa => "sec-ch-ua",
            HeaderKey::SecChUaMobile => "sec-ch-ua-mobile",
            HeaderKey::SecChUaPlatform => "sec-ch-ua-platform",
            HeaderKey::SecFetchDest => "sec-fetch-dest",
            HeaderKey::SecFetchMode => "sec-fetch-mode",
            HeaderKey::SecFetchSite => "sec-fetch-site",
            HeaderKey::UpgradeInsecureRequests => "upgrade-insecure-requests",
            HeaderKey::Cookie => "cookie",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(name.trim()))
    }

    fn default_value(self) -> &'static str {
        match self {
            HeaderKey::Accept => {
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7"
            }
            HeaderKey::AcceptLanguage => "en-US,en;q=0.9,vi;q=0.8",
            HeaderKey::CacheControl => "max-age=0",
            HeaderKey::SecChUa => {
                "\"Not)A;Brand\";v=\"99\", \"Microsoft Edge\";v=\"127\", \"Chromium\";v=\"127\""
            }
            HeaderKey::SecChUaMobile => "?0",
            HeaderKey::SecChUaPlatform => "\"Windows\"",
            HeaderKey::SecFetchDest => "empty",
            HeaderKey::SecFetchMode => "navigate",
            HeaderKey::SecFetchSite => "same-origin",
            HeaderKey::UpgradeInsecureRequests => "1",
            HeaderKey::Cookie => "",
        }
    }
}

/// Browser-like header bundle carrying the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSet {
    values: BTreeMap<HeaderKey, String>,
}

impl Default for HeaderSet {
    fn default() -> Self {
        Self {
            values: HeaderKey::ALL
                .into_iter()
                .map(|key| (key, key.default_value().to_string()))
                .collect(),
        }
    }
}

impl HeaderSet {
    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        let mut headers = Self::default();
        headers.set(HeaderKey::Cookie, cookie);
        headers
    }

    pub fn get(&self, key: HeaderKey) -> &str {
        self.values.get(&key).map(String::as_str).unwrap_or_default()
    }

    pub fn cookie(&self) -> &str {
        self.get(HeaderKey::Cookie)
    }

    pub fn set(&mut self, key: HeaderKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    /// Overwrites every header named in `partial`; the rest are left alone.
    pub fn merge<I, V>(&mut self, partial: I)
    where
        I: IntoIterator<Item = (HeaderKey, V)>,
        V: Into<String>,
    {
        for (key, value) in partial {
            self.set(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (HeaderKey, &str)> {
        self.values.iter().map(|(key, value)| (*key, value.as_str()))
    }
}

/// Process-wide holder of the current header set.
///
/// Readers get a snapshot; writers go through [`CredentialStore::set`] or
/// [`CredentialStore::merge`] and are visible to the very next read.
#[derive(Debug, Default)]
pub struct CredentialStore {
    headers: RwLock<HeaderSet>,
}

impl CredentialStore {
    pub fn new(headers: HeaderSet) -> Self {
        Self {
            headers: RwLock::new(headers),
        }
    }

    pub fn get(&self) -> HeaderSet {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, key: HeaderKey, value: impl Into<String>) {
        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(key, value);
        // Values may be credentials; only the header name is logged.
        scout_info!("Header updated: {}", key.as_str());
    }

    pub fn merge<I, V>(&self, partial: I)
    where
        I: IntoIterator<Item = (HeaderKey, V)>,
        V: Into<String>,
    {
        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(partial);
    }

    pub fn update_cookie(&self, cookie: impl Into<String>) {
        self.set(HeaderKey::Cookie, cookie);
    }
}
