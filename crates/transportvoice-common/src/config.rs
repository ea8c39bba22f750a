use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::StoreError;
use crate::retry::RetryPolicy;

// Userinfo runs up to the last `@` before the path, query or fragment.
static CREDENTIALS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^/?#]*@").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Redis,
    Mongo,
}

impl StoreKind {
    pub fn from_uri(uri: &str) -> Option<Self> {
        if uri.starts_with("redis://") || uri.starts_with("rediss://") {
            Some(StoreKind::Redis)
        } else if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
            Some(StoreKind::Mongo)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct StoreConfig {
    pub uri: String,
    pub require_tls: bool,
    pub allow_invalid_certs: bool,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("uri", &self.redacted_uri())
            .field("require_tls", &self.require_tls)
            .field("allow_invalid_certs", &self.allow_invalid_certs)
            .field("connect_timeout", &self.connect_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl StoreConfig {
    /// Required:
    /// - `STORE_URI`
    ///
    /// Optional:
    /// - `STORE_REQUIRE_TLS` (default: true)
    /// - `STORE_ALLOW_INVALID_CERTS` (default: false)
    /// - `STORE_CONNECT_TIMEOUT_MS` (default: 10000)
    /// - `STORE_CONNECT_RETRIES` (default: 3, 0 disables retry)
    /// - `STORE_RETRY_INITIAL_MS` (default: 200)
    /// - `STORE_RETRY_MAX_MS` (default: 5000)
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, StoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let uri = lookup("STORE_URI")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                StoreError::Config("STORE_URI environment variable is required".to_string())
            })?;

        let require_tls = lookup("STORE_REQUIRE_TLS")
            .and_then(|s| parse_bool(&s))
            .unwrap_or(true);

        let allow_invalid_certs = lookup("STORE_ALLOW_INVALID_CERTS")
            .and_then(|s| parse_bool(&s))
            .unwrap_or(false);

        let connect_timeout = lookup("STORE_CONNECT_TIMEOUT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(10_000));

        let max_retries = lookup("STORE_CONNECT_RETRIES")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(3);

        let initial_backoff = lookup("STORE_RETRY_INITIAL_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(200));

        let max_backoff = lookup("STORE_RETRY_MAX_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(5_000));

        let config = Self {
            uri,
            require_tls,
            allow_invalid_certs,
            connect_timeout,
            retry: RetryPolicy {
                max_retries,
                initial_backoff,
                max_backoff,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn kind(&self) -> Option<StoreKind> {
        StoreKind::from_uri(&self.uri)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        match self.kind() {
            Some(StoreKind::Redis) => {
                if self.require_tls && !self.uri.starts_with("rediss://") {
                    return Err(StoreError::Config(format!(
                        "TLS is required but {} is not a rediss:// URI (set STORE_REQUIRE_TLS=false for local development)",
                        redact_uri(&self.uri)
                    )));
                }
            }
            Some(StoreKind::Mongo) => {
                let lower = self.uri.to_ascii_lowercase();
                if self.require_tls && (lower.contains("tls=false") || lower.contains("ssl=false")) {
                    return Err(StoreError::Config(format!(
                        "TLS is required but {} disables it (set STORE_REQUIRE_TLS=false for local development)",
                        redact_uri(&self.uri)
                    )));
                }
            }
            None => {
                return Err(StoreError::Config(format!(
                    "unsupported store URI scheme: {} (expected mongodb://, mongodb+srv://, redis:// or rediss://)",
                    redact_uri(&self.uri)
                )));
            }
        }
        Ok(())
    }

    /// The URI handed to the driver, with TLS settings folded in: `tls` and
    /// `tlsAllowInvalidCertificates` options for MongoDB, the `#insecure` fragment for
    /// Redis.
    pub fn connection_uri(&self) -> String {
        match self.kind() {
            Some(StoreKind::Mongo) => {
                let mut uri = self.uri.clone();
                if self.require_tls {
                    uri = with_uri_option(&uri, "tls", "true");
                }
                if self.allow_invalid_certs {
                    uri = with_uri_option(&uri, "tlsAllowInvalidCertificates", "true");
                }
                uri
            }
            Some(StoreKind::Redis)
                if self.allow_invalid_certs
                    && self.uri.starts_with("rediss://")
                    && !self.uri.contains('#') =>
            {
                format!("{}#insecure", self.uri)
            }
            _ => self.uri.clone(),
        }
    }

    pub fn redacted_uri(&self) -> String {
        redact_uri(&self.uri)
    }
}

/// Mask the userinfo part (`user:password@` or `token@`) so a URI is safe to log.
pub fn redact_uri(uri: &str) -> String {
    CREDENTIALS_RE.replace(uri, "//***:***@").into_owned()
}

/// Append `key=value` to a MongoDB URI's options unless the key is already set.
fn with_uri_option(uri: &str, key: &str, value: &str) -> String {
    let needle = format!("{}=", key.to_ascii_lowercase());
    if uri.to_ascii_lowercase().contains(&needle) {
        return uri.to_string();
    }

    let hosts_start = uri.find("://").map(|i| i + 3).unwrap_or(0);
    let (base, query) = match uri.find('?') {
        Some(i) => (&uri[..i], &uri[i + 1..]),
        None => (uri, ""),
    };
    let mut base = base.to_string();
    // Options must follow a `/`, even when no database is named.
    if !base[hosts_start..].contains('/') {
        base.push('/');
    }
    if query.is_empty() {
        format!("{base}?{key}={value}")
    } else {
        format!("{base}?{query}&{key}={value}")
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
