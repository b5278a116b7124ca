//! WebSocket endpoint resolution
//!
//! The base address is picked in this order:
//! 1. configured `ws://` / `wss://` base, used as is
//! 2. configured `http://` / `https://` base, scheme rewritten to ws/wss
//! 3. configured bare `host[:port]`, scheme taken from the hosting page
//! 4. origin of the REST API base, `http→ws` and `https→wss`
//! 5. the hosting page's own origin
//!
//! Resolution never fails; malformed values fall through to the next rule.

use std::fmt;

use url::{Position, Url};

use crate::config::SyncConfig;

/// Path of the realtime endpoint below the base address
pub const WS_PATH: &str = "/api/ws";

const DEFAULT_PAGE_ORIGIN: &str = "http://localhost";

/// Which rule produced the base address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseSource {
    /// Explicit WebSocket base in any accepted form
    Configured,
    /// Derived from the REST API base
    RestApi,
    /// Hosting page origin
    PageOrigin,
}

impl fmt::Display for BaseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseSource::Configured => write!(f, "configured"),
            BaseSource::RestApi => write!(f, "rest_api"),
            BaseSource::PageOrigin => write!(f, "page_origin"),
        }
    }
}

/// A resolved WebSocket base address without a trailing slash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBase {
    pub url: String,
    pub source: BaseSource,
}

/// Scheme and authority of the hosting page
struct PageOrigin {
    secure: bool,
    authority: String,
}

impl PageOrigin {
    fn from_config(page_origin: Option<&str>) -> Self {
        page_origin
            .and_then(|raw| Url::parse(raw).ok())
            .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .map(|url| Self {
                secure: url.scheme() == "https",
                authority: url[Position::BeforeHost..Position::AfterPort].to_string(),
            })
            .unwrap_or_else(|| Self {
                secure: false,
                authority: DEFAULT_PAGE_ORIGIN.trim_start_matches("http://").to_string(),
            })
    }

    fn ws_scheme(&self) -> &'static str {
        if self.secure {
            "wss"
        } else {
            "ws"
        }
    }

    fn ws_base(&self) -> String {
        format!("{}://{}", self.ws_scheme(), self.authority)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn trim_trailing_slash(value: &str) -> &str {
    value.trim_end_matches('/')
}

fn ws_scheme_for(http_scheme: &str) -> &'static str {
    if http_scheme == "https" {
        "wss"
    } else {
        "ws"
    }
}

/// Normalize an explicitly configured WebSocket base
fn from_configured(raw: &str, page: &PageOrigin) -> String {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "ws" | "wss") => trim_trailing_slash(raw).to_string(),
        Ok(mut url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            let scheme = ws_scheme_for(url.scheme());
            if url.set_scheme(scheme).is_ok() {
                return trim_trailing_slash(url.as_str()).to_string();
            }
            format!("{}://{}", scheme, &url[Position::BeforeHost..])
                .trim_end_matches('/')
                .to_string()
        }
        // `localhost:9000` parses with scheme "localhost"; treat it as a host
        _ => {
            let host = trim_trailing_slash(raw.trim_start_matches("//"));
            format!("{}://{}", page.ws_scheme(), host)
        }
    }
}

/// Derive a WebSocket base from the REST base origin
fn from_rest_api(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return None;
    }
    Some(format!(
        "{}://{}",
        ws_scheme_for(url.scheme()),
        &url[Position::BeforeHost..Position::AfterPort]
    ))
}

/// Resolve the WebSocket base address for a config
pub fn resolve_base(config: &SyncConfig) -> ResolvedBase {
    let page = PageOrigin::from_config(config.page_origin.as_deref());

    if let Some(raw) = non_empty(config.ws_url.as_deref()) {
        return ResolvedBase {
            url: from_configured(raw, &page),
            source: BaseSource::Configured,
        };
    }

    if let Some(url) = non_empty(config.api_url.as_deref()).and_then(from_rest_api) {
        return ResolvedBase {
            url,
            source: BaseSource::RestApi,
        };
    }

    ResolvedBase {
        url: page.ws_base(),
        source: BaseSource::PageOrigin,
    }
}

/// Full connection URL: `<base>/api/ws?project_id=..&env_id=..[&token=..]`
///
/// The token travels as a query parameter because browser WebSocket clients
/// cannot set headers on the upgrade request.
pub fn connection_url(config: &SyncConfig) -> String {
    let base = resolve_base(config);
    let mut url = format!(
        "{}{}?project_id={}&env_id={}",
        base.url,
        WS_PATH,
        urlencoding::encode(&config.project_id),
        config.env_id
    );
    if let Some(token) = non_empty(config.token.as_deref()) {
        url.push_str("&token=");
        url.push_str(&urlencoding::encode(token));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(ws_url: Option<&str>, api_url: Option<&str>, page: Option<&str>) -> SyncConfig {
        SyncConfig {
            ws_url: ws_url.map(str::to_string),
            api_url: api_url.map(str::to_string),
            page_origin: page.map(str::to_string),
            ..SyncConfig::new("P1", 3)
        }
    }

    #[test]
    fn test_ws_base_used_verbatim() {
        let base = resolve_base(&config_with(Some("wss://rt.example.com/socket/"), None, None));
        assert_eq!(base.url, "wss://rt.example.com/socket");
        assert_eq!(base.source, BaseSource::Configured);
    }

    #[test]
    fn test_https_base_rewritten_to_wss() {
        let base = resolve_base(&config_with(Some("https://api.example.com"), None, None));
        assert_eq!(base.url, "wss://api.example.com");

        let base = resolve_base(&config_with(Some("http://api.example.com:8080/rt/"), None, None));
        assert_eq!(base.url, "ws://api.example.com:8080/rt");
    }

    #[test]
    fn test_bare_host_follows_page_scheme() {
        let secure = config_with(Some("localhost:9000"), None, Some("https://admin.example.com"));
        assert_eq!(resolve_base(&secure).url, "wss://localhost:9000");

        let plain = config_with(Some("localhost:9000"), None, Some("http://admin.example.com"));
        assert_eq!(resolve_base(&plain).url, "ws://localhost:9000");

        let ip = config_with(Some("127.0.0.1:9000"), None, None);
        assert_eq!(resolve_base(&ip).url, "ws://127.0.0.1:9000");
    }

    #[test]
    fn test_derived_from_rest_api_origin() {
        let base = resolve_base(&config_with(None, Some("https://api.example.com"), None));
        assert_eq!(base.url, "wss://api.example.com");
        assert_eq!(base.source, BaseSource::RestApi);

        let base = resolve_base(&config_with(None, Some("http://10.0.0.5:8080/api/"), None));
        assert_eq!(base.url, "ws://10.0.0.5:8080");
    }

    #[test]
    fn test_relative_rest_api_falls_back_to_page() {
        let base = resolve_base(&config_with(None, Some("/api"), Some("https://admin.example.com:8443")));
        assert_eq!(base.url, "wss://admin.example.com:8443");
        assert_eq!(base.source, BaseSource::PageOrigin);
    }

    #[test]
    fn test_nothing_configured_uses_default_page() {
        let base = resolve_base(&config_with(None, None, None));
        assert_eq!(base.url, "ws://localhost");
        assert_eq!(base.source, BaseSource::PageOrigin);
    }

    #[test]
    fn test_blank_ws_url_is_ignored() {
        let base = resolve_base(&config_with(Some("  "), Some("https://api.example.com"), None));
        assert_eq!(base.source, BaseSource::RestApi);
    }

    #[test]
    fn test_connection_url_with_token() {
        let mut config = config_with(Some("wss://rt.example.com"), None, None);
        config.token = Some("abc+/=".to_string());
        assert_eq!(
            connection_url(&config),
            "wss://rt.example.com/api/ws?project_id=P1&env_id=3&token=abc%2B%2F%3D"
        );
    }

    #[test]
    fn test_connection_url_without_token() {
        let config = config_with(None, Some("https://api.example.com"), None);
        assert_eq!(
            connection_url(&config),
            "wss://api.example.com/api/ws?project_id=P1&env_id=3"
        );
    }
}
