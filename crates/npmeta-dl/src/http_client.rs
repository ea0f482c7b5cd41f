use std::time::Duration;

use ureq::{http::HeaderMap, Agent, Proxy, RequestBuilder};

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    pub headers: Option<HeaderMap>,
    pub proxy: Option<Proxy>,
    pub timeout: Option<Duration>,
    /// Upper bound on a response body, in bytes.
    pub max_body_size: u64,
}

impl Default for ClientConfig {
    /// Creates a default ClientConfig for tarball downloads.
    ///
    /// The default sets a user agent of `npmeta/<version>`, a 256 MiB body limit,
    /// and leaves proxy, headers, and timeout unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use npmeta_dl::http_client::ClientConfig;
    ///
    /// let cfg = ClientConfig::default();
    /// assert!(cfg.user_agent.as_deref().unwrap().starts_with("npmeta/"));
    /// assert!(cfg.proxy.is_none());
    /// assert!(cfg.timeout.is_none());
    /// ```
    fn default() -> Self {
        Self {
            user_agent: Some(format!("npmeta/{}", env!("CARGO_PKG_VERSION"))),
            headers: None,
            proxy: None,
            timeout: None,
            max_body_size: 256 * 1024 * 1024,
        }
    }
}

impl ClientConfig {
    /// Builds an HTTP `Agent` configured from this `ClientConfig`.
    ///
    /// Status codes are not turned into errors by the agent; callers inspect
    /// the status themselves so that `404` can be told apart from other
    /// failures.
    pub fn build(&self) -> Agent {
        let mut config = Agent::config_builder()
            .proxy(self.proxy.clone())
            .timeout_global(self.timeout)
            .http_status_as_error(false);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}

/// Apply headers from an optional `HeaderMap` to a `RequestBuilder`.
pub(crate) fn apply_headers<B>(
    mut req: RequestBuilder<B>,
    headers: &Option<HeaderMap>,
) -> RequestBuilder<B> {
    if let Some(headers) = headers {
        for (key, value) in headers.iter() {
            req = req.header(key, value);
        }
    }
    req
}

/// Parses `Name: value` pairs into a header map, skipping malformed entries.
///
/// # Examples
///
/// ```
/// use npmeta_dl::http_client::parse_headers;
///
/// let headers = parse_headers(&["X-Mirror: eu-1".to_string(), "broken".to_string()]);
/// assert_eq!(headers.len(), 1);
/// assert_eq!(headers["x-mirror"], "eu-1");
/// ```
pub fn parse_headers(raw: &[String]) -> HeaderMap {
    raw.iter()
        .filter_map(|header| {
            let (key, value) = header.split_once(':')?;
            Some((key.trim().parse().ok()?, value.trim().parse().ok()?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(
            config.user_agent,
            Some(format!("npmeta/{}", env!("CARGO_PKG_VERSION")))
        );
        assert!(config.proxy.is_none());
        assert!(config.headers.is_none());
        assert!(config.timeout.is_none());
        assert_eq!(config.max_body_size, 256 * 1024 * 1024);
    }

    #[test]
    fn test_client_config_build_with_timeout() {
        let config = ClientConfig {
            timeout: Some(Duration::from_secs(30)),
            ..ClientConfig::default()
        };
        let agent = config.build();
        let _ = agent.get("https://registry.local/foo.tgz");
    }

    #[test]
    fn test_apply_headers() {
        let agent = ClientConfig::default().build();
        let req = agent.get("https://registry.local/foo.tgz");
        let headers = parse_headers(&["Authorization: Bearer abc".to_string()]);
        assert_eq!(headers.len(), 1);
        let _ = apply_headers(req, &Some(headers));
    }

    #[test]
    fn test_parse_headers_skips_malformed() {
        let headers = parse_headers(&[
            "Accept: application/octet-stream".to_string(),
            "no-colon".to_string(),
            "Bad Name: x".to_string(),
        ]);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["accept"], "application/octet-stream");
    }
}
