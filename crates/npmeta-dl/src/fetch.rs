use std::{
    path::{Component, Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use npmeta_utils::time::Deadline;
use tracing::{debug, trace};
use ureq::{
    http::{HeaderMap, StatusCode},
    Agent,
};
use url::Url;

use crate::{
    error::{FetchError, FetchResult},
    http_client::{apply_headers, ClientConfig},
    traits::Fetcher,
};

/// How a locator is resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocatorKind {
    /// `http://` or `https://` URL.
    Remote,
    /// `file://` URL, absolute path, or key relative to the tarball root.
    Local,
}

impl LocatorKind {
    pub fn classify(locator: &str) -> FetchResult<Self> {
        match Url::parse(locator) {
            Ok(url) => {
                match url.scheme() {
                    "http" | "https" => Ok(LocatorKind::Remote),
                    "file" => Ok(LocatorKind::Local),
                    scheme => {
                        Err(FetchError::UnsupportedLocator {
                            locator: locator.to_string(),
                            reason: format!("scheme `{scheme}` is not supported"),
                        })
                    }
                }
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(LocatorKind::Local),
            Err(err) => {
                Err(FetchError::UnsupportedLocator {
                    locator: locator.to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }
}

/// Fetches tarballs over HTTP(S).
#[derive(Clone)]
pub struct HttpFetcher {
    agent: Agent,
    headers: Option<HeaderMap>,
    timeout: Option<Duration>,
    max_body_size: u64,
}

impl HttpFetcher {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            agent: config.build(),
            headers: config.headers.clone(),
            timeout: config.timeout,
            max_body_size: config.max_body_size,
        }
    }

    fn fetch_blocking(&self, locator: &str, timeout: Option<Duration>) -> FetchResult<Vec<u8>> {
        let req = apply_headers(self.agent.get(locator), &self.headers);
        let resp = req
            .config()
            .timeout_global(timeout)
            .build()
            .call()
            .map_err(|err| FetchError::from_ureq(locator, err))?;

        check_status(resp.status(), locator)?;

        let mut body = resp.into_body();
        body.with_config()
            .limit(self.max_body_size)
            .read_to_vec()
            .map_err(|err| FetchError::from_ureq(locator, err))
    }
}

/// The tighter of the client's own timeout and what is left of the deadline.
fn request_timeout(cap: Option<Duration>, remaining: Option<Duration>) -> Option<Duration> {
    match (cap, remaining) {
        (Some(cap), Some(remaining)) => Some(cap.min(remaining)),
        (cap, remaining) => cap.or(remaining),
    }
}

/// Maps a response status onto the fetch outcome.
///
/// `404` is the only status reported as not found; anything else outside
/// `2xx` is an HTTP error.
fn check_status(status: StatusCode, locator: &str) -> FetchResult<()> {
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound {
            locator: locator.to_string(),
        });
    }
    if !status.is_success() {
        return Err(FetchError::HttpError {
            status: status.as_u16(),
            locator: locator.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, locator: &str, deadline: Deadline) -> FetchResult<Vec<u8>> {
        if deadline.is_expired() {
            return Err(FetchError::Timeout {
                locator: locator.to_string(),
            });
        }

        debug!(locator, "fetching remote tarball");

        let this = self.clone();
        let owned = locator.to_string();
        let timeout = request_timeout(self.timeout, deadline.remaining());
        tokio::task::spawn_blocking(move || this.fetch_blocking(&owned, timeout))
            .await
            .map_err(|err| FetchError::Join(err.to_string()))?
    }
}

/// Reads tarballs from the local filesystem.
///
/// Relative keys are resolved against `root`; keys that would escape it are
/// rejected.
#[derive(Clone, Debug, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
        }
    }

    pub fn resolve(&self, locator: &str) -> FetchResult<PathBuf> {
        let unsupported = |reason: &str| {
            FetchError::UnsupportedLocator {
                locator: locator.to_string(),
                reason: reason.to_string(),
            }
        };

        if locator.starts_with("file:") {
            let url = Url::parse(locator).map_err(|err| unsupported(&err.to_string()))?;
            return url
                .to_file_path()
                .map_err(|_| unsupported("file URL does not name a local path"));
        }

        let path = Path::new(locator);
        if path.as_os_str().is_empty() {
            return Err(unsupported("locator is empty"));
        }
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }

        let root = self
            .root
            .as_ref()
            .ok_or_else(|| unsupported("relative key given but no tarball directory configured"))?;

        if path
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
        {
            return Err(unsupported("relative key escapes the tarball directory"));
        }

        Ok(root.join(path))
    }
}

#[async_trait]
impl Fetcher for FileFetcher {
    async fn fetch(&self, locator: &str, deadline: Deadline) -> FetchResult<Vec<u8>> {
        let path = self.resolve(locator)?;
        trace!(locator, path = %path.display(), "reading local tarball");

        let owned = locator.to_string();
        let read = tokio::task::spawn_blocking(move || std::fs::read(&path));

        let result = deadline.run(read).await.map_err(|_| {
            FetchError::Timeout {
                locator: owned.clone(),
            }
        })?;

        match result.map_err(|err| FetchError::Join(err.to_string()))? {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound {
                    locator: owned,
                })
            }
            Err(source) => {
                Err(FetchError::Io {
                    locator: owned,
                    source,
                })
            }
        }
    }
}

/// Dispatches each locator to the remote or local fetcher.
#[derive(Clone)]
pub struct LocatorFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl LocatorFetcher {
    pub fn new(http: HttpFetcher, file: FileFetcher) -> Self {
        Self {
            http,
            file,
        }
    }
}

#[async_trait]
impl Fetcher for LocatorFetcher {
    async fn fetch(&self, locator: &str, deadline: Deadline) -> FetchResult<Vec<u8>> {
        match LocatorKind::classify(locator)? {
            LocatorKind::Remote => self.http.fetch(locator, deadline).await,
            LocatorKind::Local => self.file.fetch(locator, deadline).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread,
    };

    use super::*;

    fn response(status: &str, body: &[u8]) -> Vec<u8> {
        let mut raw = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        raw.extend_from_slice(body);
        raw
    }

    /// Answers a single request with `raw`, or holds the connection open
    /// without answering when `raw` is `None`. Returns the tarball URL.
    fn serve_once(raw: Option<Vec<u8>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => return,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            match raw {
                Some(raw) => {
                    let _ = stream.write_all(&raw);
                }
                None => thread::sleep(Duration::from_secs(5)),
            }
        });
        format!("http://{addr}/foo/-/foo-1.0.0.tgz")
    }

    fn http_fetcher(max_body_size: u64, timeout: Option<Duration>) -> HttpFetcher {
        HttpFetcher::new(&ClientConfig {
            max_body_size,
            timeout,
            ..ClientConfig::default()
        })
    }

    #[test]
    fn test_classify_locators() {
        assert_eq!(
            LocatorKind::classify("https://registry.local/foo/-/foo-1.0.0.tgz").unwrap(),
            LocatorKind::Remote
        );
        assert_eq!(
            LocatorKind::classify("http://localhost:8080/foo.tgz").unwrap(),
            LocatorKind::Remote
        );
        assert_eq!(
            LocatorKind::classify("file:///srv/tarballs/foo.tgz").unwrap(),
            LocatorKind::Local
        );
        assert_eq!(
            LocatorKind::classify("/srv/tarballs/foo.tgz").unwrap(),
            LocatorKind::Local
        );
        assert_eq!(
            LocatorKind::classify("foo/foo-1.0.0.tgz").unwrap(),
            LocatorKind::Local
        );
    }

    #[test]
    fn test_classify_unsupported_scheme() {
        let err = LocatorKind::classify("ftp://mirror/foo.tgz").unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedLocator { .. }));
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(StatusCode::OK, "l").is_ok());
        assert!(check_status(StatusCode::NOT_FOUND, "l")
            .unwrap_err()
            .is_not_found());
        assert!(matches!(
            check_status(StatusCode::INTERNAL_SERVER_ERROR, "l"),
            Err(FetchError::HttpError { status: 500, .. })
        ));
        assert!(matches!(
            check_status(StatusCode::FOUND, "l"),
            Err(FetchError::HttpError { status: 302, .. })
        ));
    }

    #[tokio::test]
    async fn test_http_fetch_expired_deadline() {
        let fetcher = HttpFetcher::new(&ClientConfig::default());
        let err = fetcher
            .fetch("https://registry.local/foo.tgz", Deadline::after(Duration::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }

    #[test]
    fn test_request_timeout() {
        let secs = Duration::from_secs;
        assert_eq!(request_timeout(None, None), None);
        assert_eq!(request_timeout(Some(secs(30)), None), Some(secs(30)));
        assert_eq!(request_timeout(None, Some(secs(5))), Some(secs(5)));
        assert_eq!(request_timeout(Some(secs(30)), Some(secs(5))), Some(secs(5)));
        assert_eq!(request_timeout(Some(secs(2)), Some(secs(5))), Some(secs(2)));
    }

    #[tokio::test]
    async fn test_http_fetch_returns_exact_body() {
        let body = [0x1f, 0x8b, b'b', b'y', b't', b'e', b's', 0x00];
        let url = serve_once(Some(response("200 OK", &body)));

        let bytes = http_fetcher(1024, None)
            .fetch(&url, Deadline::never())
            .await
            .unwrap();
        assert_eq!(bytes, body);
    }

    #[tokio::test]
    async fn test_http_fetch_not_found() {
        let url = serve_once(Some(response("404 Not Found", b"missing")));

        let err = http_fetcher(1024, None)
            .fetch(&url, Deadline::never())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_http_fetch_server_error() {
        let url = serve_once(Some(response("503 Service Unavailable", b"")));

        let err = http_fetcher(1024, None)
            .fetch(&url, Deadline::never())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpError { status: 503, .. }));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_http_fetch_body_over_limit() {
        let url = serve_once(Some(response("200 OK", b"0123456789")));

        let err = http_fetcher(4, None)
            .fetch(&url, Deadline::never())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 4, .. }));
    }

    #[tokio::test]
    async fn test_http_fetch_connection_refused() {
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let err = http_fetcher(1024, None)
            .fetch(&format!("http://{addr}/foo.tgz"), Deadline::never())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_http_fetch_client_timeout_caps_deadline() {
        let url = serve_once(None);

        let err = http_fetcher(1024, Some(Duration::from_millis(200)))
            .fetch(&url, Deadline::never())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }

    #[test]
    fn test_file_resolve() {
        let fetcher = FileFetcher::new(Some(PathBuf::from("/srv/tarballs")));

        assert_eq!(
            fetcher.resolve("foo/foo-1.0.0.tgz").unwrap(),
            PathBuf::from("/srv/tarballs/foo/foo-1.0.0.tgz")
        );
        assert_eq!(
            fetcher.resolve("/elsewhere/bar.tgz").unwrap(),
            PathBuf::from("/elsewhere/bar.tgz")
        );
        assert_eq!(
            fetcher.resolve("file:///elsewhere/baz.tgz").unwrap(),
            PathBuf::from("/elsewhere/baz.tgz")
        );
    }

    #[test]
    fn test_file_resolve_rejects_escape_and_empty() {
        let fetcher = FileFetcher::new(Some(PathBuf::from("/srv/tarballs")));
        assert!(matches!(
            fetcher.resolve("../etc/passwd"),
            Err(FetchError::UnsupportedLocator { .. })
        ));
        assert!(matches!(
            fetcher.resolve(""),
            Err(FetchError::UnsupportedLocator { .. })
        ));
    }

    #[test]
    fn test_file_resolve_relative_without_root() {
        let fetcher = FileFetcher::default();
        assert!(matches!(
            fetcher.resolve("foo.tgz"),
            Err(FetchError::UnsupportedLocator { .. })
        ));
    }

    #[tokio::test]
    async fn test_file_fetch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo.tgz"), b"tarball-bytes").unwrap();

        let fetcher = FileFetcher::new(Some(dir.path().to_path_buf()));
        let bytes = fetcher.fetch("foo.tgz", Deadline::never()).await.unwrap();
        assert_eq!(bytes, b"tarball-bytes");

        let err = fetcher
            .fetch("missing.tgz", Deadline::never())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_locator_fetcher_dispatches_local() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bar.tgz");
        std::fs::write(&path, b"bar").unwrap();

        let fetcher = LocatorFetcher::new(
            HttpFetcher::new(&ClientConfig::default()),
            FileFetcher::default(),
        );
        let bytes = fetcher
            .fetch(path.to_str().unwrap(), Deadline::never())
            .await
            .unwrap();
        assert_eq!(bytes, b"bar");

        let err = fetcher
            .fetch("gopher://old/bar.tgz", Deadline::never())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedLocator { .. }));
    }
}
