use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum FetchError {
    #[error("Tarball not found: {locator}")]
    #[diagnostic(
        code(npmeta_dl::not_found),
        help("Check that the locator points at an existing tarball")
    )]
    NotFound { locator: String },

    #[error("HTTP {status}: {locator}")]
    #[diagnostic(code(npmeta_dl::http_error))]
    HttpError { status: u16, locator: String },

    #[error("Failed to fetch {locator}")]
    #[diagnostic(
        code(npmeta_dl::network),
        help("Check your network connection or try again later")
    )]
    Network {
        locator: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("Timed out fetching {locator}")]
    #[diagnostic(
        code(npmeta_dl::timeout),
        help("Raise `ingest_timeout` if the tarball host is slow")
    )]
    Timeout { locator: String },

    #[error("Tarball at {locator} exceeds the {limit} byte limit")]
    #[diagnostic(
        code(npmeta_dl::too_large),
        help("Raise `max_tarball_size` to accept larger tarballs")
    )]
    TooLarge { locator: String, limit: u64 },

    #[error("Error while reading {locator}")]
    #[diagnostic(code(npmeta_dl::io))]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported locator `{locator}`: {reason}")]
    #[diagnostic(
        code(npmeta_dl::unsupported_locator),
        help("Use an http(s):// or file:// URL, an absolute path, or a key under the tarball directory")
    )]
    UnsupportedLocator { locator: String, reason: String },

    #[error("Fetch task failed: {0}")]
    #[diagnostic(code(npmeta_dl::join))]
    Join(String),
}

impl FetchError {
    /// Whether the locator could not be resolved to any tarball.
    ///
    /// Every other variant is a transient or environmental failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }

    pub(crate) fn from_ureq(locator: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => {
                FetchError::Timeout {
                    locator: locator.to_string(),
                }
            }
            ureq::Error::BodyExceedsLimit(limit) => {
                FetchError::TooLarge {
                    locator: locator.to_string(),
                    limit,
                }
            }
            err => {
                FetchError::Network {
                    locator: locator.to_string(),
                    source: Box::new(err),
                }
            }
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;
