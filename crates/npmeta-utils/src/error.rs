use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum PathError {
    #[error("Path is empty")]
    #[diagnostic(code(npmeta_utils::path::empty))]
    Empty,

    #[error("Failed to get current directory: {source}")]
    #[diagnostic(code(npmeta_utils::path::current_dir))]
    CurrentDir {
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable `{var}` not set in `{input}`")]
    #[diagnostic(
        code(npmeta_utils::path::missing_env_var),
        help("Export `{var}` or use an absolute path")
    )]
    MissingEnvVar { var: String, input: String },

    #[error("Unclosed variable expression starting at `{input}`")]
    #[diagnostic(code(npmeta_utils::path::unclosed_variable))]
    UnclosedVariable { input: String },
}

#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum LockError {
    #[error("Timed out waiting for the lock on `{name}`")]
    #[diagnostic(
        code(npmeta_utils::lock::timeout),
        help("Another ingestion of `{name}` is still running; retry later or raise `ingest_timeout`")
    )]
    Timeout { name: String },
}

pub type PathResult<T> = std::result::Result<T, PathError>;
pub type LockResult<T> = std::result::Result<T, LockError>;
