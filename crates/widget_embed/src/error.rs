use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbedError {
    #[error("Root element '{0}' not found")]
    RootNotFound(String),

    #[error("Host page error: {0}")]
    Host(String),
}
