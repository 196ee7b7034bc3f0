use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("node is no longer part of the document")]
    Detached,

    #[error("markup produced no element: {0}")]
    EmptyMarkup(String),

    /// An exception thrown by a browser DOM call
    #[error("DOM call failed: {0}")]
    Host(String),
}
