pub type GloResult<T> = Result<T, GloError>;

#[derive(thiserror::Error, Debug)]
pub enum GloError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("resolution error: {0}")]
    Resolution(String),

    #[error("limit error: {0}")]
    Limit(String),

    #[error("format error: {0}")]
    Format(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GloError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    pub fn limit(msg: impl Into<String>) -> Self {
        Self::Limit(msg.into())
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Prefix the message with a source location, keeping the error category.
    pub fn at_line(self, line_no: usize, text: &str) -> Self {
        let ctx = |msg: String| format!("line {line_no}: '{}': {msg}", text.trim());
        match self {
            Self::Validation(m) => Self::Validation(ctx(m)),
            Self::Resolution(m) => Self::Resolution(ctx(m)),
            Self::Limit(m) => Self::Limit(ctx(m)),
            Self::Format(m) => Self::Format(ctx(m)),
            Self::Other(e) => Self::Other(e.context(format!("line {line_no}"))),
        }
    }
}
