pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load {what}: {message}")]
    Load { what: &'static str, message: String },

    #[error("multiple root candidates found: {}", candidates.join(", "))]
    MultipleRoots { candidates: Vec<String> },

    #[error("invalid diagram index: {message}")]
    InvalidIndex { message: String },

    #[error("invalid config: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    pub(crate) fn load(what: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Load {
            what,
            message: err.to_string(),
        }
    }
}
