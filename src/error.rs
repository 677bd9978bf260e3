use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The album holds something the platform won't accept in a media group.
    /// Nothing has been sent when this is returned.
    #[error("albums containing {kind} are not supported")]
    UnsupportedAlbumMedia { kind: &'static str },

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl RelayError {
    /// Transport failures may succeed when tried again; bad content never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RelayError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
