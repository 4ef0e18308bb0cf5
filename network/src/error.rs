use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },

    #[error("outbound channel closed")]
    ChannelClosed,
}
