use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid validator seed: {0}")]
    BadSeed(String),

    #[error("logging setup error: {0}")]
    Logging(String),

    #[error("consensus error: {0}")]
    Consensus(#[from] crest_consensus::ConsensusError),
}
