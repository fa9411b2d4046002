use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthgpError {
    #[error("Grammar error: {0}")]
    Grammar(String),

    #[error("Exhausted depth budget: no production of {symbol} fits in depth {budget} (minimum {required:?})")]
    ExhaustedBudget {
        symbol: String,
        budget: usize,
        required: Option<usize>,
    },

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Fitness shape mismatch: expected {expected} objectives, got {actual}")]
    FitnessShape { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Invalid tree: {0}")]
    InvalidTree(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config source error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl SynthgpError {
    /// Wraps a failure raised by a user fitness function, keeping its context chain.
    pub fn evaluation(err: anyhow::Error) -> Self {
        SynthgpError::Evaluation(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, SynthgpError>;
