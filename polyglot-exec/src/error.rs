use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Language \"{0}\" not supported")]
    UnsupportedLanguage(String),

    #[error("No language specified")]
    MissingLanguage,

    #[error("No code provided")]
    EmptySource,

    #[error("Source is {actual} bytes, limit is {limit} bytes")]
    SourceTooLarge { actual: usize, limit: usize },

    #[error("{0}")]
    ToolchainMissing(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("System error: {0}")]
    System(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
