use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("container daemon error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("build engine reported failure: {0}")]
    Build(String),

    #[error("{program} exited with code {code}:\n{output}")]
    CommandFailed {
        program: String,
        code: i32,
        output: String,
    },

    #[error("required CLI not found: {0}")]
    MissingCli(String),

    #[error("compose directory invalid: {0}")]
    InvalidComposeDir(String),
}
