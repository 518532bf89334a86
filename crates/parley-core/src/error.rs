use parley_protocol::ProtocolError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::session::SessionError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Logging setup failed: {0}")]
    Logging(String),
}
