//! Error type for shared goon functionality

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Reading a config or log file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file unparsable or holding out-of-range values
    #[error("Configuration error: {0}")]
    Config(String),
}
