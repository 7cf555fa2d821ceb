use database::{DatabaseError, ErrorKind};
use scoring::PolicyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeeperError {
    #[error(transparent)]
    Store(#[from] DatabaseError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeeperError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeeperError::Store(e) => e.kind(),
            KeeperError::Policy(_) | KeeperError::Input(_) | KeeperError::Config(_) => {
                ErrorKind::InvalidInput
            }
            KeeperError::Io(_) => ErrorKind::StorageFailure,
        }
    }
}

impl From<serde_yaml::Error> for KeeperError {
    fn from(e: serde_yaml::Error) -> Self {
        KeeperError::Config(e.to_string())
    }
}
