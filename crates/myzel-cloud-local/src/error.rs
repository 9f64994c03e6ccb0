//! Local provider error types

use myzel_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocalError {
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Bucket is not empty: {0}")]
    BucketNotEmpty(String),

    #[error("Invalid bucket name: {0:?}")]
    InvalidBucketName(String),

    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),

    #[error("Malformed technical id: {0}")]
    InvalidTechnicalId(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LocalError>;

impl From<LocalError> for CloudError {
    fn from(err: LocalError) -> Self {
        match err {
            LocalError::IoError(e) => CloudError::Io(e),
            LocalError::BucketNotFound(name) => CloudError::ResourceNotFound(name),
            LocalError::InvalidBucketName(_)
            | LocalError::InvalidKey(_)
            | LocalError::InvalidTechnicalId(_) => CloudError::InvalidConfig(err.to_string()),
            other => CloudError::Provider(other.into()),
        }
    }
}
