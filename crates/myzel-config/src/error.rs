use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("User configuration directory could not be determined")]
    ConfigDirNotFound,

    #[error(
        "No manifest found. Looked for:\n\
        - MYZEL_MANIFEST environment variable\n\
        - current directory: myzel.local.yaml, myzel.yaml, .myzel.yaml"
    )]
    ManifestNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
