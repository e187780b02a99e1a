use thiserror::Error;

/// A raw document that does not carry the shape a page needs.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("document {document} is missing field `{field}`")]
    MissingField { document: String, field: &'static str },

    #[error("document {document} has an invalid `{field}`: {source}")]
    InvalidField {
        document: String,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("content API did not advertise a master ref")]
    MissingMasterRef,

    #[error(transparent)]
    Malformed(#[from] NormalizeError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}
