use thiserror::Error;

#[derive(Error, Debug)]
pub enum HsaError {
    #[error("invalid character '{ch}' in cube string \"{input}\"")]
    InvalidCubeChar { ch: char, input: String },

    #[error("malformed cube string \"{0}\": groups must be exactly 8 characters")]
    MalformedCube(String),

    #[error("header space length mismatch: {a} vs {b}")]
    LengthMismatch { a: usize, b: usize },

    #[error("switch index {0} out of range")]
    SwitchOutOfRange(usize),

    #[error("port {0} has no entry in the port table")]
    UnknownPort(u32),

    #[error("dependency on rule {dep_rule} in rule {rule} does not precede it within its port group; priority encoding requires higher-priority rules to come first")]
    DependencyOrder { rule: u32, dep_rule: u32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error at {file}:{line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    #[error("missing stages file for network {0}")]
    MissingStages(String),

    #[error("binary format error: {0}")]
    Format(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HsaError>;
