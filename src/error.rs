use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatekeeperError>;

#[derive(Error, Debug)]
pub enum GatekeeperError {
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("Failed to load rules from {source_name}: {message}")]
    Load {
        source_name: String,
        message: String,
    },

    #[error("Rule error ({rule_id}): {message}")]
    Rule { rule_id: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HCL error: {0}")]
    Hcl(#[from] hcl::Error),
}

impl GatekeeperError {
    pub fn exit_code(&self) -> i32 {
        2
    }

    pub(crate) fn rule(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rule {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }
}
