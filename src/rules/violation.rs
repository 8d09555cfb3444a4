use serde::{Deserialize, Deserializer, Serialize};

use crate::ir::SourceLocation;

/// A rule that failed against one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule identifier (e.g., "S3_001").
    pub rule_id: String,
    /// Human-readable rule name.
    pub rule_name: String,
    pub severity: Severity,
    /// Resource type the rule matched (e.g., "aws_s3_bucket").
    pub resource_type: String,
    pub resource_name: String,
    pub location: SourceLocation,
    /// Rendered rule message.
    pub message: String,
    /// Suggested remediation.
    pub remediation: Option<String>,
    /// Raised in strict mode because the outcome could not be determined.
    #[serde(default)]
    pub indeterminate: bool,
}

/// Rule severity. Ordered from most to least severe, so `Error < Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    /// Whether this severity is reported under a `threshold` minimum.
    pub fn meets(self, threshold: Severity) -> bool {
        self <= threshold
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::from_str_lenient(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown severity `{raw}` (expected error, warning or info)"
            ))
        })
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_most_severe() {
        assert!(Severity::Error < Severity::Warning);
        assert!(Severity::Warning < Severity::Info);
    }

    #[test]
    fn lenient_parsing_accepts_warn_alias() {
        assert_eq!(Severity::from_str_lenient("WARN"), Some(Severity::Warning));
        assert_eq!(Severity::from_str_lenient("Error"), Some(Severity::Error));
        assert_eq!(Severity::from_str_lenient(" info "), Some(Severity::Info));
        assert_eq!(Severity::from_str_lenient("critical"), None);
    }

    #[test]
    fn meets_threshold() {
        assert!(Severity::Error.meets(Severity::Warning));
        assert!(Severity::Warning.meets(Severity::Warning));
        assert!(!Severity::Info.meets(Severity::Warning));
    }
}
