use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::checker::CheckResult;
use crate::error::Result;
use crate::rules::{Severity, Violation};

#[derive(Serialize)]
struct JsonReport<'a> {
    violations: &'a [Violation],
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonSummary {
    files_scanned: usize,
    resources_found: usize,
    rules_evaluated: usize,
    errors: usize,
    warnings: usize,
    info: usize,
    duration_ms: u64,
    scanned_at: DateTime<Utc>,
}

/// Render a check result as a JSON report.
pub fn render(result: &CheckResult) -> Result<String> {
    let report = JsonReport {
        violations: &result.violations,
        summary: JsonSummary {
            files_scanned: result.files_scanned,
            resources_found: result.resources_found,
            rules_evaluated: result.rules_evaluated,
            errors: result.count(Severity::Error),
            warnings: result.count(Severity::Warning),
            info: result.count(Severity::Info),
            duration_ms: u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
            scanned_at: result.scanned_at,
        },
    };
    let json = serde_json::to_string_pretty(&report)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::SourceLocation;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn report_shape() {
        let result = CheckResult {
            violations: vec![Violation {
                rule_id: "S3_001".into(),
                rule_name: "S3 bucket encryption".into(),
                severity: Severity::Error,
                resource_type: "aws_s3_bucket".into(),
                resource_name: "logs".into(),
                location: SourceLocation {
                    file: PathBuf::from("main.tf"),
                    line: 2,
                    column: 1,
                },
                message: "no encryption".into(),
                remediation: None,
                indeterminate: false,
            }],
            files_scanned: 1,
            resources_found: 1,
            rules_evaluated: 15,
            duration: Duration::from_millis(12),
            scanned_at: Utc::now(),
        };

        let json: serde_json::Value = serde_json::from_str(&render(&result).unwrap()).unwrap();
        assert_eq!(json["violations"][0]["rule_id"], "S3_001");
        assert_eq!(json["violations"][0]["severity"], "error");
        assert_eq!(json["violations"][0]["location"]["line"], 2);
        assert_eq!(json["summary"]["errors"], 1);
        assert_eq!(json["summary"]["rules_evaluated"], 15);
        assert_eq!(json["summary"]["duration_ms"], 12);

        let back: Vec<Violation> =
            serde_json::from_value(json["violations"].clone()).unwrap();
        assert_eq!(back, result.violations);
    }
}
