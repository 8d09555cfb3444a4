use crate::checker::CheckResult;
use crate::rules::{Severity, Violation};

/// Render violations as console text, grouped by severity then location.
pub fn render(result: &CheckResult) -> String {
    let mut output = String::new();

    if result.violations.is_empty() {
        output.push_str("\n  No violations found.\n");
        output.push_str(&summary_line(result));
        return output;
    }

    let mut sorted: Vec<&Violation> = result.violations.iter().collect();
    sorted.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.location.cmp(&b.location))
    });

    output.push_str(&format!(
        "\n  {} violation(s) found:\n\n",
        result.violations.len()
    ));

    for violation in sorted {
        let severity_tag = match violation.severity {
            Severity::Error => "[ERROR]  ",
            Severity::Warning => "[WARNING]",
            Severity::Info => "[INFO]   ",
        };
        let marker = if violation.indeterminate { " (indeterminate)" } else { "" };

        output.push_str(&format!(
            "  {} {} {}{}\n",
            severity_tag, violation.rule_id, violation.message, marker
        ));
        output.push_str(&format!(
            "            at {}.{} ({}:{})\n",
            violation.resource_type,
            violation.resource_name,
            violation.location.file.display(),
            violation.location.line
        ));
        if let Some(remediation) = &violation.remediation {
            output.push_str(&format!("            fix: {}\n", remediation));
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "  Errors: {}, warnings: {}, info: {}\n",
        result.count(Severity::Error),
        result.count(Severity::Warning),
        result.count(Severity::Info),
    ));
    output.push_str(&summary_line(result));
    output
}

fn summary_line(result: &CheckResult) -> String {
    format!(
        "  Scanned {} file(s), {} resource(s), {} rule(s) in {} ms\n\n",
        result.files_scanned,
        result.resources_found,
        result.rules_evaluated,
        result.duration.as_millis()
    )
}
