//! Deterministic template file names and their collision candidates.

use auditstore_common::sanitize::{require_sanitized, sanitize_name, MAX_NAME_LEN};
use auditstore_common::Result;
use chrono::{DateTime, SecondsFormat, Utc};

/// Extension of every template record file.
pub const TEMPLATE_EXTENSION: &str = ".json";

/// `{name}_{version}` stem; just `{name}` when the version sanitizes to
/// nothing. An empty name is a validation error.
pub fn template_stem(name: &str, version: &str) -> Result<String> {
    let name = require_sanitized(name, MAX_NAME_LEN, "template name")?;
    let version = sanitize_name(version);
    if version.is_empty() {
        Ok(name)
    } else {
        Ok(format!("{name}_{version}"))
    }
}

/// `{sanitized name}_{sanitized version}.json`.
pub fn generate_file_name(name: &str, version: &str) -> Result<String> {
    Ok(format!("{}{}", template_stem(name, version)?, TEMPLATE_EXTENSION))
}

/// `stem.json`, `stem_1.json`, `stem_2.json`, ... (`limit` names in total).
pub fn candidate_names(stem: &str, limit: usize) -> impl Iterator<Item = String> + '_ {
    (0..limit).map(move |n| {
        if n == 0 {
            format!("{stem}{TEMPLATE_EXTENSION}")
        } else {
            format!("{stem}_{n}{TEMPLATE_EXTENSION}")
        }
    })
}

/// File stem of a template file name.
pub fn stem_of(file_name: &str) -> &str {
    file_name
        .strip_suffix(TEMPLATE_EXTENSION)
        .unwrap_or(file_name)
}

/// `{stem}_backup_{timestamp}` with `:` and `.` replaced by `-`.
pub fn backup_stem(file_name: &str, at: DateTime<Utc>) -> String {
    let timestamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}_backup_{}", stem_of(file_name), timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_file_name() {
        assert_eq!(
            generate_file_name("Traceability Report", "01").unwrap(),
            "Traceability_Report_01.json"
        );
        assert_eq!(generate_file_name(" QC / Line 3 ", "v2.1").unwrap(), "QC_Line_3_v21.json");
        assert_eq!(generate_file_name("Checklist", "").unwrap(), "Checklist.json");
    }

    #[test]
    fn test_generate_file_name_requires_name() {
        assert!(generate_file_name("  ", "01").is_err());
        assert!(generate_file_name("***", "01").is_err());
    }

    #[test]
    fn test_candidate_names() {
        let names: Vec<String> = candidate_names("Report_01", 3).collect();
        assert_eq!(names, vec!["Report_01.json", "Report_01_1.json", "Report_01_2.json"]);
    }

    #[test]
    fn test_backup_stem() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            backup_stem("Report_01.json", at),
            "Report_01_backup_2026-03-04T05-06-07-000Z"
        );
    }
}
