//! Post-migration validation
//!
//! Re-parses the migrated file and checks that the sections every deployment
//! needs are present. Findings are reported; the migrated file is never
//! modified.

use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::{MigrateError, MigrateResult};

/// Sections a deployment descriptor must have.
pub const REQUIRED_SECTIONS: &[&str] = &["server", "super_admin"];

/// What was found under `[apim.analytics]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub enable: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<String>,

    /// Number of entries under `properties`, if that table exists.
    pub property_count: Option<usize>,

    pub has_moesif_key: bool,
}

/// Outcome of validating a migrated file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub missing_sections: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<AnalyticsSummary>,

    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// All required sections are present.
    pub fn is_valid(&self) -> bool {
        self.missing_sections.is_empty()
    }
}

/// Check a parsed document.
pub fn validate_document(doc: &toml::Table) -> ValidationReport {
    let mut report = ValidationReport {
        missing_sections: REQUIRED_SECTIONS
            .iter()
            .filter(|section| !doc.contains_key(**section))
            .map(|section| section.to_string())
            .collect(),
        ..Default::default()
    };

    if !report.missing_sections.is_empty() {
        report.warnings.push(format!(
            "Missing required sections: {}",
            report.missing_sections.join(", ")
        ));
    }

    let analytics = doc
        .get("apim")
        .and_then(|apim| apim.get("analytics"))
        .and_then(|analytics| analytics.as_table());

    if let Some(analytics) = analytics {
        let properties = analytics.get("properties").and_then(|p| p.as_table());
        if properties.is_none() {
            report
                .warnings
                .push("apim.analytics.properties not found".to_string());
        }
        report.analytics = Some(AnalyticsSummary {
            enable: analytics.get("enable").map(display_value),
            kind: analytics.get("type").map(display_value),
            property_count: properties.map(|p| p.len()),
            has_moesif_key: properties.map(|p| p.contains_key("moesifKey")).unwrap_or(false),
        });
    }

    for warning in &report.warnings {
        tracing::warn!("{warning}");
    }
    report
}

/// Parse and check TOML text.
pub fn validate_text(text: &str) -> Result<ValidationReport, toml::de::Error> {
    let doc: toml::Table = toml::from_str(text)?;
    Ok(validate_document(&doc))
}

/// Read, parse and check a migrated file.
pub fn validate_file(path: &Path) -> MigrateResult<ValidationReport> {
    let text = fs::read_to_string(path).map_err(|source| MigrateError::OutputRead {
        path: path.to_path_buf(),
        source,
    })?;
    validate_text(&text).map_err(|source| MigrateError::OutputParse {
        path: path.to_path_buf(),
        source,
    })
}

fn display_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_document() {
        let report = validate_text(
            r#"
[server]
hostname = "localhost"

[super_admin]
username = "admin"

[apim.analytics]
enable = true
type = "moesif"
properties."moesifKey" = "abc123"
"#,
        )
        .unwrap();
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
        assert_eq!(
            report.analytics,
            Some(AnalyticsSummary {
                enable: Some("true".to_string()),
                kind: Some("moesif".to_string()),
                property_count: Some(1),
                has_moesif_key: true,
            })
        );
    }

    #[test]
    fn test_missing_sections() {
        let report = validate_text("[server]\nhostname = \"x\"\n").unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.missing_sections, vec!["super_admin".to_string()]);
        assert!(report.analytics.is_none());
    }

    #[test]
    fn test_analytics_without_properties_warns() {
        let report =
            validate_text("[server]\n[super_admin]\n[apim.analytics]\nenable = false\n").unwrap();
        assert!(report.is_valid());
        let analytics = report.analytics.unwrap();
        assert_eq!(analytics.property_count, None);
        assert!(!analytics.has_moesif_key);
        assert_eq!(report.warnings, vec!["apim.analytics.properties not found".to_string()]);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(validate_text("[server\n").is_err());
    }
}
