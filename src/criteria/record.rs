use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One monitoring criteria profile.
///
/// Records are append-only: a correction never mutates an existing record in
/// place, it produces a new one through the generation/QA cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaRecord {
    /// Unique snake_case title; the key every other component refers to.
    pub title: String,
    /// What the use case is and what traffic it covers.
    pub description: String,
    /// Structured monitoring definition: protocols, ports, track_fields,
    /// alert_conditions.
    pub criteria: Value,
    /// Berkeley Packet Filter expression equivalent of the criteria.
    pub bpf_filter: String,
}

impl CriteriaRecord {
    /// Compact block used when listing candidates for the matcher prompt.
    pub fn matching_summary(&self) -> String {
        format!(
            "Title: {}\nCriteria: {}\nBPF filter: {}\n---",
            self.title,
            serde_json::to_string_pretty(&self.criteria).unwrap_or_default(),
            self.bpf_filter
        )
    }

    /// Fuller block used when a single record is under QA review.
    pub fn review_summary(&self) -> String {
        format!(
            "Title: {}\nDescription: {}\nCriteria details:\n{}",
            self.title,
            self.description,
            serde_json::to_string_pretty(&self.criteria).unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> CriteriaRecord {
        CriteriaRecord {
            title: "web_application".to_string(),
            description: "Monitors HTTP/HTTPS traffic for hosted web apps.".to_string(),
            criteria: json!({"protocols": ["TCP"], "ports": [80, 443]}),
            bpf_filter: "tcp port 80 or tcp port 443".to_string(),
        }
    }

    #[test]
    fn matching_summary_includes_title_and_filter() {
        let summary = record().matching_summary();
        assert!(summary.contains("Title: web_application"));
        assert!(summary.contains("tcp port 80 or tcp port 443"));
        assert!(summary.ends_with("---"));
    }

    #[test]
    fn review_summary_includes_description_and_criteria() {
        let summary = record().review_summary();
        assert!(summary.contains("Monitors HTTP/HTTPS traffic"));
        assert!(summary.contains("\"ports\""));
    }
}
