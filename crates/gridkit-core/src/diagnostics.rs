//! Diagnostics collected while loading raw grid features.
//!
//! Malformed input is never fatal. A feature that can be repaired (an
//! unclosed polygon ring, a multi-part geometry) is kept and produces a
//! warning; a feature that cannot be used (unknown kind, degenerate line) is
//! dropped and produces an error entry. The pipeline then runs on whatever
//! survived.
//!
//! # Example
//!
//! ```
//! use gridkit_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("repair", "closed unclosed exterior ring", "area 17");
//! diag.add_error_with_entity("geometry", "line has fewer than two coordinates", "line 4");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! ```

use std::fmt;

use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Feature was repaired and kept
    Warning,
    /// Feature was dropped
    Error,
}

/// A single issue raised for one raw feature.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Grouping key ("classification", "geometry", "repair")
    pub category: String,
    pub message: String,
    /// Feature reference, e.g. "tower 14"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;
        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        Ok(())
    }
}

fn plural(n: usize, word: &str) -> String {
    format!("{} {}{}", n, word, if n == 1 { "" } else { "s" })
}

/// Collection of diagnostic issues
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.add(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn summary(&self) -> String {
        match (self.warning_count(), self.error_count()) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => plural(w, "warning"),
            (0, e) => plural(e, "error"),
            (w, e) => format!("{}, {}", plural(w, "warning"), plural(e, "error")),
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

/// Counts of features accepted into each collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub nodes: usize,
    pub towers: usize,
    pub areas: usize,
    pub lines: usize,
    /// Features skipped (unknown kind or unusable geometry)
    pub dropped: usize,
    /// Features kept after a geometry fix-up
    pub repaired: usize,
}

/// Result diagnostics of loading raw feature tables.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestDiagnostics {
    pub stats: IngestStats,
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

impl IngestDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a repaired feature.
    pub fn repaired(&mut self, category: &str, message: &str, entity: &str) {
        self.diagnostics
            .add_warning_with_entity(category, message, entity);
        self.stats.repaired += 1;
    }

    /// Record a dropped feature.
    pub fn dropped(&mut self, category: &str, message: &str, entity: &str) {
        self.diagnostics
            .add_error_with_entity(category, message, entity);
        self.stats.dropped += 1;
    }

    /// Record a feature left out on purpose (e.g. an unhandled kind).
    pub fn skipped(&mut self, category: &str, message: &str, entity: &str) {
        self.diagnostics
            .add_warning_with_entity(category, message, entity);
        self.stats.dropped += 1;
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} nodes, {} towers, {} areas, {} lines ({} repaired, {} dropped) | {}",
            self.stats.nodes,
            self.stats.towers,
            self.stats.areas,
            self.stats.lines,
            self.stats.repaired,
            self.stats.dropped,
            self.diagnostics.summary()
        )
    }
}

impl fmt::Display for IngestDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ingest: {}", self.summary())?;
        for issue in &self.diagnostics.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = Diagnostics::new();
        diag.add_warning_with_entity("repair", "ring closed", "area 1");
        diag.add_error_with_entity("geometry", "empty line", "line 2");
        diag.add_warning_with_entity("repair", "multi-part area", "area 3");

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
        assert!(diag.has_errors());
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");

        diag.add_warning_with_entity("repair", "warning", "area 1");
        assert_eq!(diag.summary(), "1 warning");

        diag.add_error_with_entity("geometry", "error", "line 2");
        diag.add_warning_with_entity("repair", "another warning", "area 3");
        assert_eq!(diag.summary(), "2 warnings, 1 error");
    }

    #[test]
    fn test_issue_display() {
        let issue = DiagnosticIssue::new(Severity::Error, "classification", "unknown kind 'Pole'")
            .with_entity("tower 14");
        let display = issue.to_string();
        assert!(display.starts_with("[error:classification]"));
        assert!(display.contains("tower 14"));
    }

    #[test]
    fn test_ingest_diagnostics_track_counters() {
        let mut diag = IngestDiagnostics::new();
        diag.stats.lines = 12;
        diag.repaired("repair", "closed ring", "area 1");
        diag.dropped("geometry", "degenerate line", "line 7");

        assert_eq!(diag.stats.repaired, 1);
        assert_eq!(diag.stats.dropped, 1);
        assert!(diag.has_errors());
        assert!(diag.summary().contains("12 lines"));

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"dropped\":1"));
        assert!(json.contains("\"entity\":\"line 7\""));
    }
}
