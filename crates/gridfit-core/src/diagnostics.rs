//! Non-fatal findings about a network.
//!
//! Hard configuration errors (zero impedance, missing slack, ...) stop
//! [`crate::NetworkBuilder::build`]. Findings collected here are warnings: the
//! network is usable, but some results may be less meaningful than the caller
//! expects (no congestion scoring on an unrated branch, for example).
//!
//! ```
//! use gridfit_core::diagnostics::{Diagnostics, IssueCategory};
//!
//! let mut diag = Diagnostics::new();
//! diag.push(IssueCategory::Capacity, "generation capacity is below load");
//! diag.push_for(IssueCategory::Rating, "Branch 3", "no thermal rating");
//! assert_eq!(diag.len(), 2);
//! assert_eq!(diag.count(IssueCategory::Rating), 1);
//! ```

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    /// Generation fleet versus demand
    Capacity,
    /// Generator placement relative to bus types
    Dispatch,
    /// Thermal ratings
    Rating,
}

impl IssueCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCategory::Capacity => "capacity",
            IssueCategory::Dispatch => "dispatch",
            IssueCategory::Rating => "rating",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticIssue {
    pub category: IssueCategory,
    pub message: String,
    /// Element the finding is about, e.g. "Gen 4"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity {
            Some(entity) => write!(f, "[{}] {}: {}", self.category, entity, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: IssueCategory, message: impl Into<String>) {
        self.issues.push(DiagnosticIssue {
            category,
            message: message.into(),
            entity: None,
        });
    }

    /// Record a finding about one element.
    pub fn push_for(
        &mut self,
        category: IssueCategory,
        entity: impl fmt::Display,
        message: impl Into<String>,
    ) {
        self.issues.push(DiagnosticIssue {
            category,
            message: message.into(),
            entity: Some(entity.to_string()),
        });
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter()
    }

    pub fn by_category(&self, category: IssueCategory) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn count(&self, category: IssueCategory) -> usize {
        self.by_category(category).count()
    }

    /// e.g. "3 findings (capacity 1, rating 2)"
    pub fn summary(&self) -> String {
        if self.issues.is_empty() {
            return "no findings".to_string();
        }
        let parts: Vec<String> = [
            IssueCategory::Capacity,
            IssueCategory::Dispatch,
            IssueCategory::Rating,
        ]
        .into_iter()
        .filter_map(|c| {
            let n = self.count(c);
            (n > 0).then(|| format!("{c} {n}"))
        })
        .collect();
        let noun = if self.issues.len() == 1 { "finding" } else { "findings" };
        format!("{} {} ({})", self.issues.len(), noun, parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_category() {
        let mut diag = Diagnostics::new();
        diag.push_for(IssueCategory::Rating, "Branch 1", "a");
        diag.push(IssueCategory::Capacity, "b");
        diag.push_for(IssueCategory::Rating, "Branch 2", "c");

        assert_eq!(diag.len(), 3);
        assert_eq!(diag.count(IssueCategory::Rating), 2);
        assert_eq!(diag.count(IssueCategory::Dispatch), 0);
        assert_eq!(diag.summary(), "3 findings (capacity 1, rating 2)");
    }

    #[test]
    fn empty_summary() {
        let diag = Diagnostics::new();
        assert!(diag.is_empty());
        assert_eq!(diag.summary(), "no findings");
    }

    #[test]
    fn issue_display_names_entity() {
        let mut diag = Diagnostics::new();
        diag.push_for(IssueCategory::Dispatch, "Gen 4", "on a PQ bus");
        let shown = diag.iter().next().unwrap().to_string();
        assert_eq!(shown, "[dispatch] Gen 4: on a PQ bus");
    }

    #[test]
    fn serializes_as_list() {
        let mut diag = Diagnostics::new();
        diag.push(IssueCategory::Capacity, "short");
        let json = serde_json::to_string(&diag).unwrap();
        assert_eq!(json, r#"[{"category":"capacity","message":"short"}]"#);
    }
}
