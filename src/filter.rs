use crate::dates::month_label;
use crate::record::JobRecord;
use serde::Deserialize;

/// Optional equality filters over valid terminal rows. A missing value,
/// a blank value, or `All` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub technician: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
}

fn effective(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
}

impl Filters {
    pub fn technician(&self) -> Option<&str> { effective(&self.technician) }
    pub fn category(&self) -> Option<&str> { effective(&self.category) }
    pub fn month(&self) -> Option<&str> { effective(&self.month) }

    pub fn is_empty(&self) -> bool { self.technician().is_none() && self.category().is_none() && self.month().is_none() }

    /// Values set in `other` replace ours key by key.
    pub fn overridden_by(mut self, other: Filters) -> Filters {
        if other.technician.is_some() { self.technician = other.technician; }
        if other.category.is_some() { self.category = other.category; }
        if other.month.is_some() { self.month = other.month; }
        self
    }

    pub fn matches(&self, rec: &JobRecord) -> bool {
        if let Some(t) = self.technician() {
            if rec.assignee_or_unassigned() != t { return false; }
        }
        if let Some(c) = self.category() {
            if rec.category != c { return false; }
        }
        if let Some(m) = self.month() {
            match &rec.finished {
                Some(f) if month_label(f) == m => {}
                _ => return false,
            }
        }
        true
    }

    pub fn apply<'a>(&self, records: &'a [JobRecord]) -> Vec<&'a JobRecord> {
        if self.is_empty() { return records.iter().collect(); }
        let out: Vec<&JobRecord> = records.iter().filter(|r| self.matches(r)).collect();
        tracing::debug!(filters = ?self, kept = out.len(), of = records.len(), "filtered");
        out
    }
}
