//! Partition canonical records into pending work, rejected rows and valid
//! terminal rows, and collect the operational tallies that filters never
//! touch.

use crate::record::{JobRecord, RawRow};
use crate::schema::{DurationModel, ReportConfiguration, FAULT_REPAIR};
use crate::tally::{BreakdownItem, Tally};
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingJob {
    pub req_id: String,
    pub technician: String,
    pub category: String,
    pub created_time: NaiveDateTime,
    pub pending_duration_hours: f64,
    pub row_data: RawRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidRow {
    pub row_data: RawRow,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct DepartmentTally {
    /// Includes pending rows without a usable created time.
    pub pending: usize,
    pub pending_jobs: Vec<PendingJob>,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub cancellation_reasons: Tally,
}

/// Per-department counters for reports that split work by department.
#[derive(Debug, Clone, Default)]
pub struct DepartmentTallies {
    pub installations: DepartmentTally,
    pub faults: DepartmentTally,
    pub relocations: usize,
    pub reassociations: usize,
}

impl DepartmentTallies {
    fn for_category(&mut self, category: &str) -> &mut DepartmentTally {
        if category == FAULT_REPAIR { &mut self.faults } else { &mut self.installations }
    }

    pub fn cancellation_breakdowns(&self) -> (Vec<BreakdownItem>, Vec<BreakdownItem>) {
        (
            self.installations.cancellation_reasons.clone().into_breakdown(),
            self.faults.cancellation_reasons.clone().into_breakdown(),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classified {
    pub pending: Vec<PendingJob>,
    pub invalid: Vec<InvalidRow>,
    pub valid: Vec<JobRecord>,
    pub pending_undated: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub unclassified: usize,
    pub blank: usize,
    pub departments: Option<DepartmentTallies>,
}

impl Classified {
    /// Whether the load produced anything worth showing: terminal rows,
    /// pending work, rejected rows or department activity.
    pub fn has_tickets(&self) -> bool {
        let activity = self.departments.as_ref().is_some_and(|d| d.relocations + d.reassociations > 0);
        !self.valid.is_empty()
            || !self.pending.is_empty()
            || self.pending_undated > 0
            || !self.invalid.is_empty()
            || self.failed > 0
            || self.cancelled > 0
            || activity
    }
}

pub struct Classifier<'a> {
    config: &'a ReportConfiguration,
    width: usize,
    now: NaiveDateTime,
}

impl<'a> Classifier<'a> {
    /// `width` is the header's column count; `now` anchors pending durations.
    pub fn new(config: &'a ReportConfiguration, width: usize, now: NaiveDateTime) -> Self {
        Self { config, width, now }
    }

    fn pending_job(&self, rec: &JobRecord, created: NaiveDateTime) -> PendingJob {
        let req_id = if rec.id.is_empty() { "N/A".to_string() } else { rec.id.clone() };
        PendingJob {
            req_id,
            technician: rec.assignee_or_unassigned().to_string(),
            category: rec.category.clone(),
            created_time: created,
            pending_duration_hours: crate::dates::hours_between(&created, &self.now),
            row_data: rec.row.clone(),
        }
    }

    fn rejection(&self, rec: &JobRecord) -> Option<&'static str> {
        if self.config.require_dates && (rec.created.is_none() || rec.finished.is_none()) {
            return Some("Completed job has missing/invalid dates");
        }
        if rec.assignee.is_empty() { return Some(self.config.missing_assignee_reason); }
        if rec.row.len() < self.width {
            tracing::warn!(id = %rec.id, cells = rec.row.len(), expected = self.width, "terminal row shorter than header");
            return Some("Mismatched column count");
        }
        None
    }

    /// Classify one canonical record into `out`.
    fn classify_into(&self, rec: JobRecord, out: &mut Classified) {
        if rec.is_blank() {
            out.blank += 1;
            return;
        }
        let status = rec.status.as_str();
        if let Some(d) = out.departments.as_mut() {
            if rec.job_type.contains("relocation") { d.relocations += 1; }
            if rec.job_type.contains("reassociation") { d.reassociations += 1; }
        }

        if self.config.is_pending(status) {
            let job = rec.created.map(|c| self.pending_job(&rec, c));
            if let Some(d) = out.departments.as_mut() {
                let dept = d.for_category(&rec.category);
                dept.pending += 1;
                if let Some(j) = &job { dept.pending_jobs.push(j.clone()); }
            }
            match job {
                Some(j) => out.pending.push(j),
                None => out.pending_undated += 1,
            }
            return;
        }

        if self.config.is_success(status) {
            if let Some(reason) = self.rejection(&rec) {
                out.invalid.push(InvalidRow { row_data: rec.row, reason: reason.to_string() });
                return;
            }
            if let Some(d) = out.departments.as_mut() { d.for_category(&rec.category).completed += 1; }
            out.valid.push(rec);
            return;
        }

        if self.config.is_failed(status) {
            out.failed += 1;
            if let Some(d) = out.departments.as_mut() { d.for_category(&rec.category).failed += 1; }
            return;
        }

        if self.config.is_cancelled(status) {
            out.cancelled += 1;
            if let Some(d) = out.departments.as_mut() {
                let dept = d.for_category(&rec.category);
                dept.cancelled += 1;
                dept.cancellation_reasons.add(rec.cancel_reason_or_default());
            }
            return;
        }

        out.unclassified += 1;
    }

    pub fn classify(&self, records: Vec<JobRecord>) -> Classified {
        let mut out = Classified {
            departments: (self.config.duration_model == DurationModel::Departmental).then(DepartmentTallies::default),
            ..Classified::default()
        };
        for rec in records { self.classify_into(rec, &mut out); }
        tracing::debug!(
            report = %self.config.kind,
            pending = out.pending.len(),
            pending_undated = out.pending_undated,
            valid = out.valid.len(),
            invalid = out.invalid.len(),
            failed = out.failed,
            cancelled = out.cancelled,
            unclassified = out.unclassified,
            "classified"
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::schema::{ColumnIndex, DPLUS, ICT, INSTALLATIONS};
    use approx::assert_abs_diff_eq;

    fn row(cells: &[&str]) -> RawRow { cells.iter().map(|s| s.to_string()).collect() }

    fn now() -> NaiveDateTime { parse_date("10/01/2024 12:00").unwrap() }

    fn ict_records(rows: &[&[&str]]) -> (Vec<JobRecord>, usize) {
        let headers = row(&["RequestID", "Technician", "Request Status", "Assigned Time", "Created Time", "Completed Time"]);
        let cols = ColumnIndex::resolve(&headers, &ICT);
        (rows.iter().map(|r| JobRecord::from_row(row(r), &cols, &ICT)).collect(), headers.len())
    }

    fn dplus_records(rows: &[&[&str]]) -> (Vec<JobRecord>, usize) {
        let headers = row(&["JobNumber", "Engineers", "JobStatusFull", "DepartmentName", "JobTypes", "DateCreated", "DateFinished", "FailureReason"]);
        let cols = ColumnIndex::resolve(&headers, &DPLUS);
        (rows.iter().map(|r| JobRecord::from_row(row(r), &cols, &DPLUS)).collect(), headers.len())
    }

    #[test]
    fn ict_partition_is_total_and_disjoint() {
        let (records, width) = ict_records(&[
            &["1", "Ann", "Open", "", "09/01/2024 12:00", ""],
            &["2", "", "Closed", "", "", ""],
            &["3", "Bob", "Closed"],
            &["4", "Bob", "Resolved", "", "", ""],
            &["5", "Bob", "On Hold", "", "bad", ""],
            &["6", "Bob", "", "", "", ""],
            &["", "", "", "", "", ""],
        ]);
        let c = Classifier::new(&ICT, width, now()).classify(records);
        assert_eq!(c.pending.len(), 1);
        assert_abs_diff_eq!(c.pending[0].pending_duration_hours, 24.0, epsilon = 1e-9);
        assert_eq!(c.pending_undated, 1);
        let reasons: Vec<&str> = c.invalid.iter().map(|i| i.reason.as_str()).collect();
        assert_eq!(reasons, vec!["Missing Technician", "Mismatched column count"]);
        assert_eq!(c.valid.len(), 1);
        assert_eq!(c.valid[0].id, "4");
        assert_eq!(c.unclassified, 1);
        assert_eq!(c.blank, 1);
        assert!(c.departments.is_none());
        let total = c.pending.len() + c.pending_undated + c.invalid.len() + c.valid.len() + c.unclassified + c.blank;
        assert_eq!(total, 7);
    }

    #[test]
    fn dplus_counters_and_reasons() {
        let (records, width) = dplus_records(&[
            &["1", "Eve", "Completed", "St. Lucia Installations", "Standalone BB", "01/01/2024 08:00:00", "01/01/2024 10:00:00", ""],
            &["2", "Eve", "Completed", "St. Lucia Fault Repair External", "Fault", "01/01/2024 08:00:00", "", ""],
            &["3", "", "Completed", "St. Lucia Fault Repair External", "Fault", "01/01/2024 08:00:00", "01/01/2024 09:00:00", ""],
            &["4", "Eve", "Failed Request", "St. Lucia Installations", "Relocation", "", "", ""],
            &["5", "Eve", "Cancelled", "St. Lucia Fault Repair External", "Reassociation", "", "", "Customer refused"],
            &["6", "Eve", "Cancelled", "St. Lucia Fault Repair External", "", "", "", ""],
            &["7", "", "Confirmed", "St. Lucia Installations", "", "09/01/2024 12:00:00", "", ""],
            &["8", "", "Manager Hold", "St. Lucia Installations", "", "", "", ""],
            &["9", "Eve", "Started", "St. Lucia Installations", "", "", "", ""],
        ]);
        let c = Classifier::new(&DPLUS, width, now()).classify(records);
        let reasons: Vec<&str> = c.invalid.iter().map(|i| i.reason.as_str()).collect();
        assert_eq!(reasons, vec!["Completed job has missing/invalid dates", "Missing Engineer"]);
        assert_eq!(c.valid.len(), 1);
        assert_eq!(c.failed, 1);
        assert_eq!(c.cancelled, 2);
        assert_eq!(c.unclassified, 1);
        assert_eq!(c.pending.len(), 1);
        assert_eq!(c.pending[0].technician, "Not Assigned");
        assert_eq!(c.pending[0].category, INSTALLATIONS);

        let d = c.departments.unwrap();
        assert_eq!(d.installations.pending, 2);
        assert_eq!(d.installations.pending_jobs.len(), 1);
        assert_eq!(d.installations.completed, 1);
        assert_eq!(d.installations.failed, 1);
        assert_eq!(d.faults.cancelled, 2);
        assert_eq!(d.relocations, 1);
        assert_eq!(d.reassociations, 1);
        let (inst, faults) = d.cancellation_breakdowns();
        assert!(inst.is_empty());
        assert_eq!(faults.len(), 2);
        assert_eq!(faults[0].name, "Customer refused");
        assert_eq!(faults[1].name, "No Reason Given");
    }

    #[test]
    fn failed_and_cancelled_jobs_count_as_tickets() {
        let (records, width) = dplus_records(&[
            &["1", "Eve", "Failed", "St. Lucia Installations", "", "", "", ""],
            &["2", "Eve", "Cancelled", "St. Lucia Fault Repair External", "", "", "", "No access"],
        ]);
        let c = Classifier::new(&DPLUS, width, now()).classify(records);
        assert!(c.valid.is_empty() && c.pending.is_empty() && c.invalid.is_empty());
        assert!(c.has_tickets());

        let (blank, width) = dplus_records(&[&["", "", "", "", "", "", "", ""], &["3", "Eve", "Started", "", "", "", "", ""]]);
        assert!(!Classifier::new(&DPLUS, width, now()).classify(blank).has_tickets());
    }
}
