use crate::dates::parse_date;
use crate::schema::{ColumnIndex, Field, ReportConfiguration};
use chrono::NaiveDateTime;

pub type RawRow = Vec<String>;

/// A data row with the fields every pipeline stage needs already extracted.
/// The source row is kept verbatim for display.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub row: RawRow,
    pub id: String,
    /// Lower-cased, trimmed.
    pub status: String,
    /// Trimmed; may be empty.
    pub assignee: String,
    pub category: String,
    pub sub_category: String,
    /// Lower-cased, trimmed.
    pub job_type: String,
    pub cancel_reason: String,
    pub stock: String,
    /// Lower-cased, trimmed.
    pub sla_overdue: String,
    /// Lower-cased, trimmed.
    pub first_response_overdue: String,
    pub created: Option<NaiveDateTime>,
    pub assigned: Option<NaiveDateTime>,
    pub finished: Option<NaiveDateTime>,
}

impl JobRecord {
    pub fn from_row(row: RawRow, cols: &ColumnIndex, config: &ReportConfiguration) -> Self {
        let text = |f: Field| cols.get(&row, f).trim().to_string();
        let date = |f: Field| parse_date(cols.get(&row, f));
        let sub = text(Field::SubCategory);
        Self {
            id: text(Field::Id),
            status: text(Field::Status).to_lowercase(),
            assignee: text(Field::Assignee),
            category: config.category_label(cols.get(&row, Field::Category)),
            sub_category: if sub.is_empty() { "N/A".to_string() } else { sub },
            job_type: text(Field::JobType).to_lowercase(),
            cancel_reason: text(Field::CancelReason),
            stock: text(Field::Stock),
            sla_overdue: text(Field::SlaOverdue).to_lowercase(),
            first_response_overdue: text(Field::FirstResponseOverdue).to_lowercase(),
            created: date(Field::Created),
            assigned: date(Field::Assigned),
            finished: date(Field::Finished),
            row,
        }
    }

    pub fn is_blank(&self) -> bool { self.row.iter().all(|c| c.trim().is_empty()) }

    /// Cancellation reason as tallied; blank reasons are grouped together.
    pub fn cancel_reason_or_default(&self) -> &str {
        if self.cancel_reason.is_empty() { "No Reason Given" } else { &self.cancel_reason }
    }

    /// Assignee as shown in listings and breakdowns.
    pub fn assignee_or_unassigned(&self) -> &str {
        if self.assignee.is_empty() { "Not Assigned" } else { &self.assignee }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DPLUS, ICT};

    fn row(cells: &[&str]) -> RawRow { cells.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn extracts_ict_fields() {
        let headers = row(&["RequestID", "Technician", "Request Status", "Assigned Time", "Created Time", "Category"]);
        let cols = ColumnIndex::resolve(&headers, &ICT);
        let rec = JobRecord::from_row(
            row(&[" 42 ", " Ann ", " Closed ", "01/02/2024 10:00", "01/02/2024 09:00", ""]),
            &cols,
            &ICT,
        );
        assert_eq!(rec.id, "42");
        assert_eq!(rec.status, "closed");
        assert_eq!(rec.assignee, "Ann");
        assert_eq!(rec.category, "N/A");
        assert_eq!(rec.sub_category, "N/A");
        assert!(rec.created.is_some() && rec.assigned.is_some());
        assert!(rec.finished.is_none());
    }

    #[test]
    fn dplus_category_is_department_label() {
        let headers = row(&["JobNumber", "Engineers", "JobStatusFull", "DepartmentName", "JobTypes"]);
        let cols = ColumnIndex::resolve(&headers, &DPLUS);
        let rec = JobRecord::from_row(row(&["7", "", "Completed", "St. Lucia Fault Repair External", "Standalone BB"]), &cols, &DPLUS);
        assert_eq!(rec.category, crate::schema::FAULT_REPAIR);
        assert_eq!(rec.job_type, "standalone bb");
        assert_eq!(rec.assignee_or_unassigned(), "Not Assigned");
    }
}
