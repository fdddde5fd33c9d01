//! Report configurations, header detection and column resolution.

use crate::DashboardError;
use serde::Serialize;
use std::fmt;

/// How many leading rows may be preamble before the header row.
pub const HEADER_SCAN_LIMIT: usize = 15;

pub const INSTALLATIONS: &str = "St. Lucia Installations";
pub const FAULT_REPAIR: &str = "St. Lucia Fault Repair External";
/// The only installation job type whose inventory is tracked.
pub const STANDALONE_INSTALL_JOB_TYPE: &str = "standalone bb";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportKind {
    #[serde(rename = "ICT")]
    Ict,
    #[serde(rename = "D+")]
    DPlus,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Ict => f.write_str("ICT"),
            ReportKind::DPlus => f.write_str("D+"),
        }
    }
}

/// Logical roles a column can play. Not every report has every role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Assignee,
    Status,
    Category,
    SubCategory,
    JobType,
    Created,
    Assigned,
    Finished,
    SlaOverdue,
    FirstResponseOverdue,
    CancelReason,
    Stock,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Id,
        Field::Assignee,
        Field::Status,
        Field::Category,
        Field::SubCategory,
        Field::JobType,
        Field::Created,
        Field::Assigned,
        Field::Finished,
        Field::SlaOverdue,
        Field::FirstResponseOverdue,
        Field::CancelReason,
        Field::Stock,
    ];

    fn slot(self) -> usize { self as usize }
}

/// Which statuses count as pending work.
#[derive(Debug, Clone, Copy)]
pub enum PendingStatuses {
    /// Any non-blank status that is not terminal-success.
    AllOthers,
    Only(&'static [&'static str]),
}

/// How elapsed time is turned into KPIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationModel {
    /// created → assigned → closed, yielding MTTA, MTTI and MTTR.
    Lifecycle,
    /// A single created → finished span, routed to MTTI or MTTR by department.
    Departmental,
}

/// Everything that differs between the report families.
#[derive(Debug, Clone)]
pub struct ReportConfiguration {
    pub kind: ReportKind,
    pub required_headers: &'static [&'static str],
    pub columns: &'static [(Field, &'static str)],
    pub pending: PendingStatuses,
    pub success: &'static [&'static str],
    pub failed: &'static [&'static str],
    pub cancelled: &'static [&'static str],
    pub priorities: &'static [(&'static str, u8)],
    pub duration_model: DurationModel,
    pub missing_assignee_reason: &'static str,
    /// Reject terminal rows whose created/finished instants do not parse.
    pub require_dates: bool,
    /// Category (ICT) or job type (D+) of bulk remote migrations, which are
    /// not field work.
    pub migration_marker: &'static str,
}

const MIGRATION_MARKER: &str = "remotemigrationstlucia";

pub static ICT: ReportConfiguration = ReportConfiguration {
    kind: ReportKind::Ict,
    required_headers: &["Technician", "RequestID", "Request Status", "Assigned Time"],
    columns: &[
        (Field::Assignee, "Technician"),
        (Field::Id, "RequestID"),
        (Field::Category, "Category"),
        (Field::SubCategory, "Sub Category"),
        (Field::Status, "Request Status"),
        (Field::Created, "Created Time"),
        (Field::Assigned, "Assigned Time"),
        (Field::Finished, "Completed Time"),
        (Field::SlaOverdue, "overdue status"),
        (Field::FirstResponseOverdue, "First Response Overdue status"),
    ],
    pending: PendingStatuses::AllOthers,
    success: &["closed", "resolved"],
    failed: &[],
    cancelled: &[],
    priorities: &[("closed", 2), ("resolved", 2)],
    duration_model: DurationModel::Lifecycle,
    missing_assignee_reason: "Missing Technician",
    require_dates: false,
    migration_marker: MIGRATION_MARKER,
};

pub static DPLUS: ReportConfiguration = ReportConfiguration {
    kind: ReportKind::DPlus,
    required_headers: &["Engineers", "JobNumber", "JobStatusFull", "DepartmentName"],
    columns: &[
        (Field::Status, "JobStatusFull"),
        (Field::Category, "DepartmentName"),
        (Field::JobType, "JobTypes"),
        (Field::Created, "DateCreated"),
        (Field::Finished, "DateFinished"),
        (Field::Assignee, "Engineers"),
        (Field::Id, "JobNumber"),
        (Field::CancelReason, "FailureReason"),
        (Field::Stock, "StockSelected"),
    ],
    pending: PendingStatuses::Only(&["created", "confirmed", "manager hold"]),
    success: &["completed"],
    failed: &["failed", "failed request"],
    cancelled: &["cancelled"],
    priorities: &[("completed", 3), ("cancelled", 2), ("failed", 1), ("failed request", 1)],
    duration_model: DurationModel::Departmental,
    missing_assignee_reason: "Missing Engineer",
    require_dates: true,
    migration_marker: MIGRATION_MARKER,
};

/// Detection order: the first configuration whose headers match a row wins.
pub static CONFIGURATIONS: [&ReportConfiguration; 2] = [&ICT, &DPLUS];

impl ReportConfiguration {
    pub fn is_success(&self, status: &str) -> bool { listed(self.success, status) }
    pub fn is_failed(&self, status: &str) -> bool { listed(self.failed, status) }
    pub fn is_cancelled(&self, status: &str) -> bool { listed(self.cancelled, status) }

    pub fn is_pending(&self, status: &str) -> bool {
        match self.pending {
            PendingStatuses::AllOthers => !status.is_empty() && !self.is_success(status),
            PendingStatuses::Only(list) => listed(list, status),
        }
    }

    /// Tie-break rank; statuses outside the table rank 0.
    pub fn priority(&self, status: &str) -> u8 {
        self.priorities.iter().find(|(s, _)| *s == status).map(|(_, p)| *p).unwrap_or(0)
    }

    /// Label used for the category dimension. D+ collapses raw department
    /// names onto the two departments it reports on.
    pub fn category_label(&self, raw: &str) -> String {
        match self.kind {
            ReportKind::Ict => {
                let t = raw.trim();
                if t.is_empty() { "N/A".to_string() } else { t.to_string() }
            }
            ReportKind::DPlus => department_label(raw).to_string(),
        }
    }

    /// Rows outside the report's scope are dropped before deduplication.
    pub fn in_scope(&self, row: &[String], cols: &ColumnIndex) -> bool {
        match self.kind {
            ReportKind::Ict => {
                cols.get(row, Field::Category).trim().to_lowercase() != self.migration_marker
            }
            ReportKind::DPlus => {
                let dept = cols.get(row, Field::Category).trim().to_lowercase();
                let job_type = cols.get(row, Field::JobType).trim().to_lowercase();
                (dept.contains("st. lucia installation") || dept.contains("st. lucia fault repair"))
                    && job_type != self.migration_marker
            }
        }
    }

    /// Values offered for the category filter, if fixed by the report family.
    pub fn fixed_categories(&self) -> Option<Vec<String>> {
        match self.kind {
            ReportKind::Ict => None,
            ReportKind::DPlus => Some(vec![INSTALLATIONS.to_string(), FAULT_REPAIR.to_string()]),
        }
    }
}

fn listed(list: &[&str], status: &str) -> bool { list.iter().any(|s| *s == status) }

pub fn department_label(raw: &str) -> &'static str {
    if raw.trim().to_lowercase().contains("fault") { FAULT_REPAIR } else { INSTALLATIONS }
}

fn normalized_cells(row: &[String]) -> Vec<String> {
    row.iter().map(|c| c.trim().to_lowercase()).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct Detection {
    pub config: &'static ReportConfiguration,
    pub header_row: usize,
}

/// Locate the header row within the first [`HEADER_SCAN_LIMIT`] rows.
pub fn detect(table: &[Vec<String>]) -> Result<Detection, DashboardError> {
    for (i, row) in table.iter().take(HEADER_SCAN_LIMIT).enumerate() {
        let cells = normalized_cells(row);
        for config in CONFIGURATIONS {
            let matched = config
                .required_headers
                .iter()
                .all(|h| cells.iter().any(|c| *c == h.to_lowercase()));
            if matched {
                tracing::debug!(report = %config.kind, header_row = i, "header row detected");
                return Ok(Detection { config, header_row: i });
            }
        }
    }
    Err(DashboardError::HeaderNotFound { scanned: table.len().min(HEADER_SCAN_LIMIT) })
}

/// Column positions for each logical field; `None` marks a column the
/// export does not carry.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    slots: [Option<usize>; Field::ALL.len()],
    width: usize,
}

impl ColumnIndex {
    pub fn resolve(headers: &[String], config: &ReportConfiguration) -> Self {
        let cells = normalized_cells(headers);
        let mut slots = [None; Field::ALL.len()];
        for (field, name) in config.columns {
            let wanted = name.to_lowercase();
            slots[field.slot()] = cells.iter().position(|c| *c == wanted);
        }
        Self { slots, width: headers.len() }
    }

    pub fn position(&self, field: Field) -> Option<usize> { self.slots[field.slot()] }

    pub fn has(&self, field: Field) -> bool { self.position(field).is_some() }

    /// Number of header cells; data rows shorter than this are suspect.
    pub fn width(&self) -> usize { self.width }

    /// Raw cell for a field; absent columns and short rows read as "".
    pub fn get<'a>(&self, row: &'a [String], field: Field) -> &'a str {
        self.position(field).and_then(|i| row.get(i)).map(|s| s.as_str()).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> { cells.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn detects_ict_after_preamble() {
        let table = vec![
            row(&["Report generated", "", ""]),
            row(&[]),
            row(&["  requestid ", "TECHNICIAN", "Request Status", "Assigned Time", "Category"]),
            row(&["1", "Ann", "Closed", "", ""]),
        ];
        let d = detect(&table).unwrap();
        assert_eq!(d.config.kind, ReportKind::Ict);
        assert_eq!(d.header_row, 2);
    }

    #[test]
    fn detects_dplus() {
        let table = vec![row(&["JobNumber", "Engineers", "JobStatusFull", "DepartmentName", "DateCreated"])];
        let d = detect(&table).unwrap();
        assert_eq!(d.config.kind, ReportKind::DPlus);
        assert_eq!(d.header_row, 0);
    }

    #[test]
    fn header_beyond_scan_window_is_not_found() {
        let mut table: Vec<Vec<String>> = (0..HEADER_SCAN_LIMIT).map(|_| row(&["x"])).collect();
        table.push(row(&["Technician", "RequestID", "Request Status", "Assigned Time"]));
        let err = detect(&table).unwrap_err();
        assert!(matches!(err, DashboardError::HeaderNotFound { scanned: 15 }));
    }

    #[test]
    fn partial_header_set_does_not_match() {
        let table = vec![row(&["Technician", "RequestID", "Request Status"])];
        assert!(detect(&table).is_err());
    }

    #[test]
    fn optional_columns_resolve_to_absent() {
        let headers = row(&["Technician", "RequestID", "Request Status", "Assigned Time", "Overdue Status"]);
        let cols = ColumnIndex::resolve(&headers, &ICT);
        assert_eq!(cols.position(Field::Assignee), Some(0));
        assert_eq!(cols.position(Field::SlaOverdue), Some(4));
        assert!(!cols.has(Field::FirstResponseOverdue));
        assert_eq!(cols.get(&row(&["a", "b"]), Field::Status), "");
        assert_eq!(cols.get(&row(&["a"]), Field::FirstResponseOverdue), "");
    }

    #[test]
    fn status_taxonomies() {
        assert!(ICT.is_pending("open"));
        assert!(ICT.is_pending("on hold"));
        assert!(!ICT.is_pending(""));
        assert!(!ICT.is_pending("resolved"));
        assert!(DPLUS.is_pending("manager hold"));
        assert!(!DPLUS.is_pending("started"));
        assert_eq!(DPLUS.priority("completed"), 3);
        assert_eq!(DPLUS.priority("failed request"), 1);
        assert_eq!(ICT.priority("open"), 0);
    }

    #[test]
    fn department_labels() {
        assert_eq!(department_label("St. Lucia FAULT Repair External"), FAULT_REPAIR);
        assert_eq!(department_label("St. Lucia Installations"), INSTALLATIONS);
        assert_eq!(department_label(""), INSTALLATIONS);
    }
}
