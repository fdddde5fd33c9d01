//! Job lifecycle analytics for ICT service-desk and D+ field-job exports.
//!
//! A raw table goes through header detection, scope filtering,
//! deduplication by job id and classification once per load
//! ([`dashboard::Dashboard::load`]); filtering and KPI aggregation run per
//! render. [`faults::analyze`] ranks fault scenarios from detailed fault
//! reports.

pub mod classify;
pub mod dashboard;
pub mod dates;
pub mod dedup;
pub mod faults;
pub mod filter;
pub mod metrics;
pub mod record;
pub mod schema;
pub mod stock;
pub mod tally;

pub use dashboard::{Dashboard, DashboardResult};
pub use filter::Filters;
pub use schema::ReportKind;

#[derive(thiserror::Error, Debug)]
pub enum DashboardError {
    #[error("no valid header row found in the first {scanned} rows")]
    HeaderNotFound { scanned: usize },
    #[error("file has a header at row {} but no data rows", .header_row + 1)]
    TooShort { header_row: usize },
    #[error("no data rows found")]
    NoData,
    #[error("required column missing: {0}")]
    MissingColumn(String),
    #[error("no fault scenarios found in the fault repair department")]
    NoFaultScenarios,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_problem() {
        assert_eq!(
            DashboardError::HeaderNotFound { scanned: 15 }.to_string(),
            "no valid header row found in the first 15 rows"
        );
        assert_eq!(DashboardError::TooShort { header_row: 2 }.to_string(), "file has a header at row 3 but no data rows");
        assert_eq!(
            DashboardError::MissingColumn("FaultDescription2".into()).to_string(),
            "required column missing: FaultDescription2"
        );
    }
}
