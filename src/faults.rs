//! Most common fault → cause → solution scenarios across detailed fault
//! reports. Unlike the dashboard path, every table here starts with its own
//! header row.

use crate::DashboardError;
use serde::Serialize;
use std::collections::HashMap;

pub const REQUIRED_COLUMNS: [&str; 4] = ["DepartmentName", "FaultDescription2", "CauseDescription2", "SolutionDescription2"];
const FAULT_DEPARTMENT: &str = "st. lucia fault repair external";
pub const TOP_SCENARIOS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultScenario {
    pub fault: String,
    pub cause: String,
    pub solution: String,
    pub count: usize,
    /// Share of all counted fault rows, 0–100.
    pub percentage: f64,
}

fn cell_or_na(row: &[String], idx: usize) -> String {
    let v = row.get(idx).map(|s| s.trim()).unwrap_or("");
    if v.is_empty() { "N/A".to_string() } else { v.to_string() }
}

/// Rank fault scenarios over `tables`.
///
/// Column names are checked against the first table that has data rows;
/// later tables are read by their own headers.
pub fn analyze(tables: &[Vec<Vec<String>>]) -> Result<Vec<FaultScenario>, DashboardError> {
    let has_data = |t: &&Vec<Vec<String>>| t.len() > 1;
    let first = tables.iter().find(has_data).ok_or(DashboardError::NoData)?;
    for name in REQUIRED_COLUMNS {
        if !first[0].iter().any(|h| h.trim() == name) {
            return Err(DashboardError::MissingColumn(name.to_string()));
        }
    }

    let mut order: Vec<(String, String, String)> = Vec::new();
    let mut counts: HashMap<(String, String, String), usize> = HashMap::new();
    for table in tables.iter().filter(has_data) {
        let pos = |name: &str| table[0].iter().position(|h| h.trim() == name);
        let (Some(dept), Some(fault), Some(cause), Some(solution)) =
            (pos(REQUIRED_COLUMNS[0]), pos(REQUIRED_COLUMNS[1]), pos(REQUIRED_COLUMNS[2]), pos(REQUIRED_COLUMNS[3]))
        else {
            tracing::warn!("skipping fault table without the required columns");
            continue;
        };
        for row in &table[1..] {
            let department = row.get(dept).map(|s| s.to_lowercase()).unwrap_or_default();
            if !department.contains(FAULT_DEPARTMENT) { continue; }
            let f = cell_or_na(row, fault);
            if f == "N/A" { continue; }
            let key = (f, cell_or_na(row, cause), cell_or_na(row, solution));
            let n = counts.entry(key.clone()).or_insert(0);
            if *n == 0 { order.push(key); }
            *n += 1;
        }
    }

    let total: usize = counts.values().sum();
    if total == 0 { return Err(DashboardError::NoFaultScenarios); }
    let mut out: Vec<FaultScenario> = order
        .into_iter()
        .map(|key| {
            let count = counts[&key];
            let (fault, cause, solution) = key;
            FaultScenario { fault, cause, solution, count, percentage: count as f64 / total as f64 * 100.0 }
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out.truncate(TOP_SCENARIOS);
    tracing::debug!(scenarios = out.len(), faults = total, "fault analysis done");
    Ok(out)
}
