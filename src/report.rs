use anyhow::{Context, Result};
use job_dashboard::classify::PendingJob;
use job_dashboard::dashboard::{DashboardResult, DepartmentCounts};
use job_dashboard::faults::FaultScenario;
use job_dashboard::metrics::{DurationKpi, NOT_APPLICABLE};
use job_dashboard::stock::HardwareUsageItem;
use job_dashboard::tally::BreakdownItem;
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

const MAX_SHEET_CHARS: usize = 31;
const MAX_CELL_CHARS: usize = 32767;

fn truncate_chars(s: &str, max_chars: usize) -> String { s.chars().take(max_chars).collect() }

fn sanitize_sheet_name(name: &str) -> String {
    let mut s = name.replace(['\\', '/', '*', '?', ':', '[', ']'], "");
    while s.starts_with('\'') { s.remove(0); }
    while s.ends_with('\'') { s.pop(); }
    let t = truncate_chars(s.trim(), MAX_SHEET_CHARS);
    if t.is_empty() { "Sheet".to_string() } else { t }
}

fn unique_sheet_name(base: &str, used: &mut HashSet<String>) -> String {
    let candidate = sanitize_sheet_name(base);
    if used.insert(candidate.clone()) { return candidate; }
    // " (2)", " (3)" ... while staying within the sheet-name limit
    let mut idx: u32 = 2;
    loop {
        let suffix = format!(" ({idx})");
        let base = truncate_chars(&candidate, MAX_SHEET_CHARS.saturating_sub(suffix.chars().count()));
        let cand = format!("{base}{suffix}");
        if used.insert(cand.clone()) { return cand; }
        idx += 1;
    }
}

/// Pretty JSON to `output`, or to stdout when no path is given.
pub fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(file, value).context("failed to encode JSON")?;
        }
        None => {
            let mut out = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut out, value).context("failed to encode JSON")?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn is_workbook_path(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
}

struct Sheets {
    wb: Workbook,
    used: HashSet<String>,
}

impl Sheets {
    fn new() -> Self { Self { wb: Workbook::new(), used: HashSet::new() } }

    fn add(&mut self, name: &str, headers: &[&str]) -> Result<&mut Worksheet> {
        let sname = unique_sheet_name(name, &mut self.used);
        let ws = self.wb.add_worksheet().set_name(&sname)?;
        for (c, h) in headers.iter().enumerate() { ws.write_string(0, c as u16, *h)?; }
        Ok(ws)
    }

    fn save(mut self, output: &Path) -> Result<()> {
        self.wb.save(output).with_context(|| format!("failed to save workbook: {}", output.display()))?;
        Ok(())
    }
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, v: &str) -> Result<()> {
    ws.write_string(row, col, truncate_chars(v, MAX_CELL_CHARS))?;
    Ok(())
}

fn write_kpi(ws: &mut Worksheet, row: u32, name: &str, kpi: &DurationKpi) -> Result<()> {
    ws.write_string(row, 0, name)?;
    ws.write_number(row, 1, kpi.hours)?;
    ws.write_number(row, 2, kpi.count as f64)?;
    Ok(())
}

fn write_percentage(ws: &mut Worksheet, row: u32, name: &str, value: f64) -> Result<()> {
    ws.write_string(row, 0, name)?;
    if value == NOT_APPLICABLE { ws.write_string(row, 1, "N/A")?; } else { ws.write_number(row, 1, value)?; }
    Ok(())
}

fn write_kpis(sheets: &mut Sheets, r: &DashboardResult) -> Result<()> {
    let ws = sheets.add("KPIs", &["Metric", "Value", "Samples"])?;
    let mut row = 1u32;
    ws.write_string(row, 0, "Report")?;
    ws.write_string(row, 1, r.report_type.to_string())?;
    row += 1;
    if let Some(mtta) = &r.kpis.mtta {
        write_kpi(ws, row, "MTTA (hours)", mtta)?;
        row += 1;
    }
    write_kpi(ws, row, "MTTI (hours)", &r.kpis.mtti)?;
    write_kpi(ws, row + 1, "MTTR (hours)", &r.kpis.mttr)?;
    row += 2;
    for (name, value) in [("FTR (%)", r.kpis.ftr), ("SLA (%)", r.kpis.sla)] {
        if let Some(v) = value {
            write_percentage(ws, row, name, v)?;
            row += 1;
        }
    }
    let counts = [
        ("Total tickets", r.kpis.total_tickets),
        ("Pending", r.kpis.pending),
        ("Pending without created time", r.kpis.pending_undated),
        ("Invalid", r.invalid_rows.len()),
        ("Failed", r.failed),
        ("Cancelled", r.cancelled),
        ("Unclassified", r.unclassified),
    ];
    for (name, n) in counts {
        ws.write_string(row, 0, name)?;
        ws.write_number(row, 1, n as f64)?;
        row += 1;
    }
    Ok(())
}

fn write_monthly(sheets: &mut Sheets, r: &DashboardResult) -> Result<()> {
    let ws = sheets.add("Monthly", &["Month", "MTTI (hours)", "MTTR (hours)", "Volume"])?;
    for (i, m) in r.monthly_data.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, &m.month)?;
        ws.write_number(row, 1, m.mtti)?;
        ws.write_number(row, 2, m.mttr)?;
        ws.write_number(row, 3, m.volume as f64)?;
    }
    Ok(())
}

fn write_breakdown_rows(ws: &mut Worksheet, start: u32, label: &str, items: &[BreakdownItem]) -> Result<u32> {
    let mut row = start;
    for item in items {
        ws.write_string(row, 0, label)?;
        ws.write_string(row, 1, &item.name)?;
        ws.write_number(row, 2, item.count as f64)?;
        row += 1;
    }
    Ok(row)
}

fn write_breakdowns(sheets: &mut Sheets, r: &DashboardResult) -> Result<()> {
    let ws = sheets.add("Breakdowns", &["Dimension", "Name", "Count"])?;
    let row = write_breakdown_rows(ws, 1, "Technician", &r.breakdowns.technician)?;
    let row = write_breakdown_rows(ws, row, "Category", &r.breakdowns.category)?;
    write_breakdown_rows(ws, row, "Sub Category", &r.breakdowns.sub_category)?;
    Ok(())
}

fn write_pending(sheets: &mut Sheets, name: &str, jobs: &[PendingJob]) -> Result<()> {
    let ws = sheets.add(name, &["Request ID", "Technician", "Category", "Created", "Pending (hours)"])?;
    for (i, j) in jobs.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, &j.req_id)?;
        ws.write_string(row, 1, &j.technician)?;
        ws.write_string(row, 2, &j.category)?;
        ws.write_string(row, 3, j.created_time.format("%d/%m/%Y %H:%M").to_string())?;
        ws.write_number(row, 4, j.pending_duration_hours)?;
    }
    Ok(())
}

fn write_invalid(sheets: &mut Sheets, r: &DashboardResult) -> Result<()> {
    let mut headers: Vec<&str> = vec!["Reason"];
    headers.extend(r.headers.iter().map(String::as_str));
    let ws = sheets.add("Invalid", &headers)?;
    for (i, inv) in r.invalid_rows.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, &inv.reason)?;
        for (c, v) in inv.row_data.iter().enumerate() { write_cell(ws, row, (c + 1) as u16, v)?; }
    }
    Ok(())
}

fn write_rows(sheets: &mut Sheets, r: &DashboardResult) -> Result<()> {
    let headers: Vec<&str> = r.headers.iter().map(String::as_str).collect();
    let ws = sheets.add("Rows", &headers)?;
    for (i, cells) in r.all_rows.iter().enumerate() {
        for (c, v) in cells.iter().enumerate() { write_cell(ws, (i + 1) as u32, c as u16, v)?; }
    }
    Ok(())
}

fn write_departments(sheets: &mut Sheets, r: &DashboardResult) -> Result<()> {
    let Some(d) = &r.departments else { return Ok(()) };

    let ws = sheets.add("Departments", &["Department", "Pending", "Completed", "Failed", "Cancelled"])?;
    let depts: [(&str, &DepartmentCounts); 2] = [("Installations", &d.installations), ("Fault Repair", &d.faults)];
    for (i, (name, c)) in depts.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, *name)?;
        for (col, n) in [c.pending, c.completed, c.failed, c.cancelled].into_iter().enumerate() {
            ws.write_number(row, (col + 1) as u16, n as f64)?;
        }
    }
    ws.write_string(4, 0, "Relocations")?;
    ws.write_number(4, 1, d.relocations as f64)?;
    ws.write_string(5, 0, "Reassociations")?;
    ws.write_number(5, 1, d.reassociations as f64)?;

    let ws = sheets.add("Hardware", &["Department", "Item", "Jobs (%)", "Total used"])?;
    let mut row = 1u32;
    let usage: [(&str, &[HardwareUsageItem]); 2] =
        [("Installations", &d.hardware_usage.installations), ("Fault Repair", &d.hardware_usage.faults)];
    for (dept, items) in usage {
        for item in items {
            ws.write_string(row, 0, dept)?;
            ws.write_string(row, 1, &item.name)?;
            ws.write_number(row, 2, item.percentage)?;
            ws.write_number(row, 3, item.total_used)?;
            row += 1;
        }
    }

    let ws = sheets.add("Cancellations", &["Department", "Reason", "Count"])?;
    let row = write_breakdown_rows(ws, 1, "Installations", &d.cancellation_reasons.installations)?;
    write_breakdown_rows(ws, row, "Fault Repair", &d.cancellation_reasons.faults)?;

    write_pending(sheets, "Pending Installations", &d.pending_jobs.installations)?;
    write_pending(sheets, "Pending Faults", &d.pending_jobs.faults)?;
    Ok(())
}

/// One workbook, one sheet per dashboard section.
pub fn write_dashboard_workbook(r: &DashboardResult, output: &Path) -> Result<()> {
    let mut sheets = Sheets::new();
    write_kpis(&mut sheets, r)?;
    write_monthly(&mut sheets, r)?;
    write_breakdowns(&mut sheets, r)?;
    write_pending(&mut sheets, "Pending", &r.pending_jobs)?;
    write_invalid(&mut sheets, r)?;
    write_departments(&mut sheets, r)?;
    write_rows(&mut sheets, r)?;
    sheets.save(output)
}

pub fn write_faults_workbook(scenarios: &[FaultScenario], output: &Path) -> Result<()> {
    let mut sheets = Sheets::new();
    let ws = sheets.add("Fault Scenarios", &["Fault", "Cause", "Solution", "Count", "Share (%)"])?;
    for (i, s) in scenarios.iter().enumerate() {
        let row = (i + 1) as u32;
        ws.write_string(row, 0, &s.fault)?;
        ws.write_string(row, 1, &s.cause)?;
        ws.write_string(row, 2, &s.solution)?;
        ws.write_number(row, 3, s.count as f64)?;
        ws.write_number(row, 4, s.percentage)?;
    }
    sheets.save(output)
}
