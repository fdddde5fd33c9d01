use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use job_dashboard::record::RawRow;
use job_dashboard::schema::detect;
use std::{fs::File, path::{Path, PathBuf}};

fn xlsx_to_string<T: calamine::DataType>(cell: &T) -> String {
    // Date cells are rendered day-first so they go through the same parser as
    // exported text.
    if cell.is_datetime() || cell.is_datetime_iso() {
        if let Some(dt) = cell.as_datetime() { return dt.format("%d/%m/%Y %H:%M:%S").to_string(); }
    }
    if let Some(s) = cell.as_string() { return s; }
    if let Some(i) = cell.as_i64() { return i.to_string(); }
    if let Some(f) = cell.as_f64() {
        if (f.fract()).abs() < f64::EPSILON { return format!("{}", f as i64); }
        return f.to_string();
    }
    if let Some(b) = cell.get_bool() { return b.to_string(); }
    String::new()
}

fn load_excel(path: &Path) -> Result<Vec<RawRow>> {
    let mut wb = open_workbook_auto(path).with_context(|| format!("failed to open workbook: {}", path.display()))?;
    let name = wb
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("workbook has no sheets: {}", path.display()))?;
    let range = wb.worksheet_range(&name)?;
    Ok(range.rows().map(|r| r.iter().map(xlsx_to_string).collect()).collect())
}

fn load_csv(path: &Path) -> Result<Vec<RawRow>> {
    let file = File::open(path).with_context(|| format!("failed to open CSV: {}", path.display()))?;
    let mut rdr = ReaderBuilder::new().flexible(true).has_headers(false).from_reader(file);
    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec.with_context(|| format!("malformed CSV: {}", path.display()))?;
        rows.push(rec.iter().map(|v| v.to_string()).collect());
    }
    Ok(rows)
}

/// Read every row of an export as strings, header and preamble included.
pub fn load_table(path: &Path) -> Result<Vec<RawRow>> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" => load_excel(path),
        "csv" => load_csv(path),
        _ => {
            if path.is_file() {
                load_excel(path).or_else(|_| load_csv(path))
            } else {
                Err(anyhow::anyhow!("unsupported input: {}", path.display()))
            }
        }
    }
}

/// Join exports of the same report into one table with a single header.
///
/// The header offset is detected on the first table; every later table
/// contributes only the rows after that offset.
pub fn combine(mut tables: Vec<Vec<RawRow>>) -> Result<Vec<RawRow>> {
    if tables.is_empty() { anyhow::bail!("no input files"); }
    let rest = tables.split_off(1);
    let mut combined = tables.remove(0);
    if rest.is_empty() { return Ok(combined); }
    let header_row = detect(&combined).context("header detection on the first file failed")?.header_row;
    for (i, table) in rest.into_iter().enumerate() {
        let before = combined.len();
        combined.extend(table.into_iter().skip(header_row + 1));
        tracing::debug!(file = i + 2, rows = combined.len() - before, "appended file");
    }
    Ok(combined)
}

/// Load each path as its own table.
pub fn load_all(paths: &[PathBuf]) -> Result<Vec<Vec<RawRow>>> {
    paths
        .iter()
        .map(|p| load_table(p).with_context(|| format!("failed to read {}", p.display())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table(rows: &[&[&str]]) -> Vec<RawRow> {
        rows.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect()
    }

    const HEADER: &[&str] = &["Technician", "RequestID", "Request Status", "Assigned Time"];

    #[test]
    fn later_files_lose_their_preamble_and_header() {
        let a = table(&[&["Report A"], HEADER, &["Ann", "1", "Closed", ""]]);
        let b = table(&[&["Report B"], HEADER, &["Bob", "2", "Open", ""], &["Cid", "3", "Open", ""]]);
        let out = combine(vec![a, b]).unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(out[1][0], "Technician");
        assert_eq!(out[3][0], "Bob");
        assert_eq!(out[4][0], "Cid");
    }

    #[test]
    fn single_file_passes_through_untouched() {
        let a = table(&[&["no header here"]]);
        assert_eq!(combine(vec![a.clone()]).unwrap(), a);
        assert!(combine(vec![]).is_err());
    }

    #[test]
    fn first_file_without_header_fails_multi_file_join() {
        let a = table(&[&["x"]]);
        let b = table(&[HEADER]);
        assert!(combine(vec![a, b]).is_err());
    }

    #[test]
    fn csv_rows_are_read_raw_and_ragged() {
        let path = std::env::temp_dir().join(format!("job_dashboard_table_{}.csv", std::process::id()));
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, "Exported,").unwrap();
            writeln!(f, "Technician,RequestID,Request Status,Assigned Time").unwrap();
            writeln!(f, " Ann ,1,Closed").unwrap();
        }
        let rows = load_table(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].len(), 4);
        assert_eq!(rows[2], vec![" Ann ", "1", "Closed"]);
    }
}
