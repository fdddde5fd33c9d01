use anyhow::{Context, Result};
use job_dashboard::Filters;
use std::{fs, path::Path};

/// Read a filter file such as `{"technician": "Ann", "month": "Jan'25"}`.
/// Keys are optional; `"All"` or `""` leave that filter off.
pub fn load_filters(path: &Path) -> Result<Filters> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read filter file: {}", path.display()))?;
    let filters: Filters = serde_json::from_str(&text).context("filter file is not valid JSON")?;
    Ok(filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_partial_filter_file() {
        let path = std::env::temp_dir().join(format!("job_dashboard_filters_{}.json", std::process::id()));
        fs::write(&path, r#"{"category": "All", "month": "Dec'24"}"#).unwrap();
        let f = load_filters(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(f.category(), None);
        assert_eq!(f.month(), Some("Dec'24"));
        assert_eq!(f.technician, None);
    }

    #[test]
    fn rejects_malformed_json() {
        let path = std::env::temp_dir().join(format!("job_dashboard_bad_filters_{}.json", std::process::id()));
        fs::write(&path, "{technician:").unwrap();
        let err = load_filters(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(err.to_string().contains("not valid JSON"));
    }
}
