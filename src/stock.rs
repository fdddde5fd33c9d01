//! Hardware usage from the free-text `StockSelected` field of completed jobs.
//!
//! Each comma-separated token is matched against [`QUANTITY_PATTERNS`] in
//! order; the first match supplies name and quantity, otherwise the whole
//! token is the name with quantity 1. Serial numbers are stripped afterwards
//! so the same item from different jobs lands in one bucket.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

/// One quantity-extraction rule: which capture groups hold the name and the
/// number.
pub struct QuantityPattern {
    pub regex: Regex,
    pub name_group: usize,
    pub qty_group: usize,
}

fn pattern(re: &str, name_group: usize, qty_group: usize) -> QuantityPattern {
    QuantityPattern { regex: Regex::new(re).expect("valid quantity pattern"), name_group, qty_group }
}

/// Evaluated top to bottom; first match wins.
pub static QUANTITY_PATTERNS: Lazy<Vec<QuantityPattern>> = Lazy::new(|| {
    vec![
        // Cable (x3), Cable (5m)
        pattern(r"(?i)^(.*?)\s*\((?:x)?(\d+(?:\.\d+)?)(?:m|ft|meters?)?\s*\)$", 1, 2),
        // 2m Cable
        pattern(r"(?i)^(\d+(?:\.\d+)?)\s*(?:m|ft|meters?)?\s+(.*)$", 2, 1),
        // Cable x 4
        pattern(r"(?i)^(.*?)\s*x\s*(\d+(?:\.\d+)?)$", 1, 2),
        // Cable - 5
        pattern(r"(?i)^(.*?)\s*-\s*(\d+(?:\.\d+)?)$", 1, 2),
    ]
});

static SERIAL_NOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*\((s/n|sn)[^)]+\)").expect("valid serial pattern"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockItem {
    pub name: String,
    pub qty: f64,
}

fn looks_like_serial(word: &str) -> bool {
    let has_alpha = word.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = word.chars().any(|c| c.is_ascii_digit());
    (word.chars().count() > 8 && has_alpha && has_digit) || (word.len() >= 10 && word.chars().all(|c| c.is_ascii_digit()))
}

fn clean_name(name: &str) -> String {
    let name = SERIAL_NOTE.replace_all(name, "").trim().to_string();
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.split_last() {
        Some((last, rest)) if !rest.is_empty() && looks_like_serial(last) => rest.join(" "),
        _ => name,
    }
}

/// Parse one inventory token. Blank tokens and tokens that clean down to
/// nothing yield `None`.
pub fn parse_token(token: &str) -> Option<StockItem> {
    let token = token.trim();
    if token.is_empty() { return None; }
    let (raw_name, qty) = QUANTITY_PATTERNS
        .iter()
        .find_map(|p| {
            let caps = p.regex.captures(token)?;
            let qty = caps.get(p.qty_group)?.as_str().parse::<f64>().ok()?;
            Some((caps.get(p.name_group)?.as_str().trim().to_string(), qty))
        })
        .unwrap_or_else(|| (token.to_string(), 1.0));
    let name = clean_name(&raw_name);
    if name.is_empty() { None } else { Some(StockItem { name, qty }) }
}

/// Items of one job with repeated names summed, in first-seen order.
pub fn parse_job_stock(field: &str) -> Vec<StockItem> {
    let mut out: Vec<StockItem> = Vec::new();
    for item in field.split(',').filter_map(parse_token) {
        match out.iter_mut().find(|i| i.name == item.name) {
            Some(existing) => existing.qty += item.qty,
            None => out.push(item),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareUsageItem {
    pub name: String,
    /// Share of applicable jobs that used the item, 0–100.
    pub percentage: f64,
    pub total_used: f64,
}

/// Cross-job accumulator for one department.
#[derive(Debug, Clone, Default)]
pub struct StockUsage {
    jobs: usize,
    order: Vec<String>,
    stats: HashMap<String, (usize, f64)>,
}

impl StockUsage {
    /// Count an applicable job, with or without an inventory string.
    pub fn add_job(&mut self, field: &str) {
        self.jobs += 1;
        for item in parse_job_stock(field) {
            let e = self.stats.entry(item.name.clone()).or_insert_with(|| {
                self.order.push(item.name.clone());
                (0, 0.0)
            });
            e.0 += 1;
            e.1 += item.qty;
        }
    }

    /// Usage sorted by total quantity, highest first; empty when no
    /// applicable job was seen.
    pub fn into_items(self) -> Vec<HardwareUsageItem> {
        if self.jobs == 0 { return Vec::new(); }
        let jobs = self.jobs as f64;
        let mut items: Vec<HardwareUsageItem> = self
            .order
            .into_iter()
            .filter_map(|name| {
                let (job_count, total) = *self.stats.get(&name)?;
                Some(HardwareUsageItem { name, percentage: job_count as f64 / jobs * 100.0, total_used: total })
            })
            .collect();
        items.sort_by(|a, b| b.total_used.partial_cmp(&a.total_used).unwrap_or(std::cmp::Ordering::Equal));
        items
    }
}
