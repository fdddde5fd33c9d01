//! Reduce every job identifier to one canonical record.
//!
//! Exports routinely repeat a job with stale intermediate statuses after it
//! was closed, so a terminal-success row always represents the job once one
//! exists. Otherwise the most recently created row wins, with the status
//! priority table breaking ties.

use crate::record::JobRecord;
use crate::schema::ReportConfiguration;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Group records by identifier, keeping first-seen order of identifiers.
/// Records with a blank identifier are dropped.
pub fn group_by_id(records: Vec<JobRecord>) -> Vec<Vec<JobRecord>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<JobRecord>> = Vec::new();
    for r in records {
        if r.id.is_empty() { continue; }
        match index.get(&r.id) {
            Some(&i) => groups[i].push(r),
            None => {
                index.insert(r.id.clone(), groups.len());
                groups.push(vec![r]);
            }
        }
    }
    groups
}

// Unparseable created times compare lowest so they never beat a real date.
fn newer_first(a: &JobRecord, b: &JobRecord) -> Ordering { b.created.cmp(&a.created) }

/// Pick the canonical record of one job. Equal candidates resolve to the
/// one seen first.
pub fn canonical(mut group: Vec<JobRecord>, config: &ReportConfiguration) -> Option<JobRecord> {
    if group.iter().any(|r| config.is_success(&r.status)) {
        group.retain(|r| config.is_success(&r.status));
        group.sort_by(newer_first);
    } else {
        group.sort_by(|a, b| {
            newer_first(a, b).then_with(|| config.priority(&b.status).cmp(&config.priority(&a.status)))
        });
    }
    group.into_iter().next()
}

pub fn deduplicate(records: Vec<JobRecord>, config: &ReportConfiguration) -> Vec<JobRecord> {
    let total = records.len();
    let out: Vec<JobRecord> = group_by_id(records)
        .into_iter()
        .filter_map(|g| canonical(g, config))
        .collect();
    tracing::debug!(rows = total, jobs = out.len(), "deduplicated");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::schema::{DPLUS, ICT};

    fn rec(id: &str, status: &str, created: &str, tag: &str) -> JobRecord {
        JobRecord {
            row: vec![tag.to_string()],
            id: id.to_string(),
            status: status.to_string(),
            assignee: String::new(),
            category: String::new(),
            sub_category: String::new(),
            job_type: String::new(),
            cancel_reason: String::new(),
            stock: String::new(),
            sla_overdue: String::new(),
            first_response_overdue: String::new(),
            created: parse_date(created),
            assigned: None,
            finished: None,
        }
    }

    #[test]
    fn success_row_beats_newer_intermediate_rows() {
        let out = deduplicate(
            vec![
                rec("1", "closed", "01/01/2024 10:00", "old-closed"),
                rec("1", "in progress", "05/01/2024 10:00", "newer-open"),
                rec("1", "resolved", "03/01/2024 10:00", "resolved"),
            ],
            &ICT,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].row[0], "resolved");
    }

    #[test]
    fn unparseable_success_row_never_wins_over_dated_one() {
        let out = deduplicate(
            vec![rec("1", "completed", "garbage", "undated"), rec("1", "completed", "02/01/2024 08:00", "dated")],
            &DPLUS,
        );
        assert_eq!(out[0].row[0], "dated");
    }

    #[test]
    fn latest_created_wins_without_success() {
        let out = deduplicate(
            vec![rec("9", "failed", "01/01/2024 10:00", "older"), rec("9", "created", "02/01/2024 10:00", "newer")],
            &DPLUS,
        );
        assert_eq!(out[0].row[0], "newer");
    }

    #[test]
    fn ties_break_on_status_priority() {
        let out = deduplicate(
            vec![
                rec("9", "confirmed", "01/01/2024 10:00", "confirmed"),
                rec("9", "cancelled", "01/01/2024 10:00", "cancelled"),
                rec("9", "failed", "01/01/2024 10:00", "failed"),
            ],
            &DPLUS,
        );
        assert_eq!(out[0].row[0], "cancelled");

        let undated = deduplicate(vec![rec("3", "created", "", "a"), rec("3", "failed", "", "b")], &DPLUS);
        assert_eq!(undated[0].row[0], "b");
    }

    #[test]
    fn one_record_per_identifier_in_first_seen_order() {
        let out = deduplicate(
            vec![
                rec("b", "open", "", "b1"),
                rec("a", "open", "", "a1"),
                rec("", "open", "", "blank-id"),
                rec("b", "open", "", "b2"),
            ],
            &ICT,
        );
        let ids: Vec<&str> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(out[0].row[0], "b1");
    }
}
