//! Duration KPIs, monthly series and categorical breakdowns over the
//! filtered valid terminal rows.

use crate::dates::{hours_between, month_label, sort_month_labels};
use crate::record::JobRecord;
use crate::schema::{DurationModel, ReportConfiguration, FAULT_REPAIR, STANDALONE_INSTALL_JOB_TYPE};
use crate::stock::{HardwareUsageItem, StockUsage};
use crate::tally::{BreakdownItem, Tally};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;

/// Value reported for FTR/SLA when the export cannot support the metric.
pub const NOT_APPLICABLE: f64 = -1.0;

#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    /// Add an elapsed span; negative spans are bad data and are skipped.
    fn push(&mut self, hours: f64) -> bool {
        if hours < 0.0 { return false; }
        self.sum += hours;
        self.count += 1;
        true
    }

    fn value(&self) -> f64 { if self.count > 0 { self.sum / self.count as f64 } else { 0.0 } }

    fn kpi(&self) -> DurationKpi { DurationKpi { hours: self.value(), count: self.count } }
}

fn span(start: Option<&NaiveDateTime>, end: Option<&NaiveDateTime>) -> Option<f64> {
    Some(hours_between(start?, end?))
}

/// Mean elapsed hours plus the number of samples behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationKpi {
    pub hours: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub month: String,
    pub mtti: f64,
    pub mttr: f64,
    pub volume: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdowns {
    pub technician: Vec<BreakdownItem>,
    pub category: Vec<BreakdownItem>,
    pub sub_category: Vec<BreakdownItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HardwareUsage {
    pub installations: Vec<HardwareUsageItem>,
    pub faults: Vec<HardwareUsageItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregates {
    /// Only reports with an assignment timestamp have MTTA.
    pub mtta: Option<DurationKpi>,
    pub mtti: DurationKpi,
    pub mttr: DurationKpi,
    /// `None` when the report family has no such metric at all.
    pub ftr: Option<f64>,
    pub sla: Option<f64>,
    pub total_tickets: usize,
    pub monthly: Vec<MonthlyBucket>,
    pub breakdowns: Breakdowns,
    pub hardware: Option<HardwareUsage>,
}

#[derive(Default)]
struct MonthAcc {
    mtti: Mean,
    mttr: Mean,
    volume: usize,
}

#[derive(Default)]
struct Months {
    order: Vec<String>,
    by_label: HashMap<String, MonthAcc>,
}

impl Months {
    fn bucket(&mut self, finished: &NaiveDateTime) -> &mut MonthAcc {
        let label = month_label(finished);
        if !self.by_label.contains_key(&label) { self.order.push(label.clone()); }
        self.by_label.entry(label).or_default()
    }

    fn into_buckets(mut self) -> Vec<MonthlyBucket> {
        let mut out: Vec<MonthlyBucket> = self
            .order
            .drain(..)
            .filter_map(|month| {
                let acc = self.by_label.remove(&month)?;
                Some(MonthlyBucket { month, mtti: acc.mtti.value(), mttr: acc.mttr.value(), volume: acc.volume })
            })
            .collect();
        sort_month_labels(&mut out, |b| b.month.as_str());
        out
    }
}

pub struct MetricsAggregator<'a> {
    config: &'a ReportConfiguration,
    has_sla: bool,
    has_ftr: bool,
}

impl<'a> MetricsAggregator<'a> {
    /// `has_sla`/`has_ftr` say whether the detected header carries the
    /// overdue-status columns.
    pub fn new(config: &'a ReportConfiguration, has_sla: bool, has_ftr: bool) -> Self {
        Self { config, has_sla, has_ftr }
    }

    pub fn aggregate(&self, rows: &[&JobRecord]) -> Aggregates {
        match self.config.duration_model {
            DurationModel::Lifecycle => self.lifecycle(rows),
            DurationModel::Departmental => self.departmental(rows),
        }
    }

    fn lifecycle(&self, rows: &[&JobRecord]) -> Aggregates {
        let (mut mtta, mut mtti, mut mttr) = (Mean::default(), Mean::default(), Mean::default());
        let (mut ftr_met, mut sla_met, mut sla_applicable) = (0usize, 0usize, 0usize);
        let (mut techs, mut cats, mut subs) = (Tally::default(), Tally::default(), Tally::default());
        let mut months = Months::default();

        for r in rows {
            techs.add(&r.assignee);
            cats.add(&r.category);
            subs.add(&r.sub_category);

            if let Some(h) = span(r.created.as_ref(), r.assigned.as_ref()) { mtta.push(h); }
            if let Some(h) = span(r.created.as_ref(), r.finished.as_ref()) { mtti.push(h); }
            if let Some(h) = span(r.assigned.as_ref(), r.finished.as_ref()) { mttr.push(h); }

            if self.has_ftr && r.first_response_overdue == "false" { ftr_met += 1; }
            if self.has_sla && !r.sla_overdue.is_empty() {
                sla_applicable += 1;
                if r.sla_overdue == "false" { sla_met += 1; }
            }

            if let Some(closed) = &r.finished {
                let m = months.bucket(closed);
                m.volume += 1;
                if let Some(h) = span(r.created.as_ref(), Some(closed)) { m.mtti.push(h); }
                if let Some(h) = span(r.assigned.as_ref(), Some(closed)) { m.mttr.push(h); }
            }
        }

        let total = rows.len();
        let ftr = if !self.has_ftr {
            NOT_APPLICABLE
        } else if total > 0 {
            ftr_met as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let sla = if self.has_sla && sla_applicable > 0 {
            sla_met as f64 / sla_applicable as f64 * 100.0
        } else {
            NOT_APPLICABLE
        };

        Aggregates {
            mtta: Some(mtta.kpi()),
            mtti: mtti.kpi(),
            mttr: mttr.kpi(),
            ftr: Some(ftr),
            sla: Some(sla),
            total_tickets: total,
            monthly: months.into_buckets(),
            breakdowns: Breakdowns {
                technician: techs.into_breakdown(),
                category: cats.into_breakdown(),
                sub_category: subs.into_breakdown(),
            },
            hardware: None,
        }
    }

    fn departmental(&self, rows: &[&JobRecord]) -> Aggregates {
        let (mut install, mut repair) = (Mean::default(), Mean::default());
        let (mut techs, mut depts) = (Tally::default(), Tally::default());
        let (mut install_stock, mut fault_stock) = (StockUsage::default(), StockUsage::default());
        let mut months = Months::default();

        for r in rows {
            techs.add(r.assignee_or_unassigned());
            depts.add(&r.category);

            let (Some(created), Some(finished)) = (&r.created, &r.finished) else { continue };
            let hours = hours_between(created, finished);
            if hours < 0.0 { continue; }

            let is_fault = r.category == FAULT_REPAIR;
            let m = months.bucket(finished);
            m.volume += 1;
            if is_fault {
                repair.push(hours);
                m.mttr.push(hours);
                fault_stock.add_job(&r.stock);
            } else {
                install.push(hours);
                m.mtti.push(hours);
                if r.job_type == STANDALONE_INSTALL_JOB_TYPE { install_stock.add_job(&r.stock); }
            }
        }

        Aggregates {
            mtta: None,
            mtti: install.kpi(),
            mttr: repair.kpi(),
            ftr: None,
            sla: None,
            total_tickets: install.count + repair.count,
            monthly: months.into_buckets(),
            breakdowns: Breakdowns {
                technician: techs.into_breakdown(),
                category: depts.into_breakdown(),
                sub_category: Vec::new(),
            },
            hardware: Some(HardwareUsage { installations: install_stock.into_items(), faults: fault_stock.into_items() }),
        }
    }
}
