//! The engine session: load a table once, then render it under any number
//! of filter settings.

use crate::classify::{Classified, Classifier, DepartmentTally, InvalidRow, PendingJob};
use crate::dates::{month_label, sort_month_labels};
use crate::dedup::deduplicate;
use crate::filter::Filters;
use crate::metrics::{Breakdowns, DurationKpi, HardwareUsage, MetricsAggregator, MonthlyBucket};
use crate::record::{JobRecord, RawRow};
use crate::schema::{detect, ColumnIndex, Field, ReportConfiguration, ReportKind};
use crate::tally::BreakdownItem;
use crate::DashboardError;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtta: Option<DurationKpi>,
    pub mtti: DurationKpi,
    pub mttr: DurationKpi,
    /// Percentage, or -1 when the source column is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ftr: Option<f64>,
    /// Percentage, or -1 when the source column is missing or never filled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla: Option<f64>,
    pub total_tickets: usize,
    /// Listed pending jobs. For D+ the department totals also include the
    /// undated ones; read `pending + pendingUndated` for that figure.
    pub pending: usize,
    /// Pending jobs left out of the listing because their created time
    /// could not be read.
    pub pending_undated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentCounts {
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancellationReasons {
    pub installations: Vec<BreakdownItem>,
    pub faults: Vec<BreakdownItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentPendingJobs {
    pub installations: Vec<PendingJob>,
    pub faults: Vec<PendingJob>,
}

/// Output that only exists for department-split reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    pub installations: DepartmentCounts,
    pub faults: DepartmentCounts,
    pub relocations: usize,
    pub reassociations: usize,
    pub pending_jobs: DepartmentPendingJobs,
    pub cancellation_reasons: CancellationReasons,
    pub hardware_usage: HardwareUsage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResult {
    pub report_type: ReportKind,
    pub headers: Vec<String>,
    pub kpis: KpiMetrics,
    pub monthly_data: Vec<MonthlyBucket>,
    pub breakdowns: Breakdowns,
    pub invalid_rows: Vec<InvalidRow>,
    pub pending_jobs: Vec<PendingJob>,
    /// Source rows behind the KPIs after filtering.
    pub all_rows: Vec<RawRow>,
    pub all_technicians: Vec<String>,
    pub all_categories: Vec<String>,
    pub all_months: Vec<String>,
    pub failed: usize,
    pub cancelled: usize,
    pub unclassified: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departments: Option<DepartmentSummary>,
}

/// Filter choices offered to the caller, fixed per load.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub technicians: Vec<String>,
    pub categories: Vec<String>,
    pub months: Vec<String>,
}

fn filter_options(config: &ReportConfiguration, scoped: &[JobRecord]) -> FilterOptions {
    let technicians: BTreeSet<String> = scoped
        .iter()
        .map(|r| r.assignee_or_unassigned().to_string())
        .collect();
    let categories = config.fixed_categories().unwrap_or_else(|| {
        let set: BTreeSet<String> = scoped
            .iter()
            .filter(|r| r.category != "N/A")
            .map(|r| r.category.clone())
            .collect();
        set.into_iter().collect()
    });
    let mut months: Vec<String> = scoped
        .iter()
        .filter(|r| config.is_success(&r.status))
        .filter_map(|r| r.finished.as_ref().map(month_label))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    sort_month_labels(&mut months, |m| m.as_str());
    FilterOptions { technicians: technicians.into_iter().collect(), categories, months }
}

/// A loaded export: detection, deduplication and classification are done;
/// only filtering and aggregation run per [`Dashboard::render`].
#[derive(Debug, Clone)]
pub struct Dashboard {
    config: &'static ReportConfiguration,
    headers: Vec<String>,
    columns: ColumnIndex,
    options: FilterOptions,
    classified: Classified,
}

impl Dashboard {
    /// Load a raw table. `now` anchors pending durations.
    pub fn load(table: Vec<RawRow>, now: NaiveDateTime) -> Result<Self, DashboardError> {
        let detection = detect(&table)?;
        let header_row = detection.header_row;
        if table.len() < header_row + 2 { return Err(DashboardError::TooShort { header_row }); }
        let config = detection.config;

        let mut rows = table.into_iter().skip(header_row);
        let headers: Vec<String> = rows.next().unwrap_or_default().iter().map(|h| h.trim().to_string()).collect();
        let columns = ColumnIndex::resolve(&headers, config);

        let scoped: Vec<JobRecord> = rows
            .filter(|r| config.in_scope(r, &columns))
            .map(|r| JobRecord::from_row(r, &columns, config))
            .collect();
        tracing::debug!(report = %config.kind, rows = scoped.len(), "rows in scope");

        let options = filter_options(config, &scoped);
        let canonical = deduplicate(scoped, config);
        let classified = Classifier::new(config, columns.width(), now).classify(canonical);

        Ok(Self { config, headers, columns, options, classified })
    }

    pub fn report_kind(&self) -> ReportKind { self.config.kind }

    pub fn filter_options(&self) -> &FilterOptions { &self.options }

    /// Decided on the unfiltered load, so a filter matching nothing still
    /// renders an empty slice.
    pub fn has_tickets(&self) -> bool { self.classified.has_tickets() }

    /// Run filter and aggregation over the cached classification.
    pub fn render(&self, filters: &Filters) -> DashboardResult {
        let data = filters.apply(&self.classified.valid);
        let aggregator = MetricsAggregator::new(
            self.config,
            self.columns.has(Field::SlaOverdue),
            self.columns.has(Field::FirstResponseOverdue),
        );
        let agg = aggregator.aggregate(&data);
        let c = &self.classified;

        let departments = c.departments.as_ref().map(|d| {
            let counts = |t: &DepartmentTally| DepartmentCounts {
                pending: t.pending,
                completed: t.completed,
                failed: t.failed,
                cancelled: t.cancelled,
            };
            let (installations, faults) = d.cancellation_breakdowns();
            DepartmentSummary {
                installations: counts(&d.installations),
                faults: counts(&d.faults),
                relocations: d.relocations,
                reassociations: d.reassociations,
                pending_jobs: DepartmentPendingJobs {
                    installations: d.installations.pending_jobs.clone(),
                    faults: d.faults.pending_jobs.clone(),
                },
                cancellation_reasons: CancellationReasons { installations, faults },
                hardware_usage: agg.hardware.clone().unwrap_or_default(),
            }
        });

        DashboardResult {
            report_type: self.config.kind,
            headers: self.headers.clone(),
            kpis: KpiMetrics {
                mtta: agg.mtta,
                mtti: agg.mtti,
                mttr: agg.mttr,
                ftr: agg.ftr,
                sla: agg.sla,
                total_tickets: agg.total_tickets,
                pending: c.pending.len(),
                pending_undated: c.pending_undated,
            },
            monthly_data: agg.monthly,
            breakdowns: agg.breakdowns,
            invalid_rows: c.invalid.clone(),
            pending_jobs: c.pending.clone(),
            all_rows: data.iter().map(|r| r.row.clone()).collect(),
            all_technicians: self.options.technicians.clone(),
            all_categories: self.options.categories.clone(),
            all_months: self.options.months.clone(),
            failed: c.failed,
            cancelled: c.cancelled,
            unclassified: c.unclassified,
            departments,
        }
    }
}
