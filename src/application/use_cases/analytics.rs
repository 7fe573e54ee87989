use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::api_call::handle_api_call;
use crate::api_client::AnalyticsRecord;
use crate::context::CommandContext;

/// Number of alert types kept in the summary
const TOP_ALERT_TYPES: usize = 5;

/// Which analytics endpoint to query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsScope {
    Org,
    Repo(String),
}

/// Alert totals for one day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

/// Per-day totals plus the most frequent alert types over the window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub days: Vec<DailyTotals>,
    pub top_alert_types: Vec<(String, u64)>,
}

impl AnalyticsSummary {
    /// Aggregate raw records; records with an unreadable date are skipped
    pub fn from_records(records: &[AnalyticsRecord]) -> Self {
        let mut days: BTreeMap<NaiveDate, DailyTotals> = BTreeMap::new();
        let mut alert_types: BTreeMap<&str, u64> = BTreeMap::new();

        for record in records {
            let Some(date) = record_date(&record.created_at) else {
                tracing::debug!("Skipping analytics record dated {:?}", record.created_at);
                continue;
            };

            let day = days.entry(date).or_insert_with(|| DailyTotals {
                date,
                ..Default::default()
            });
            day.critical += record.total_critical_alerts;
            day.high += record.total_high_alerts;
            day.medium += record.total_medium_alerts;
            day.low += record.total_low_alerts;

            for (alert_type, count) in &record.top_five_alert_types {
                *alert_types.entry(alert_type.as_str()).or_default() += count;
            }
        }

        let mut top_alert_types: Vec<(String, u64)> = alert_types
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        // Stable sort keeps alphabetical order among equal counts
        top_alert_types.sort_by(|a, b| b.1.cmp(&a.1));
        top_alert_types.truncate(TOP_ALERT_TYPES);

        Self {
            days: days.into_values().collect(),
            top_alert_types,
        }
    }
}

fn record_date(created_at: &str) -> Option<NaiveDate> {
    created_at
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

pub struct AnalyticsUseCase;

impl AnalyticsUseCase {
    pub async fn execute(
        ctx: &CommandContext,
        scope: &AnalyticsScope,
        time: u32,
    ) -> Result<AnalyticsSummary> {
        let sdk = ctx.setup_sdk()?;
        let progress = ctx.progress("Fetching analytics data");

        let outcome = match scope {
            AnalyticsScope::Org => {
                handle_api_call(
                    sdk.get_org_analytics(time),
                    &progress,
                    "fetching analytics data",
                )
                .await
            }
            AnalyticsScope::Repo(repo) => {
                handle_api_call(
                    sdk.get_repo_analytics(repo, time),
                    &progress,
                    "fetching analytics data",
                )
                .await
            }
        };
        let records = outcome.into_result()?;
        progress.stop();

        Ok(AnalyticsSummary::from_records(&records))
    }
}
