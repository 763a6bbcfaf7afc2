//! Aggregation engine.
//!
//! Pure, synchronous statistics over a snapshot of issue records scoped
//! to some jurisdiction. Every caller (dashboard, GP performance,
//! reports) goes through [`aggregate`] or the individual functions here
//! instead of re-deriving the formulas.
//!
//! Conventions reproduced deliberately, not unified:
//! - the dashboard's "resolved in last N days" windows on `created_at`
//!   ([`WindowedCounts::resolved_created_within`]);
//! - the GP-performance view windows on `resolved_at`
//!   ([`WindowedCounts::resolved_within`]).

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::issue::Issue;
use crate::types::Timestamp;

/// Milliseconds per day; day differences are `ceil(|diff| / MS_PER_DAY)`,
/// so any partial day counts as a full day and clock skew
/// (`resolved_at < created_at`) is tolerated via the absolute value.
pub const MS_PER_DAY: i64 = 86_400_000;

/// Default statistics window in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Default number of calendar months in the trend series.
pub const DEFAULT_TREND_MONTHS: usize = 6;

/// Fixed cyclic palette for category distribution charts, indexed by
/// descending-count sort position.
pub const CHART_PALETTE: [&str; 7] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#06b6d4", "#f97316",
];

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ---------------------------------------------------------------------------
// Basic counts
// ---------------------------------------------------------------------------

/// Headline counts over a set of issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IssueCounts {
    pub total: usize,
    /// Status in {resolved, closed}.
    pub resolved: usize,
    /// Status in {submitted, verified, assigned, in_progress}.
    pub pending: usize,
    /// Escalation flag set, regardless of current status.
    pub escalated: usize,
}

/// Compute headline counts.
pub fn basic_counts(issues: &[Issue]) -> IssueCounts {
    IssueCounts {
        total: issues.len(),
        resolved: issues.iter().filter(|i| i.status.is_resolved_like()).count(),
        pending: issues.iter().filter(|i| i.status.is_pending_like()).count(),
        escalated: issues.iter().filter(|i| i.escalated).count(),
    }
}

// ---------------------------------------------------------------------------
// Windowed counts
// ---------------------------------------------------------------------------

/// Counts restricted to a trailing window of `window_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowedCounts {
    pub window_days: i64,
    /// Counts over issues whose `created_at` falls in the window.
    pub created: IssueCounts,
    /// Resolved count windowed on `created_at` (dashboard convention).
    pub resolved_created_within: usize,
    /// Resolved count windowed on `resolved_at` (GP-performance convention).
    pub resolved_within: usize,
}

/// Compute both windowing conventions over the trailing `window_days`.
pub fn windowed_counts(issues: &[Issue], window_days: i64, now: Timestamp) -> WindowedCounts {
    let cutoff = now - chrono::Duration::days(window_days);

    let recent: Vec<Issue> = issues
        .iter()
        .filter(|i| i.created_at >= cutoff)
        .cloned()
        .collect();
    let created = basic_counts(&recent);

    let resolved_within = issues
        .iter()
        .filter(|i| i.status.is_resolved_like())
        .filter(|i| i.resolved_at.is_some_and(|t| t >= cutoff))
        .count();

    WindowedCounts {
        window_days,
        created,
        resolved_created_within: created.resolved,
        resolved_within,
    }
}

// ---------------------------------------------------------------------------
// Category distribution
// ---------------------------------------------------------------------------

/// One slice of the category distribution chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySlice {
    pub category: String,
    pub count: usize,
    /// `round(count / total * 100)`; 0 when the set is empty.
    pub percentage: u32,
    /// Palette color assigned by sort position.
    pub color: &'static str,
}

/// Group issues by category, sorted by count descending (category name
/// ascending on ties, so output is deterministic).
pub fn category_distribution(issues: &[Issue]) -> Vec<CategorySlice> {
    let total = issues.len();
    let mut groups: BTreeMap<&str, usize> = BTreeMap::new();
    for issue in issues {
        *groups.entry(issue.category.as_str()).or_insert(0) += 1;
    }

    let mut slices: Vec<(&str, usize)> = groups.into_iter().collect();
    slices.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    slices
        .into_iter()
        .enumerate()
        .map(|(idx, (category, count))| CategorySlice {
            category: category.to_string(),
            count,
            percentage: percent(count, total),
            color: CHART_PALETTE[idx % CHART_PALETTE.len()],
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Resolution time
// ---------------------------------------------------------------------------

/// Timestamp an issue counts as resolved at, for duration arithmetic.
/// First non-null wins: `resolved_at`, `updated_at`, `closed_at`, `now`.
pub fn resolved_equivalent(issue: &Issue, now: Timestamp) -> Timestamp {
    issue
        .resolved_at
        .or(issue.updated_at)
        .or(issue.closed_at)
        .unwrap_or(now)
}

/// Whole days between two timestamps: any partial day rounds up, and the
/// difference is taken absolute so reversed clocks do not panic or go
/// negative.
pub fn ceil_days_between(a: Timestamp, b: Timestamp) -> i64 {
    let ms = (a - b).num_milliseconds().abs();
    (ms as f64 / MS_PER_DAY as f64).ceil() as i64
}

/// Average resolution time in days over the resolved/closed subset,
/// rounded to the nearest day. Zero (never NaN) when nothing is resolved.
pub fn average_resolution_days(issues: &[Issue], now: Timestamp) -> i64 {
    let durations: Vec<i64> = issues
        .iter()
        .filter(|i| i.status.is_resolved_like())
        .map(|i| ceil_days_between(resolved_equivalent(i, now), i.created_at))
        .collect();

    if durations.is_empty() {
        return 0;
    }
    let sum: i64 = durations.iter().sum();
    (sum as f64 / durations.len() as f64).round() as i64
}

// ---------------------------------------------------------------------------
// Per-group performance
// ---------------------------------------------------------------------------

/// Performance of one group (a panchayat or a category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupPerformance {
    pub key: String,
    pub total: usize,
    pub resolved: usize,
    /// `total - resolved` (includes escalated and rejected issues).
    pub pending: usize,
    /// `round(resolved / total * 100)`; 0 when the group is empty.
    pub resolution_rate: u32,
    pub average_days: i64,
}

/// Group issues by `key_fn` and rank by resolution rate descending
/// (key ascending on ties). The full list is returned; display-layer
/// truncation (top 8 dashboard, top 10 chart) is the caller's concern.
pub fn group_performance<F>(issues: &[Issue], key_fn: F, now: Timestamp) -> Vec<GroupPerformance>
where
    F: Fn(&Issue) -> String,
{
    let mut groups: BTreeMap<String, Vec<&Issue>> = BTreeMap::new();
    for issue in issues {
        groups.entry(key_fn(issue)).or_default().push(issue);
    }

    let mut performance: Vec<GroupPerformance> = groups
        .into_iter()
        .map(|(key, members)| {
            let total = members.len();
            let resolved = members
                .iter()
                .filter(|i| i.status.is_resolved_like())
                .count();
            let durations: Vec<i64> = members
                .iter()
                .filter(|i| i.status.is_resolved_like())
                .map(|i| ceil_days_between(resolved_equivalent(i, now), i.created_at))
                .collect();
            let average_days = if durations.is_empty() {
                0
            } else {
                (durations.iter().sum::<i64>() as f64 / durations.len() as f64).round() as i64
            };
            GroupPerformance {
                total,
                resolved,
                pending: total - resolved,
                resolution_rate: percent(resolved, total),
                average_days,
                key,
            }
        })
        .collect();

    performance.sort_by(|a, b| {
        b.resolution_rate
            .cmp(&a.resolution_rate)
            .then(a.key.cmp(&b.key))
    });
    performance
}

/// Group by panchayat name (falling back to id, then "Unknown").
pub fn panchayat_performance(issues: &[Issue], now: Timestamp) -> Vec<GroupPerformance> {
    group_performance(
        issues,
        |i| {
            i.location
                .panchayat_name
                .clone()
                .or_else(|| i.location.panchayat_id.map(|id| id.to_string()))
                .unwrap_or_else(|| "Unknown".to_string())
        },
        now,
    )
}

/// Group by category.
pub fn category_performance(issues: &[Issue], now: Timestamp) -> Vec<GroupPerformance> {
    group_performance(issues, |i| i.category.clone(), now)
}

// ---------------------------------------------------------------------------
// Monthly trend
// ---------------------------------------------------------------------------

/// One calendar-month bucket of the trend series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    /// e.g. `"Mar 2026"`.
    pub label: String,
    pub year: i32,
    /// 1-based month.
    pub month: u32,
    pub created: usize,
    pub resolved: usize,
    pub escalated: usize,
    pub pending: usize,
}

/// Bucket issues into the most recent `months` calendar months (current
/// month included) by `created_at`. Counts within a bucket reflect the
/// issues' current state.
pub fn monthly_trend(issues: &[Issue], months: usize, now: Timestamp) -> Vec<TrendPoint> {
    let current = now.year() * 12 + now.month0() as i32;

    (0..months)
        .rev()
        .map(|back| {
            let absolute = current - back as i32;
            let year = absolute.div_euclid(12);
            let month0 = absolute.rem_euclid(12) as u32;

            let in_month: Vec<&Issue> = issues
                .iter()
                .filter(|i| i.created_at.year() == year && i.created_at.month0() == month0)
                .collect();

            TrendPoint {
                label: format!("{} {year}", MONTH_LABELS[month0 as usize]),
                year,
                month: month0 + 1,
                created: in_month.len(),
                resolved: in_month
                    .iter()
                    .filter(|i| i.status.is_resolved_like())
                    .count(),
                escalated: in_month.iter().filter(|i| i.escalated).count(),
                pending: in_month
                    .iter()
                    .filter(|i| i.status.is_pending_like())
                    .count(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Tunables for a full aggregation pass.
#[derive(Debug, Clone, Copy)]
pub struct AggregationOptions {
    pub window_days: i64,
    pub trend_months: usize,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            trend_months: DEFAULT_TREND_MONTHS,
        }
    }
}

/// Everything the dashboard and report surfaces consume in one pass.
///
/// `warnings` is populated by the data-access layer when a sub-query
/// degraded to an empty contribution; the numbers are then a lower bound
/// rather than wrong.
#[derive(Debug, Clone, Serialize)]
pub struct AggregationSnapshot {
    pub generated_at: Timestamp,
    pub counts: IssueCounts,
    pub windowed: WindowedCounts,
    pub distribution: Vec<CategorySlice>,
    pub average_resolution_days: i64,
    pub panchayat_performance: Vec<GroupPerformance>,
    pub trend: Vec<TrendPoint>,
    pub warnings: Vec<String>,
}

/// Run the full aggregation over one issue snapshot.
pub fn aggregate(issues: &[Issue], options: AggregationOptions, now: Timestamp) -> AggregationSnapshot {
    AggregationSnapshot {
        generated_at: now,
        counts: basic_counts(issues),
        windowed: windowed_counts(issues, options.window_days, now),
        distribution: category_distribution(issues),
        average_resolution_days: average_resolution_days(issues, now),
        panchayat_performance: panchayat_performance(issues, now),
        trend: monthly_trend(issues, options.trend_months, now),
        warnings: Vec::new(),
    }
}

/// `round(part / total * 100)`, guarding division by zero with 0.
fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::issue::{IssueStatus, Location, Priority};

    fn at(year: i32, month: u32, day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn issue(id: i64, category: &str, status: IssueStatus, created_at: Timestamp) -> Issue {
        Issue {
            id,
            display_id: format!("GS-{id:06}"),
            category: category.to_string(),
            priority: Priority::Medium,
            status,
            description: None,
            location: Location::default(),
            reporter_id: 1,
            assigned_worker: None,
            escalated: false,
            rejection_reason: None,
            resolution_notes: None,
            resolution_photo: None,
            created_at,
            updated_at: None,
            verified_at: None,
            assigned_at: None,
            in_progress_at: None,
            resolved_at: None,
            escalated_at: None,
            rejected_at: None,
            closed_at: None,
        }
    }

    fn in_panchayat(mut i: Issue, name: &str) -> Issue {
        i.location.panchayat_name = Some(name.to_string());
        i
    }

    #[test]
    fn test_basic_counts_partition() {
        let now = at(2024, 6, 1);
        let mut escalated = issue(4, "Road", IssueStatus::Assigned, now);
        escalated.escalated = true;
        let issues = vec![
            issue(1, "Water", IssueStatus::Submitted, now),
            issue(2, "Water", IssueStatus::Resolved, now),
            issue(3, "Road", IssueStatus::Closed, now),
            escalated,
        ];
        let counts = basic_counts(&issues);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.resolved, 2);
        assert_eq!(counts.pending, 2); // submitted + assigned
        assert_eq!(counts.escalated, 1);
    }

    #[test]
    fn test_escalated_flag_counts_regardless_of_status() {
        let now = at(2024, 6, 1);
        // Resolved after escalation: still counted as escalated.
        let mut i = issue(1, "Water", IssueStatus::Resolved, now);
        i.escalated = true;
        assert_eq!(basic_counts(&[i]).escalated, 1);
    }

    #[test]
    fn test_windowing_conventions_are_distinct() {
        let now = at(2024, 6, 30);
        // Created long ago, resolved recently: counted by resolved_within
        // but not by resolved_created_within.
        let mut old_created = issue(1, "Water", IssueStatus::Resolved, at(2024, 1, 1));
        old_created.resolved_at = Some(at(2024, 6, 20));

        // Created and resolved inside the window.
        let mut fresh = issue(2, "Water", IssueStatus::Resolved, at(2024, 6, 10));
        fresh.resolved_at = Some(at(2024, 6, 15));

        let windowed = windowed_counts(&[old_created, fresh], 30, now);
        assert_eq!(windowed.resolved_created_within, 1);
        assert_eq!(windowed.resolved_within, 2);
        assert_eq!(windowed.created.total, 1);
    }

    #[test]
    fn test_resolved_without_resolved_at_not_in_resolved_within() {
        let now = at(2024, 6, 30);
        let i = issue(1, "Water", IssueStatus::Resolved, at(2024, 6, 10));
        let windowed = windowed_counts(&[i], 30, now);
        assert_eq!(windowed.resolved_within, 0);
        assert_eq!(windowed.resolved_created_within, 1);
    }

    #[test]
    fn test_distribution_scenario_water_road() {
        let now = at(2024, 6, 1);
        let mut issues = Vec::new();
        for id in 0..6 {
            let status = if id < 5 {
                IssueStatus::Resolved
            } else {
                IssueStatus::Submitted
            };
            issues.push(issue(id, "Water", status, now));
        }
        for id in 6..10 {
            let status = if id < 8 {
                IssueStatus::Resolved
            } else {
                IssueStatus::Submitted
            };
            issues.push(issue(id, "Road", status, now));
        }

        let distribution = category_distribution(&issues);
        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution[0].category, "Water");
        assert_eq!(distribution[0].count, 6);
        assert_eq!(distribution[0].percentage, 60);
        assert_eq!(distribution[0].color, CHART_PALETTE[0]);
        assert_eq!(distribution[1].category, "Road");
        assert_eq!(distribution[1].count, 4);
        assert_eq!(distribution[1].percentage, 40);
        assert_eq!(distribution[1].color, CHART_PALETTE[1]);

        let performance = category_performance(&issues, now);
        let water = performance.iter().find(|g| g.key == "Water").unwrap();
        assert_eq!(water.resolved, 5);
        assert_eq!(water.total, 6);
        assert_eq!(water.resolution_rate, 83);
        let road = performance.iter().find(|g| g.key == "Road").unwrap();
        assert_eq!(road.resolved, 2);
        assert_eq!(road.total, 4);
        assert_eq!(road.resolution_rate, 50);
        // Ranked by rate descending.
        assert_eq!(performance[0].key, "Water");
    }

    #[test]
    fn test_distribution_percentages_sum_near_100() {
        let now = at(2024, 6, 1);
        let issues: Vec<Issue> = (0..7)
            .map(|id| {
                let category = match id % 3 {
                    0 => "Water",
                    1 => "Road",
                    _ => "Power",
                };
                issue(id, category, IssueStatus::Submitted, now)
            })
            .collect();
        let sum: u32 = category_distribution(&issues)
            .iter()
            .map(|s| s.percentage)
            .sum();
        assert!((99..=101).contains(&sum), "sum was {sum}");
    }

    #[test]
    fn test_distribution_percentages_exact_on_even_split() {
        let now = at(2024, 6, 1);
        let issues: Vec<Issue> = (0..10)
            .map(|id| {
                let category = if id < 5 { "Water" } else { "Road" };
                issue(id, category, IssueStatus::Submitted, now)
            })
            .collect();
        let sum: u32 = category_distribution(&issues)
            .iter()
            .map(|s| s.percentage)
            .sum();
        assert_eq!(sum, 100);
    }

    #[test]
    fn test_distribution_empty_set() {
        assert!(category_distribution(&[]).is_empty());
    }

    #[test]
    fn test_palette_cycles_past_seven_categories() {
        let now = at(2024, 6, 1);
        let issues: Vec<Issue> = (0..9)
            .map(|id| issue(id, &format!("Category{id}"), IssueStatus::Submitted, now))
            .collect();
        let distribution = category_distribution(&issues);
        assert_eq!(distribution[7].color, CHART_PALETTE[0]);
        assert_eq!(distribution[8].color, CHART_PALETTE[1]);
    }

    #[test]
    fn test_average_resolution_exact_days() {
        let now = at(2024, 6, 1);
        let mut i = issue(1, "Water", IssueStatus::Resolved, at(2024, 1, 1));
        i.resolved_at = Some(at(2024, 1, 4)); // D -> D+3, same time of day
        assert_eq!(average_resolution_days(&[i], now), 3);
    }

    #[test]
    fn test_average_resolution_updated_at_fallback() {
        let now = at(2024, 6, 1);
        let mut i = issue(1, "Water", IssueStatus::Resolved, at(2024, 1, 1));
        i.updated_at = Some(at(2024, 1, 5));
        assert_eq!(average_resolution_days(&[i], now), 4);
    }

    #[test]
    fn test_average_resolution_empty_is_zero() {
        let now = at(2024, 6, 1);
        assert_eq!(average_resolution_days(&[], now), 0);
        // Unresolved issues contribute nothing either.
        let pending = issue(1, "Water", IssueStatus::Submitted, at(2024, 1, 1));
        assert_eq!(average_resolution_days(&[pending], now), 0);
    }

    #[test]
    fn test_partial_day_rounds_up() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let resolved = Utc.with_ymd_and_hms(2024, 1, 2, 13, 0, 0).unwrap();
        assert_eq!(ceil_days_between(resolved, created), 2);
    }

    #[test]
    fn test_clock_skew_uses_absolute_difference() {
        let created = at(2024, 1, 10);
        let resolved = at(2024, 1, 7); // before created_at
        assert_eq!(ceil_days_between(resolved, created), 3);
    }

    #[test]
    fn test_group_rate_zero_total_is_zero() {
        assert_eq!(percent(0, 0), 0);
        let now = at(2024, 6, 1);
        assert!(group_performance(&[], |i| i.category.clone(), now).is_empty());
    }

    #[test]
    fn test_panchayat_performance_ranking_and_full_list() {
        let now = at(2024, 6, 1);
        let mut issues = Vec::new();
        // Alur: 2/2 resolved.
        issues.push(in_panchayat(issue(1, "Water", IssueStatus::Resolved, now), "Alur"));
        issues.push(in_panchayat(issue(2, "Road", IssueStatus::Closed, now), "Alur"));
        // Belur: 1/3 resolved.
        issues.push(in_panchayat(issue(3, "Water", IssueStatus::Resolved, now), "Belur"));
        issues.push(in_panchayat(issue(4, "Water", IssueStatus::Submitted, now), "Belur"));
        issues.push(in_panchayat(issue(5, "Road", IssueStatus::Assigned, now), "Belur"));
        // No panchayat recorded.
        issues.push(issue(6, "Power", IssueStatus::Submitted, now));

        let performance = panchayat_performance(&issues, now);
        assert_eq!(performance.len(), 3); // full list, no truncation
        assert_eq!(performance[0].key, "Alur");
        assert_eq!(performance[0].resolution_rate, 100);
        assert_eq!(performance[1].key, "Belur");
        assert_eq!(performance[1].resolution_rate, 33);
        assert_eq!(performance[1].pending, 2);
        assert_eq!(performance[2].key, "Unknown");
    }

    #[test]
    fn test_monthly_trend_buckets_and_year_boundary() {
        let now = at(2024, 2, 15);
        let issues = vec![
            issue(1, "Water", IssueStatus::Resolved, at(2023, 12, 5)),
            issue(2, "Water", IssueStatus::Submitted, at(2024, 1, 20)),
            issue(3, "Road", IssueStatus::Submitted, at(2024, 2, 1)),
            issue(4, "Road", IssueStatus::Submitted, at(2023, 8, 1)), // outside window
        ];
        let trend = monthly_trend(&issues, 6, now);
        assert_eq!(trend.len(), 6);
        assert_eq!(trend[0].label, "Sep 2023");
        assert_eq!(trend[5].label, "Feb 2024");

        let december = &trend[3];
        assert_eq!(december.label, "Dec 2023");
        assert_eq!(december.created, 1);
        assert_eq!(december.resolved, 1);

        let february = &trend[5];
        assert_eq!(february.created, 1);
        assert_eq!(february.pending, 1);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let now = at(2024, 6, 1);
        let mut issues = Vec::new();
        for id in 0..12 {
            let status = if id % 3 == 0 {
                IssueStatus::Resolved
            } else {
                IssueStatus::Submitted
            };
            let mut i = issue(id, if id % 2 == 0 { "Water" } else { "Road" }, status, at(2024, 5, 1 + id as u32));
            if status == IssueStatus::Resolved {
                i.resolved_at = Some(at(2024, 5, 10 + id as u32));
            }
            issues.push(in_panchayat(i, if id < 6 { "Alur" } else { "Belur" }));
        }

        let first = aggregate(&issues, AggregationOptions::default(), now);
        let second = aggregate(&issues, AggregationOptions::default(), now);
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }
}
