//! Report projection.
//!
//! Maps an aggregation snapshot (and raw issues) into exportable form:
//! flat rows for CSV, a nested JSON summary document, and a multi-sheet
//! workbook structure. Pure transformation; serializing bytes and
//! triggering downloads happen at the API boundary.
//!
//! Numbers are carried over from the snapshot verbatim. Rounding happens
//! once, in the aggregation engine, so displayed and exported figures
//! can never drift.

use serde::Serialize;
use serde_json::json;

use crate::aggregation::AggregationSnapshot;
use crate::issue::Issue;
use crate::types::Timestamp;

/// One tabular sheet of a report workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn date(t: Option<Timestamp>) -> String {
    t.map(|t| t.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

/// Flat per-issue rows; the payload of the CSV export.
pub fn issues_sheet(issues: &[Issue]) -> ReportSheet {
    let headers = vec![
        "Issue ID".to_string(),
        "Category".to_string(),
        "Priority".to_string(),
        "Status".to_string(),
        "District".to_string(),
        "Panchayat".to_string(),
        "Village".to_string(),
        "Assigned Worker".to_string(),
        "Escalated".to_string(),
        "Created".to_string(),
        "Resolved".to_string(),
    ];

    let rows = issues
        .iter()
        .map(|i| {
            vec![
                i.display_id.clone(),
                i.category.clone(),
                i.priority.as_str().to_string(),
                i.status.as_str().to_string(),
                i.location.district_name.clone().unwrap_or_default(),
                i.location.panchayat_name.clone().unwrap_or_default(),
                i.location.village_name.clone().unwrap_or_default(),
                i.assigned_worker
                    .as_ref()
                    .map(|w| w.name.clone())
                    .unwrap_or_default(),
                if i.escalated { "yes" } else { "no" }.to_string(),
                date(Some(i.created_at)),
                date(i.resolved_at),
            ]
        })
        .collect();

    ReportSheet {
        name: "Issues".to_string(),
        headers,
        rows,
    }
}

/// Headline statistics as key/value rows.
pub fn summary_sheet(snapshot: &AggregationSnapshot) -> ReportSheet {
    let rows = vec![
        row2("Total issues", snapshot.counts.total.to_string()),
        row2("Resolved", snapshot.counts.resolved.to_string()),
        row2("Pending", snapshot.counts.pending.to_string()),
        row2("Escalated", snapshot.counts.escalated.to_string()),
        row2(
            &format!("Created in last {} days", snapshot.windowed.window_days),
            snapshot.windowed.created.total.to_string(),
        ),
        row2(
            &format!(
                "Resolved in last {} days (by creation)",
                snapshot.windowed.window_days
            ),
            snapshot.windowed.resolved_created_within.to_string(),
        ),
        row2(
            &format!(
                "Resolved in last {} days (by resolution)",
                snapshot.windowed.window_days
            ),
            snapshot.windowed.resolved_within.to_string(),
        ),
        row2(
            "Average resolution time (days)",
            snapshot.average_resolution_days.to_string(),
        ),
    ];

    ReportSheet {
        name: "Summary".to_string(),
        headers: vec!["Metric".to_string(), "Value".to_string()],
        rows,
    }
}

/// Ranked per-panchayat performance.
pub fn performance_sheet(snapshot: &AggregationSnapshot) -> ReportSheet {
    let rows = snapshot
        .panchayat_performance
        .iter()
        .map(|g| {
            vec![
                g.key.clone(),
                g.total.to_string(),
                g.resolved.to_string(),
                g.pending.to_string(),
                format!("{}%", g.resolution_rate),
                g.average_days.to_string(),
            ]
        })
        .collect();

    ReportSheet {
        name: "Panchayat Performance".to_string(),
        headers: vec![
            "Panchayat".to_string(),
            "Total".to_string(),
            "Resolved".to_string(),
            "Pending".to_string(),
            "Resolution Rate".to_string(),
            "Avg Days".to_string(),
        ],
        rows,
    }
}

/// Category distribution with the chart colors.
pub fn distribution_sheet(snapshot: &AggregationSnapshot) -> ReportSheet {
    let rows = snapshot
        .distribution
        .iter()
        .map(|s| {
            vec![
                s.category.clone(),
                s.count.to_string(),
                format!("{}%", s.percentage),
                s.color.to_string(),
            ]
        })
        .collect();

    ReportSheet {
        name: "Category Distribution".to_string(),
        headers: vec![
            "Category".to_string(),
            "Count".to_string(),
            "Share".to_string(),
            "Color".to_string(),
        ],
        rows,
    }
}

/// Escalated issues, most recently escalated first.
pub fn escalations_sheet(issues: &[Issue]) -> ReportSheet {
    let mut escalated: Vec<&Issue> = issues.iter().filter(|i| i.escalated).collect();
    escalated.sort_by(|a, b| {
        let ta = a.escalated_at.unwrap_or(a.created_at);
        let tb = b.escalated_at.unwrap_or(b.created_at);
        tb.cmp(&ta).then(a.display_id.cmp(&b.display_id))
    });

    let rows = escalated
        .iter()
        .map(|i| {
            vec![
                i.display_id.clone(),
                i.category.clone(),
                i.status.as_str().to_string(),
                i.location.panchayat_name.clone().unwrap_or_default(),
                date(i.escalated_at),
            ]
        })
        .collect();

    ReportSheet {
        name: "Recent Escalations".to_string(),
        headers: vec![
            "Issue ID".to_string(),
            "Category".to_string(),
            "Status".to_string(),
            "Panchayat".to_string(),
            "Escalated".to_string(),
        ],
        rows,
    }
}

/// Full workbook: summary, per-panchayat, distribution, escalations.
pub fn workbook(snapshot: &AggregationSnapshot, issues: &[Issue]) -> Vec<ReportSheet> {
    vec![
        summary_sheet(snapshot),
        performance_sheet(snapshot),
        distribution_sheet(snapshot),
        escalations_sheet(issues),
    ]
}

/// Nested JSON summary document mirroring the snapshot exactly.
pub fn summary_json(snapshot: &AggregationSnapshot) -> serde_json::Value {
    json!({
        "generated_at": snapshot.generated_at,
        "counts": snapshot.counts,
        "windowed": snapshot.windowed,
        "average_resolution_days": snapshot.average_resolution_days,
        "distribution": snapshot.distribution,
        "panchayat_performance": snapshot.panchayat_performance,
        "trend": snapshot.trend,
        "warnings": snapshot.warnings,
    })
}

fn row2(key: &str, value: String) -> Vec<String> {
    vec![key.to_string(), value]
}
