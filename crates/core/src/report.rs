//! Monthly AO posting summary.

use serde::{Deserialize, Serialize};

use crate::ids::ChannelId;

/// Posting stats for one AO over one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AoMonthlySummary {
    pub ao_id: ChannelId,
    /// Channel name from the directory snapshot; empty if never synced
    pub ao_name: String,
    /// Sum of `pax_count` across the month's beatdowns
    pub total_posts: u64,
    pub unique_pax: u64,
    pub beatdowns: u64,
    pub total_fngs: u64,
}

impl AoMonthlySummary {
    /// Average headcount per beatdown, rounded to one decimal.
    pub fn avg_attendance(&self) -> f64 {
        if self.beatdowns == 0 {
            return 0.0;
        }
        (self.total_posts as f64 / self.beatdowns as f64 * 10.0).round() / 10.0
    }

    /// Label used in the rendered table.
    pub fn display_name(&self) -> String {
        if self.ao_name.is_empty() {
            format!("ao-{}", self.ao_id)
        } else {
            self.ao_name.clone()
        }
    }
}

/// Renders the summary as a fixed-width table for a chat post, busiest AO
/// (by average attendance) first.
pub fn render_summary(
    region: &str,
    month_name: &str,
    year: i32,
    rows: &[AoMonthlySummary],
) -> String {
    let mut rows = rows.to_vec();
    rows.sort_by(|a, b| b.avg_attendance().total_cmp(&a.avg_attendance()));

    let mut out = format!(
        "Hey {region} - it's that time of the month again. Here is the AO posting summary for {month_name} {year}.\n"
    );
    if rows.is_empty() {
        out.push_str("No backblasts were recorded this month.");
        return out;
    }

    out.push_str("```\n");
    out.push_str(&format!(
        "{:<24} {:>6} {:>6} {:>4} {:>6} {:>5}\n",
        "AO", "Posts", "Unique", "BDs", "Avg", "FNGs"
    ));
    for row in &rows {
        out.push_str(&format!(
            "{:<24} {:>6} {:>6} {:>4} {:>6.1} {:>5}\n",
            row.display_name(),
            row.total_posts,
            row.unique_pax,
            row.beatdowns,
            row.avg_attendance(),
            row.total_fngs
        ));
    }
    out.push_str("```");
    out
}
