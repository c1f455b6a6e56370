//! Monthly AO summary posts.
//!
//! The report check runs on a short interval but only fires once per
//! calendar day, during the configured UTC hour. When it fires it reports
//! the month containing `now - 3 days`, so a post early in a month covers
//! the month that just ended.

use backblast_core::{render_summary, RegionConfig, ReplySink, ReportStore, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use telemetry::metrics;
use tracing::{debug, error, info};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub struct MonthlyReporter {
    store: Arc<dyn ReportStore>,
    sink: Arc<dyn ReplySink>,
    report_hour_utc: u32,
    last_fired: Mutex<Option<NaiveDate>>,
}

/// Year and month reported on a given day.
pub fn report_month(now: DateTime<Utc>) -> (i32, u32) {
    let reference = now - Duration::days(3);
    (reference.year(), reference.month())
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month.clamp(1, 12) - 1) as usize]
}

impl MonthlyReporter {
    pub fn new(store: Arc<dyn ReportStore>, sink: Arc<dyn ReplySink>, report_hour_utc: u32) -> Self {
        Self {
            store,
            sink,
            report_hour_utc,
            last_fired: Mutex::new(None),
        }
    }

    /// Claims today's firing if `now` is inside the report hour and nothing
    /// has fired yet today.
    pub fn claim(&self, now: DateTime<Utc>) -> bool {
        if now.hour() != self.report_hour_utc {
            return false;
        }
        let today = now.date_naive();
        let mut last = self.last_fired.lock();
        if *last == Some(today) {
            return false;
        }
        *last = Some(today);
        true
    }

    /// Evaluates the gate and posts reports if it fires. Returns the number
    /// of regions posted.
    pub async fn check(&self, now: DateTime<Utc>, regions: &[RegionConfig]) -> usize {
        if !self.claim(now) {
            debug!("Report gate closed");
            return 0;
        }

        let (year, month) = report_month(now);
        let mut posted = 0;
        for region in regions {
            match self.post_region(region, year, month).await {
                Ok(()) => posted += 1,
                Err(e) => error!(region = %region.name, error = %e, "Monthly report failed"),
            }
        }
        posted
    }

    pub async fn post_region(&self, region: &RegionConfig, year: i32, month: u32) -> Result<()> {
        let rows = self.store.monthly_summary(&region.namespace, year, month).await?;
        let text = render_summary(&region.name, month_name(month), year, &rows);
        self.sink.post(region.reporting_channel, &text).await?;

        metrics().reports_posted.inc();
        info!(region = %region.name, year, month, aos = rows.len(), "Posted monthly report");
        Ok(())
    }
}
