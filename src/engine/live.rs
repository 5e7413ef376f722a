//! Live selection: which jobs the recorder is actually working on.
//!
//! All printing jobs count as live. When nothing is printing, the single
//! oldest part-printed job stands in; failing that, the oldest ready job.
//! "Oldest" is FIFO by creation time, so the board mirrors the order the
//! recorder will pick work up in.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::engine::model::{Job, JobStatus};

pub fn select_live(queue: &[Job]) -> Vec<Job> {
    let mut printing: Vec<Job> = queue
        .iter()
        .filter(|j| j.status == JobStatus::Printing)
        .cloned()
        .collect();
    if !printing.is_empty() {
        printing.sort_by(|a, b| {
            asc_dates_none_last(a.created_at, b.created_at)
                .then_with(|| a.key.nr_os().unwrap_or("").cmp(b.key.nr_os().unwrap_or("")))
        });
        return printing;
    }

    if let Some(job) = oldest_with_status(queue, &JobStatus::PartPrinted) {
        return vec![job.clone()];
    }
    if let Some(job) = oldest_with_status(queue, &JobStatus::Ready) {
        return vec![job.clone()];
    }
    Vec::new()
}

fn oldest_with_status<'a>(queue: &'a [Job], status: &JobStatus) -> Option<&'a Job> {
    queue
        .iter()
        .filter(|j| j.status == *status)
        .min_by(|a, b| asc_dates_none_last(a.created_at, b.created_at))
}

fn asc_dates_none_last(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
