//! Queue and completed-list ordering.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::engine::model::Job;

/// Order the active queue: status rank first (printing, part-printed,
/// ready, then everything else), newest creation first within a rank.
/// Jobs without a creation timestamp sort after dated ones, and the sort
/// is stable so input order breaks any remaining ties. Printed jobs are
/// filtered out entirely.
pub fn order_queue(jobs: Vec<Job>) -> Vec<Job> {
    let mut queue: Vec<Job> = jobs.into_iter().filter(|j| !j.status.is_printed()).collect();
    queue.sort_by(|a, b| {
        a.status
            .rank()
            .cmp(&b.status.rank())
            .then_with(|| desc_dates_none_last(a.created_at, b.created_at))
    });
    queue
}

/// Order completed jobs by completion time, most recent first.
pub fn order_completed(mut jobs: Vec<Job>) -> Vec<Job> {
    jobs.sort_by(|a, b| desc_dates_none_last(a.printed_at, b.printed_at));
    jobs
}

fn desc_dates_none_last(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
