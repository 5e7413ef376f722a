//! Snapshot → queue view assembly.
//!
//! `build_jobs` turns one upstream snapshot (either shape) into jobs
//! plus the ready-head summary; `assemble` orders them into the final
//! [`QueueView`] the pump publishes. Both take `now` as an argument, so
//! a run is a pure function of the snapshot and the clock.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adapter::{
    normalize_plate, normalize_ticket, NormalizedPlate, NormalizedTicket, PlateStatus,
};
use crate::client::models::Snapshot;
use crate::engine::identity::is_valid_nr_os;
use crate::engine::model::{Job, JobKey, JobStatus, ReadyEntry, ReadyStats};
use crate::engine::{grouper, live, merge, ordering};

/// Jobs built from one snapshot, before ordering and selection.
#[derive(Debug)]
pub struct BuiltJobs {
    pub jobs: Vec<Job>,
    pub ready_head: ReadyStats,
    pub upstream_errors: Vec<String>,
    pub upstream_generated_at: Option<String>,
    pub used_fallback: bool,
}

/// The published board state for one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueView {
    pub generated_at: Option<DateTime<Utc>>,
    pub upstream_generated_at: Option<String>,
    /// Active queue in display order. Excludes completed jobs.
    pub queue: Vec<Job>,
    /// What the recorder is working on right now.
    pub live: Vec<Job>,
    /// Completed jobs, most recent first.
    pub completed: Vec<Job>,
    pub ready_head: ReadyStats,
    pub upstream_errors: Vec<String>,
    /// Set when the last refresh failed outright; the rest of the view
    /// is then whatever could still be produced (usually empty).
    pub last_error: Option<String>,
}

impl QueueView {
    pub fn failed(message: String, now: DateTime<Utc>) -> Self {
        QueueView {
            generated_at: Some(now),
            last_error: Some(message),
            ..QueueView::default()
        }
    }

    /// Queued jobs not currently being worked on.
    pub fn waiting(&self) -> Vec<&Job> {
        let live_keys: HashSet<&JobKey> = self.live.iter().map(|j| &j.key).collect();
        self.queue
            .iter()
            .filter(|j| j.status != JobStatus::Printing && !live_keys.contains(&j.key))
            .collect()
    }
}

/// Build jobs from whichever snapshot shape the upstream produced.
pub fn build_jobs(snapshot: &Snapshot, now: DateTime<Utc>) -> BuiltJobs {
    match snapshot {
        Snapshot::Events(events) => {
            let tickets: Vec<NormalizedTicket> =
                events.tickets.iter().filter_map(normalize_ticket).collect();
            let plates: Vec<NormalizedPlate> =
                events.paths.iter().filter_map(normalize_plate).collect();

            let ready_head = ready_stats(&tickets, &plates);
            let jobs = grouper::group(tickets, plates, now);

            BuiltJobs {
                jobs,
                ready_head,
                upstream_errors: events.meta.errors.clone(),
                upstream_generated_at: events.meta.generated_at.clone(),
                used_fallback: false,
            }
        }
        Snapshot::Aggregated(legacy) => {
            let records = legacy
                .queue
                .iter()
                .enumerate()
                .map(|(i, r)| (format!("agg-q-{i}"), r))
                .chain(
                    legacy
                        .printed
                        .iter()
                        .enumerate()
                        .map(|(i, r)| (format!("agg-p-{i}"), r)),
                );
            let jobs: Vec<Job> = records
                .filter_map(|(fallback, record)| merge::normalize_legacy_job(record, &fallback))
                .collect();
            let jobs = merge::merge_jobs_by_os(jobs, now);
            let ready_head = ready_stats_from_jobs(&jobs);

            BuiltJobs {
                jobs,
                ready_head,
                upstream_errors: Vec::new(),
                upstream_generated_at: None,
                used_fallback: true,
            }
        }
    }
}

/// Order the built jobs into the final view. `seen` holds job keys from
/// previous runs; anything absent from it is flagged as new.
pub fn assemble(built: BuiltJobs, seen: &HashSet<String>, now: DateTime<Utc>) -> QueueView {
    let mut jobs = built.jobs;
    for job in &mut jobs {
        job.is_new = !seen.contains(&job.key.to_string());
    }

    let (completed, active): (Vec<Job>, Vec<Job>) =
        jobs.into_iter().partition(|j| j.status.is_printed());

    let queue = ordering::order_queue(active);
    let live = live::select_live(&queue);
    let completed = ordering::order_completed(completed);

    QueueView {
        generated_at: Some(now),
        upstream_generated_at: built.upstream_generated_at,
        queue,
        live,
        completed,
        ready_head: built.ready_head,
        upstream_errors: built.upstream_errors,
        last_error: None,
    }
}

/// Ready-head summary over normalized records: distinct orders whose
/// tickets are still ready, with their waiting plate counts, oldest
/// first. Tickets without a usable order number are left out.
fn ready_stats(tickets: &[NormalizedTicket], plates: &[NormalizedPlate]) -> ReadyStats {
    let ready_tickets: Vec<&NormalizedTicket> = tickets
        .iter()
        .filter(|t| t.status.to_lowercase().starts_with("ready"))
        .filter(|t| t.nr_os.as_deref().is_some_and(is_valid_nr_os))
        .collect();

    let mut order: Vec<(String, Option<String>)> = Vec::new();
    let mut entries: HashMap<(String, Option<String>), ReadyEntry> = HashMap::new();
    let mut ticket_owner: HashMap<&str, (String, Option<String>)> = HashMap::new();

    for ticket in &ready_tickets {
        let Some(nr_os) = ticket.nr_os.clone() else {
            continue;
        };
        let key = (nr_os.clone(), ticket.ano.clone());
        ticket_owner.insert(ticket.name.as_str(), key.clone());

        let entry = entries.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            ReadyEntry {
                nr_os,
                ano: ticket.ano.clone(),
                plates: 0,
                created_at: None,
            }
        });
        entry.created_at = match (entry.created_at, ticket.created_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }

    for plate in plates {
        // only plates still waiting count; a plate mid-exposure has
        // already left the ready head
        if plate.plate_status() != PlateStatus::Ready {
            continue;
        }
        let Some(key) = plate
            .ticket_name
            .as_deref()
            .and_then(|name| ticket_owner.get(name))
        else {
            continue;
        };
        if let Some(entry) = entries.get_mut(key) {
            entry.plates += 1;
        }
    }

    let mut result: Vec<ReadyEntry> = order
        .iter()
        .filter_map(|key| entries.remove(key))
        .collect();
    result.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.nr_os.cmp(&b.nr_os)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.nr_os.cmp(&b.nr_os),
    });

    ReadyStats {
        total_os: result.len(),
        total_plates: result.iter().map(|e| e.plates).sum(),
        entries: result,
    }
}

/// Ready-head summary over aggregated jobs, used on the fallback path.
fn ready_stats_from_jobs(jobs: &[Job]) -> ReadyStats {
    let mut entries: Vec<ReadyEntry> = jobs
        .iter()
        .filter(|j| j.status == JobStatus::Ready)
        .filter_map(|j| match &j.key {
            JobKey::Os { nr_os, ano } => Some(ReadyEntry {
                nr_os: nr_os.clone(),
                ano: ano.clone(),
                plates: j.metrics.plates_total - j.metrics.plates_printed,
                created_at: j.created_at,
            }),
            JobKey::Synthetic(_) => None,
        })
        .collect();

    entries.sort_by(|a, b| match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.nr_os.cmp(&b.nr_os)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.nr_os.cmp(&b.nr_os),
    });

    ReadyStats {
        total_os: entries.len(),
        total_plates: entries.iter().map(|e| e.plates).sum(),
        entries,
    }
}
