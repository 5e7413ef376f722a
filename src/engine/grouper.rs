//! Grouping of normalized tickets and plates into jobs.
//!
//! One job per resolved work-order key. Tickets land first and establish
//! the groups; plates attach through their owning ticket, or form a
//! synthetic group of their own when no ticket matches. Iteration order
//! is insertion order, so identical snapshots always produce the same
//! job list.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};

use crate::adapter::{NormalizedPlate, NormalizedTicket};
use crate::engine::identity::resolve_ticket_identity;
use crate::engine::model::{Job, JobKey, JobStatus};
use crate::engine::metrics;

struct Group {
    key: JobKey,
    tickets: Vec<NormalizedTicket>,
    plates: Vec<NormalizedPlate>,
    seen_plates: Vec<(String, String, String)>,
}

impl Group {
    fn new(key: JobKey) -> Self {
        Group {
            key,
            tickets: Vec::new(),
            plates: Vec::new(),
            seen_plates: Vec::new(),
        }
    }

    /// Duplicate plate events share booklet, colour and completion text;
    /// the first occurrence wins, later re-deliveries are dropped.
    fn push_plate(&mut self, plate: NormalizedPlate) {
        let fingerprint = plate.fingerprint();
        if self.seen_plates.contains(&fingerprint) {
            return;
        }
        self.seen_plates.push(fingerprint);
        self.plates.push(plate);
    }
}

struct Accumulator {
    order: Vec<JobKey>,
    groups: HashMap<JobKey, Group>,
}

impl Accumulator {
    fn new() -> Self {
        Accumulator {
            order: Vec::new(),
            groups: HashMap::new(),
        }
    }

    fn group_mut(&mut self, key: JobKey) -> &mut Group {
        match self.groups.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let key = entry.key().clone();
                self.order.push(key.clone());
                entry.insert(Group::new(key))
            }
        }
    }
}

/// Group a normalized snapshot into jobs. `now` anchors the ETA clock
/// for the whole run.
pub fn group(
    tickets: Vec<NormalizedTicket>,
    plates: Vec<NormalizedPlate>,
    now: DateTime<Utc>,
) -> Vec<Job> {
    let mut acc = Accumulator::new();

    let ticket_index: HashMap<String, NormalizedTicket> = tickets
        .iter()
        .map(|t| (t.name.clone(), t.clone()))
        .collect();

    for ticket in tickets {
        let key = resolve_ticket_identity(&ticket);
        acc.group_mut(key).tickets.push(ticket);
    }

    for mut plate in plates {
        let owner = plate
            .ticket_name
            .as_deref()
            .and_then(|name| ticket_index.get(name));

        let key = match owner {
            Some(ticket) => resolve_ticket_identity(ticket),
            // Orphan plate: group under whatever name it carries.
            None => match plate
                .ticket_name
                .clone()
                .or_else(|| plate.path_name.clone())
                .or_else(|| plate.caderno.clone())
            {
                Some(name) => JobKey::Synthetic(name),
                // The adapter guarantees at least one of the three.
                None => continue,
            },
        };

        // Plates with no booklet tag fall back to the ticket name, so a
        // single-booklet job still dedups per colour.
        if plate.caderno.is_none() {
            plate.caderno = owner
                .map(|t| t.name.clone())
                .or_else(|| plate.ticket_name.clone());
        }

        acc.group_mut(key).push_plate(plate);
    }

    let mut jobs = Vec::with_capacity(acc.order.len());
    for key in &acc.order {
        if let Some(group) = acc.groups.remove(key) {
            jobs.push(finalize(group, now));
        }
    }
    jobs
}

fn finalize(group: Group, now: DateTime<Utc>) -> Job {
    let metrics = metrics::compute(&group.plates, now);

    let mut status = status_from_tickets(&group.tickets);
    // Every plate accounted for means the order is done regardless of
    // what the ticket statuses still say; they lag behind the plates.
    if metrics.plates_total > 0 && metrics.plates_printed == metrics.plates_total {
        status = JobStatus::Printed;
    }

    let created_at = group.tickets.iter().filter_map(|t| t.created_at).min();
    let last_update = group.tickets.iter().filter_map(|t| t.last_update).max();
    let printed_at = group
        .plates
        .iter()
        .filter(|p| p.is_completed())
        .filter_map(|p| p.printed_at)
        .max();

    let name = group
        .tickets
        .first()
        .map(|t| t.name.clone())
        .unwrap_or_else(|| match &group.key {
            JobKey::Os { nr_os, ano } => {
                format!("OS {}/{}", nr_os, ano.as_deref().unwrap_or(""))
            }
            JobKey::Synthetic(key) => key.clone(),
        });

    Job {
        key: group.key,
        name,
        status,
        created_at,
        last_update,
        printed_at,
        tickets: group.tickets,
        plates: group.plates,
        metrics,
        details: None,
        is_new: false,
    }
}

/// Derive a job status from its ticket statuses: any printing ticket
/// makes the job Printing, then part-printed, then ready. With no match
/// the first ticket's raw status is kept (Ready when there are none).
fn status_from_tickets(tickets: &[NormalizedTicket]) -> JobStatus {
    let lowered: Vec<String> = tickets.iter().map(|t| t.status.to_lowercase()).collect();

    if lowered.iter().any(|s| s.starts_with("printing")) {
        return JobStatus::Printing;
    }
    if lowered.iter().any(|s| s.starts_with("part")) {
        return JobStatus::PartPrinted;
    }
    if lowered.iter().any(|s| s.starts_with("ready")) {
        return JobStatus::Ready;
    }
    tickets
        .first()
        .map(|t| JobStatus::parse(&t.status))
        .unwrap_or(JobStatus::Ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{normalize_plate, normalize_ticket};
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn ticket(v: serde_json::Value) -> NormalizedTicket {
        normalize_ticket(&v).unwrap()
    }

    fn plate(v: serde_json::Value) -> NormalizedPlate {
        normalize_plate(&v).unwrap()
    }

    #[test]
    fn test_tickets_with_same_os_merge() {
        let jobs = group(
            vec![
                ticket(json!({"name": "T1", "status": "Ready", "nr_os": "123", "ano": "2024"})),
                ticket(json!({"name": "T2", "status": "Printing", "nr_os": "123", "ano": "2024"})),
            ],
            vec![],
            now(),
        );

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].key, JobKey::os("123", Some("2024".into())));
        assert_eq!(jobs[0].status, JobStatus::Printing);
        assert_eq!(jobs[0].tickets.len(), 2);
        assert_eq!(jobs[0].name, "T1");
    }

    #[test]
    fn test_plate_attaches_through_owning_ticket() {
        let jobs = group(
            vec![ticket(
                json!({"name": "Pasta_A", "status": "Ready", "nr_os": "55", "ano": "2024"}),
            )],
            vec![plate(json!({"ticket_name": "Pasta_A", "status": "Ready"}))],
            now(),
        );

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].plates.len(), 1);
        // booklet fallback: the ticket name stands in for a missing tag
        assert_eq!(jobs[0].plates[0].caderno.as_deref(), Some("Pasta_A"));
    }

    #[test]
    fn test_orphan_plate_forms_synthetic_group() {
        let jobs = group(
            vec![],
            vec![plate(json!({"path_name": "(Cad 1) Avulso_Pasta (C).tif", "status": "Ready"}))],
            now(),
        );

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].key, JobKey::synthetic("Avulso_Pasta"));
        assert_eq!(jobs[0].name, "Avulso_Pasta");
    }

    #[test]
    fn test_duplicate_plate_events_first_wins() {
        let jobs = group(
            vec![ticket(json!({"name": "T1", "status": "Ready", "nr_os": "9"}))],
            vec![
                plate(json!({
                    "ticket_name": "T1", "caderno": "1", "colour": "C",
                    "status": "Printed", "fim": "2024-05-01 10:00:00",
                    "inicio": "2024-05-01 09:59:00"
                })),
                plate(json!({
                    "ticket_name": "T1", "caderno": "1", "colour": "C",
                    "status": "Printed", "fim": "2024-05-01 10:00:00"
                })),
                plate(json!({
                    "ticket_name": "T1", "caderno": "1", "colour": "M",
                    "status": "Ready"
                })),
            ],
            now(),
        );

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].plates.len(), 2);
        // the first delivery carried the start timestamp; it survived
        assert!(jobs[0].plates[0].start_at.is_some());
    }

    #[test]
    fn test_completion_override() {
        let jobs = group(
            vec![ticket(json!({"name": "T1", "status": "Printing", "nr_os": "7"}))],
            vec![
                plate(json!({"ticket_name": "T1", "caderno": "1", "colour": "C", "status": "done"})),
                plate(json!({"ticket_name": "T1", "caderno": "1", "colour": "K", "status": "Printed"})),
            ],
            now(),
        );

        assert_eq!(jobs[0].status, JobStatus::Printed);
    }

    #[test]
    fn test_unknown_ticket_status_passes_through() {
        let jobs = group(
            vec![ticket(json!({"name": "T1", "status": "Aguardando"}))],
            vec![],
            now(),
        );
        assert_eq!(jobs[0].status, JobStatus::Other("Aguardando".into()));
    }

    #[test]
    fn test_created_min_updated_max() {
        let jobs = group(
            vec![
                ticket(json!({
                    "name": "T1", "status": "Ready", "nr_os": "1",
                    "created_at": "2024-05-01 08:00:00", "last_update": "2024-05-01 09:00:00"
                })),
                ticket(json!({
                    "name": "T2", "status": "Ready", "nr_os": "1",
                    "created_at": "2024-05-01 07:00:00", "last_update": "2024-05-01 10:00:00"
                })),
            ],
            vec![],
            now(),
        );

        let job = &jobs[0];
        assert_eq!(
            job.created_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).latest()
        );
        assert_eq!(
            job.last_update,
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).latest()
        );
    }

    #[test]
    fn test_nothing_is_dropped() {
        let tickets = vec![
            ticket(json!({"name": "T1", "status": "Ready", "nr_os": "1"})),
            ticket(json!({"name": "T2", "status": "Ready", "nr_os": "2"})),
            ticket(json!({"name": "T3", "status": "Ready"})),
        ];
        let plates = vec![
            plate(json!({"ticket_name": "T1", "caderno": "1", "colour": "C", "status": "Ready"})),
            plate(json!({"ticket_name": "T2", "caderno": "1", "colour": "C", "status": "Ready"})),
            plate(json!({"path_name": "orfao_grande.tif", "status": "Ready"})),
        ];

        let jobs = group(tickets, plates, now());
        let ticket_count: usize = jobs.iter().map(|j| j.tickets.len()).sum();
        let plate_count: usize = jobs.iter().map(|j| j.plates.len()).sum();
        assert_eq!(ticket_count, 3);
        assert_eq!(plate_count, 3);
    }

    #[test]
    fn test_output_order_is_deterministic() {
        let make = || {
            group(
                vec![
                    ticket(json!({"name": "B", "status": "Ready", "nr_os": "2"})),
                    ticket(json!({"name": "A", "status": "Ready", "nr_os": "1"})),
                    ticket(json!({"name": "C", "status": "Ready"})),
                ],
                vec![],
                now(),
            )
        };
        let keys = |jobs: &[Job]| jobs.iter().map(|j| j.key.to_string()).collect::<Vec<_>>();
        assert_eq!(keys(&make()), keys(&make()));
        assert_eq!(make()[0].name, "B");
    }
}
