//! Legacy aggregated-payload handling.
//!
//! The fallback endpoint returns jobs already aggregated server-side,
//! sometimes with the same work order split across several records.
//! Each record is normalized into a [`Job`], then records sharing an
//! order number are merged into one.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::adapter::{self, fields, normalize_plate};
use crate::engine::identity::is_valid_nr_os;
use crate::engine::metrics;
use crate::engine::model::{Job, JobKey, JobStatus, Metrics, OsDetails};

const JOB_NAME: &[&str] = &["name", "nome"];
const JOB_STATUS: &[&str] = &["status", "situacao", "Status"];
const JOB_CREATED: &[&str] = &["created_at", "created_at_raw", "Created"];
const JOB_PRINTED: &[&str] = &["printed_at", "printed_at_raw", "Printed"];

/// Normalize one pre-aggregated job record.
///
/// `fallback_key` keeps records without any identity distinguishable and
/// deterministic; the caller derives it from the record's position in
/// the payload.
pub fn normalize_legacy_job(record: &Value, fallback_key: &str) -> Option<Job> {
    let obj = record.as_object()?;

    let name = fields::first_string(obj, JOB_NAME);
    let status = fields::first_string(obj, JOB_STATUS)
        .map(|raw| JobStatus::parse(&raw))
        .unwrap_or(JobStatus::Ready);

    let created_raw = fields::first_string(obj, JOB_CREATED);
    let printed_raw = fields::first_string(obj, JOB_PRINTED);

    let plates: Vec<_> = obj
        .get("paths")
        .and_then(Value::as_array)
        .map(|paths| paths.iter().filter_map(normalize_plate).collect())
        .unwrap_or_default();

    let inferred = obj.get("inferred_os").and_then(Value::as_object);
    let nr_os = inferred
        .and_then(|os| fields::first_string(os, &["nr_os", "nros"]))
        .filter(|nr| is_valid_nr_os(nr));
    let ano = inferred.and_then(|os| fields::first_string(os, &["ano", "anoos"]));

    let key = match (&nr_os, &name) {
        (Some(nr), _) => JobKey::os(nr.clone(), ano),
        (None, Some(name)) => JobKey::synthetic(name.clone()),
        (None, None) => JobKey::synthetic(fallback_key),
    };

    // Aggregated records sometimes carry the order metadata inline.
    let details = {
        let d = OsDetails {
            titulo: fields::first_string(obj, &["titulo", "Titulo"]),
            solicitante: fields::first_string(obj, &["solicitante", "NomeUsuario"]),
            produto: fields::first_string(obj, &["produto", "TipoPublicacaoLink"]),
            data_entrada: None,
        };
        (d != OsDetails::default()).then_some(d)
    };

    Some(Job {
        name: name.unwrap_or_else(|| key.to_string()),
        key,
        status,
        created_at: created_raw.as_deref().and_then(adapter::parse_timestamp),
        last_update: None,
        printed_at: printed_raw.as_deref().and_then(adapter::parse_timestamp),
        tickets: Vec::new(),
        plates,
        metrics: Metrics::default(),
        details,
        is_new: false,
    })
}

/// Merge jobs that resolve to the same work order.
///
/// Records with the same order number merge even when one of them lacks
/// the year; a known year upgrades the merged key. Rules per field: best
/// (lowest-rank) status wins, earliest creation, latest completion,
/// first-set details, plates deduped by booklet/colour/completion.
/// Metrics are recomputed from the merged plate set.
pub fn merge_jobs_by_os(jobs: Vec<Job>, now: DateTime<Utc>) -> Vec<Job> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, Job> = HashMap::new();

    for job in jobs {
        let merge_key = match &job.key {
            JobKey::Os { nr_os, .. } => format!("os:{nr_os}"),
            JobKey::Synthetic(key) => format!("syn:{key}"),
        };
        match merged.entry(merge_key) {
            Entry::Vacant(entry) => {
                order.push(entry.key().clone());
                entry.insert(job);
            }
            Entry::Occupied(mut entry) => merge_into(entry.get_mut(), job),
        }
    }

    order
        .iter()
        .filter_map(|key| merged.remove(key))
        .map(|mut job| {
            if !job.plates.is_empty() {
                job.metrics = metrics::compute(&job.plates, now);
                if job.metrics.plates_printed == job.metrics.plates_total {
                    job.status = JobStatus::Printed;
                }
            }
            job
        })
        .collect()
}

fn merge_into(target: &mut Job, other: Job) {
    if let (
        JobKey::Os { ano: target_ano, .. },
        JobKey::Os { ano: Some(other_ano), .. },
    ) = (&mut target.key, &other.key)
    {
        if target_ano.is_none() {
            *target_ano = Some(other_ano.clone());
        }
    }

    if other.status.rank() < target.status.rank() {
        target.status = other.status;
    }
    target.created_at = match (target.created_at, other.created_at) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    target.printed_at = match (target.printed_at, other.printed_at) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
    if target.details.is_none() {
        target.details = other.details;
    }

    for plate in other.plates {
        let fingerprint = plate.fingerprint();
        if !target.plates.iter().any(|p| p.fingerprint() == fingerprint) {
            target.plates.push(plate);
        }
    }
}
