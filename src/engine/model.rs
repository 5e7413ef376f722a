//! Core aggregate types for the reconciliation engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::adapter::{NormalizedPlate, NormalizedTicket};

/// Resolved work-order status, ranked for queue ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Printing,
    PartPrinted,
    Ready,
    Printed,
    /// Unrecognised upstream status, kept verbatim. Sorts last, never errors.
    Other(String),
}

impl JobStatus {
    /// Parse a raw status string by prefix, the way the operator board
    /// ranks them. Empty input defaults to Ready.
    pub fn parse(raw: &str) -> Self {
        let val = raw.trim().to_lowercase();
        if val.is_empty() {
            return JobStatus::Ready;
        }
        if val.starts_with("printing") {
            return JobStatus::Printing;
        }
        if val.starts_with("part") {
            return JobStatus::PartPrinted;
        }
        if val.starts_with("ready") {
            return JobStatus::Ready;
        }
        if val == "printed" {
            return JobStatus::Printed;
        }
        JobStatus::Other(raw.trim().to_string())
    }

    /// Queue priority: printing first, then part-printed, then ready;
    /// everything else (including printed) sorts last.
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Printing => 0,
            JobStatus::PartPrinted => 1,
            JobStatus::Ready => 2,
            JobStatus::Printed | JobStatus::Other(_) => 3,
        }
    }

    pub fn is_printed(&self) -> bool {
        matches!(self, JobStatus::Printed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Printing => write!(f, "Printing"),
            JobStatus::PartPrinted => write!(f, "Part Printed"),
            JobStatus::Ready => write!(f, "Ready"),
            JobStatus::Printed => write!(f, "Printed"),
            JobStatus::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Work-order identity. Jobs whose identity cannot be resolved get a
/// deterministic synthetic key derived from the ticket/plate name, so
/// they still render and re-runs stay idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKey {
    Os { nr_os: String, ano: Option<String> },
    Synthetic(String),
}

impl JobKey {
    pub fn os(nr_os: impl Into<String>, ano: Option<String>) -> Self {
        JobKey::Os {
            nr_os: nr_os.into(),
            ano,
        }
    }

    pub fn synthetic(key: impl Into<String>) -> Self {
        JobKey::Synthetic(key.into())
    }

    pub fn nr_os(&self) -> Option<&str> {
        match self {
            JobKey::Os { nr_os, .. } => Some(nr_os),
            JobKey::Synthetic(_) => None,
        }
    }

    pub fn ano(&self) -> Option<&str> {
        match self {
            JobKey::Os { ano, .. } => ano.as_deref(),
            JobKey::Synthetic(_) => None,
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKey::Os { nr_os, ano } => {
                write!(f, "{}-{}", nr_os, ano.as_deref().unwrap_or(""))
            }
            JobKey::Synthetic(key) => write!(f, "{key}"),
        }
    }
}

/// Derived per-job metrics.
///
/// `progress_pct` is `None` (indeterminate, not zero) when the job has
/// no plates. `eta_seconds` is `None` whenever no plate produced a valid
/// duration — never NaN and never negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub plates_total: usize,
    pub plates_printed: usize,
    pub progress_pct: Option<u8>,
    pub avg_seconds: Option<f64>,
    pub eta_seconds: Option<f64>,
    pub eta_at: Option<DateTime<Utc>>,
}

/// Order metadata fetched lazily from the order-management API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsDetails {
    #[serde(default, alias = "Titulo")]
    pub titulo: Option<String>,
    #[serde(default, alias = "NomeUsuario")]
    pub solicitante: Option<String>,
    #[serde(default, alias = "TipoPublicacaoLink")]
    pub produto: Option<String>,
    #[serde(default, alias = "DataEntrada")]
    pub data_entrada: Option<String>,
}

/// The canonical aggregate: one work order's tickets, plates and derived
/// state for a single pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub key: JobKey,
    /// Display name: the first ticket's name, or an `OS nr/ano` label.
    pub name: String,
    pub status: JobStatus,
    /// Earliest ticket creation.
    pub created_at: Option<DateTime<Utc>>,
    /// Latest ticket update.
    pub last_update: Option<DateTime<Utc>>,
    /// Latest plate completion.
    pub printed_at: Option<DateTime<Utc>>,
    pub tickets: Vec<NormalizedTicket>,
    pub plates: Vec<NormalizedPlate>,
    pub metrics: Metrics,
    pub details: Option<OsDetails>,
    /// Set when this job key was not present in the previous pipeline run.
    pub is_new: bool,
}

impl Job {
    /// Short operator label, `"123/24 - produto"` when identity and
    /// enrichment are available.
    pub fn short_label(&self) -> String {
        let os_text = match &self.key {
            JobKey::Os { nr_os, ano } => match ano {
                Some(ano) => {
                    // last two chars of the year; the field is upstream
                    // text, so byte offsets are not safe to slice at
                    let short = ano
                        .char_indices()
                        .rev()
                        .nth(1)
                        .map(|(i, _)| &ano[i..])
                        .unwrap_or(ano);
                    format!("{nr_os}/{short}")
                }
                None => nr_os.clone(),
            },
            JobKey::Synthetic(_) => self.name.clone(),
        };
        let produto = self
            .details
            .as_ref()
            .and_then(|d| d.produto.clone())
            .unwrap_or_else(|| self.name.clone());
        format!("{os_text} - {produto}")
    }
}

/// Queue-head summary: how many distinct orders and plates are sitting
/// ready to be recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReadyStats {
    pub total_os: usize,
    pub total_plates: usize,
    pub entries: Vec<ReadyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadyEntry {
    pub nr_os: String,
    pub ano: Option<String>,
    pub plates: usize,
    pub created_at: Option<DateTime<Utc>>,
}
