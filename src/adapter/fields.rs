//! Named mapping tables for legacy upstream field names.
//!
//! Several generations of the imaging bridge exported the same data under
//! different keys (English, Portuguese, camelCase, protocol-style). Each
//! table lists every accepted spelling in priority order; the adapters
//! take the first field that resolves to a non-empty value.

use serde_json::{Map, Value};

pub const TICKET_NAME: &[&str] = &["name", "ticket_name", "nome", "caderno"];
pub const TICKET_STATUS: &[&str] = &["status", "situacao", "state"];
pub const TICKET_NR_OS: &[&str] = &[
    "nros",
    "nr_os",
    "os",
    "nr",
    "numero_os",
    "NroProtocolo",
    "nrOs",
];
pub const TICKET_ANO: &[&str] = &[
    "anoos",
    "ano_os",
    "ano",
    "anoTicket",
    "AnoProtocolo",
    "anoOs",
];
pub const TICKET_CREATED: &[&str] = &["created", "created_at", "criado_em", "criado", "data", "Data"];
pub const TICKET_UPDATED: &[&str] = &["last_update", "updated_at", "atualizado_em"];

pub const PLATE_TICKET: &[&str] = &["ticket_name", "ticket", "ticketName", "nome_ticket"];
pub const PLATE_NAME: &[&str] = &["path_name", "nome_chapa", "nome", "name", "chapa"];
pub const PLATE_COLOUR: &[&str] = &["colour", "color", "cor", "Colour"];
pub const PLATE_STATUS: &[&str] = &["status", "situacao", "state", "Status", "State"];
pub const PLATE_CADERNO: &[&str] = &["caderno", "numero_caderno", "cad"];
pub const PLATE_START: &[&str] = &["inicio", "start_at", "start", "data_inicio"];
pub const PLATE_END: &[&str] = &["fim", "end_at", "finish_at", "printed_at", "data_fim"];

/// Extra sources scanned for colour/caderno pattern extraction when no
/// explicit field is set (event descriptions and TIFF file names).
pub const PLATE_PATTERN_SOURCES: &[&str] = &[
    "descricao_evento",
    "tiff",
    "TiffName",
    "TIFFName",
    "File",
];

/// First field from `table` present in `record` with a usable value.
/// Numbers are accepted and stringified; empty strings are skipped.
pub fn first_string(record: &Map<String, Value>, table: &[&str]) -> Option<String> {
    for field in table {
        match record.get(*field) {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}
