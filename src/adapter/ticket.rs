//! Raw ticket record → [`NormalizedTicket`].

use serde_json::Value;

use super::fields;
use super::timestamp::parse_timestamp;
use super::types::NormalizedTicket;

/// Normalize one raw ticket record.
///
/// Returns `None` when no name field resolves — a ticket without a name
/// cannot be referenced by any plate and carries no usable identity. The
/// caller skips such records and continues with the batch.
pub fn normalize_ticket(record: &Value) -> Option<NormalizedTicket> {
    let obj = record.as_object()?;

    let name = fields::first_string(obj, fields::TICKET_NAME)?;
    let status = fields::first_string(obj, fields::TICKET_STATUS).unwrap_or_default();

    let created_raw = fields::first_string(obj, fields::TICKET_CREATED);
    let updated_raw = fields::first_string(obj, fields::TICKET_UPDATED);

    Some(NormalizedTicket {
        name,
        status,
        created_at: created_raw.as_deref().and_then(parse_timestamp),
        created_at_raw: created_raw,
        last_update: updated_raw.as_deref().and_then(parse_timestamp),
        last_update_raw: updated_raw,
        nr_os: fields::first_string(obj, fields::TICKET_NR_OS),
        ano: fields::first_string(obj, fields::TICKET_ANO),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_modern_fields() {
        let ticket = normalize_ticket(&json!({
            "name": "T1",
            "status": "Printing",
            "created_at": "2024-05-01 08:00:00",
            "nr_os": "123",
            "ano": "2024"
        }))
        .unwrap();

        assert_eq!(ticket.name, "T1");
        assert_eq!(ticket.status, "Printing");
        assert!(ticket.created_at.is_some());
        assert_eq!(ticket.nr_os.as_deref(), Some("123"));
        assert_eq!(ticket.ano.as_deref(), Some("2024"));
    }

    #[test]
    fn test_legacy_portuguese_fields() {
        let ticket = normalize_ticket(&json!({
            "nome": "T2",
            "situacao": "Ready",
            "criado_em": "2024-05-01T08:00",
            "nros": "777",
            "anoos": 2023
        }))
        .unwrap();

        assert_eq!(ticket.name, "T2");
        assert_eq!(ticket.status, "Ready");
        assert_eq!(ticket.nr_os.as_deref(), Some("777"));
        assert_eq!(ticket.ano.as_deref(), Some("2023"));
    }

    #[test]
    fn test_nameless_record_is_skipped() {
        assert!(normalize_ticket(&json!({"status": "Ready"})).is_none());
        assert!(normalize_ticket(&json!("not an object")).is_none());
    }

    #[test]
    fn test_unparseable_timestamp_kept_as_raw() {
        let ticket = normalize_ticket(&json!({
            "name": "T3",
            "created_at": "sem data"
        }))
        .unwrap();

        assert_eq!(ticket.created_at, None);
        assert_eq!(ticket.created_at_raw.as_deref(), Some("sem data"));
    }
}
