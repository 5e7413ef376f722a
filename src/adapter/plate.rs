//! Raw plate/path record → [`NormalizedPlate`].
//!
//! Plate names encode booklet and colour information under several legacy
//! conventions, e.g. `"(Cad 1) 06558-06572_SM72_Pasta_FF.PDF (C).tif"`:
//! a parenthesized `Cad N` prefix, the owning ticket name in the middle,
//! and a parenthesized colour tag before the extension. Extraction is
//! best-effort; anything that does not match stays `None`.

use serde_json::Value;

use super::fields;
use super::timestamp::parse_timestamp;
use super::types::{Colour, NormalizedPlate};

/// Normalize one raw plate record.
///
/// Returns `None` when neither a ticket name nor a path name resolves —
/// such a record cannot be attached to anything, not even a synthetic
/// group. The caller skips it and continues with the batch.
pub fn normalize_plate(record: &Value) -> Option<NormalizedPlate> {
    let obj = record.as_object()?;

    let path_name = fields::first_string(obj, fields::PLATE_NAME);
    let ticket_name = fields::first_string(obj, fields::PLATE_TICKET).or_else(|| {
        path_name
            .as_deref()
            .and_then(recover_ticket_name)
    });

    if ticket_name.is_none() && path_name.is_none() {
        return None;
    }

    // Sources scanned for colour/caderno patterns when no explicit field
    // is set: the plate name plus event descriptions and TIFF names.
    let mut pattern_source = path_name.clone().unwrap_or_default();
    for field in fields::PLATE_PATTERN_SOURCES {
        if let Some(Value::String(s)) = obj.get(*field) {
            pattern_source.push(' ');
            pattern_source.push_str(s);
        }
    }

    let colour = fields::first_string(obj, fields::PLATE_COLOUR)
        .and_then(|raw| raw.chars().next().and_then(Colour::from_char))
        .or_else(|| extract_colour(&pattern_source));

    let caderno = match fields::first_string(obj, fields::PLATE_CADERNO) {
        // An explicit caderno field sometimes holds a whole path name;
        // pull the "Cad N" tag out of it when one is present.
        Some(explicit) => extract_caderno(&explicit).or(Some(explicit)),
        None => extract_caderno(&pattern_source),
    };

    let status = fields::first_string(obj, fields::PLATE_STATUS).unwrap_or_default();
    let start_raw = fields::first_string(obj, fields::PLATE_START);
    let end_raw = fields::first_string(obj, fields::PLATE_END);

    Some(NormalizedPlate {
        ticket_name,
        path_name,
        colour,
        caderno,
        status,
        start_at: start_raw.as_deref().and_then(parse_timestamp),
        start_at_raw: start_raw,
        printed_at: end_raw.as_deref().and_then(parse_timestamp),
        printed_at_raw: end_raw,
    })
}

/// Recover the owning ticket name from a plate path name by stripping the
/// `(Cad N)` prefix, the trailing `(X).tif` colour tag and any leftover
/// extension. Too-short results are rejected as noise.
pub fn recover_ticket_name(path_name: &str) -> Option<String> {
    let mut cleaned = path_name.trim();

    if cleaned.starts_with('(') {
        if let Some(close) = cleaned.find(')') {
            cleaned = cleaned[close + 1..].trim_start();
        }
    }

    let mut owned = strip_colour_tif_suffix(cleaned);
    owned = strip_extension(&owned);

    let trimmed = owned.trim();
    if trimmed.len() > 2 {
        Some(trimmed.to_string())
    } else {
        None
    }
}

/// Strip a trailing `"(X).tif"` (X ∈ CMYK, case-insensitive).
fn strip_colour_tif_suffix(name: &str) -> String {
    let n = name.len();
    if n >= 7 && name.is_char_boundary(n - 7) {
        let tail = &name[n - 7..];
        let bytes = tail.as_bytes();
        if bytes[0] == b'('
            && bytes[2] == b')'
            && Colour::from_char(bytes[1] as char).is_some()
            && tail[3..].eq_ignore_ascii_case(".tif")
        {
            return name[..n - 7].trim_end().to_string();
        }
    }
    name.to_string()
}

/// Strip a trailing `.tif`/`.pdf`/`.txt`/`.tmp` extension (case-insensitive).
fn strip_extension(name: &str) -> String {
    let n = name.len();
    if n >= 4 && name.is_char_boundary(n - 4) {
        let tail = &name[n - 4..];
        for ext in [".tif", ".pdf", ".txt", ".tmp"] {
            if tail.eq_ignore_ascii_case(ext) {
                return name[..n - 4].to_string();
            }
        }
    }
    name.to_string()
}

/// Extract a colour channel from a name: a parenthesized single-letter
/// tag `(M)` first, then a `_M.`/`-M` suffix convention.
pub fn extract_colour(source: &str) -> Option<Colour> {
    let bytes = source.as_bytes();

    for i in 0..bytes.len().saturating_sub(2) {
        if bytes[i] == b'(' && bytes[i + 2] == b')' {
            if let Some(colour) = Colour::from_char(bytes[i + 1] as char) {
                return Some(colour);
            }
        }
    }

    for i in 0..bytes.len().saturating_sub(1) {
        if bytes[i] == b'_' || bytes[i] == b'-' {
            if let Some(colour) = Colour::from_char(bytes[i + 1] as char) {
                let boundary = bytes.get(i + 2);
                if boundary.is_none() || boundary == Some(&b'.') {
                    return Some(colour);
                }
            }
        }
    }

    None
}

/// Extract a booklet identifier from a `(Cad N)` tag anywhere in the name.
pub fn extract_caderno(source: &str) -> Option<String> {
    let mut rest = source;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(')') else {
            return None;
        };
        let inside = after[..close].trim();
        let lower = inside.to_lowercase();
        if let Some(tail) = lower.strip_prefix("cad") {
            if tail.starts_with(char::is_whitespace) {
                let value = inside[3..].trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
        rest = &after[close + 1..];
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_caderno_and_colour_from_name() {
        let plate = normalize_plate(&json!({
            "path_name": "(Cad 2) 00123-00456_Pasta (M).tif",
            "status": "Ready"
        }))
        .unwrap();

        assert_eq!(plate.caderno.as_deref(), Some("2"));
        assert_eq!(plate.colour, Some(Colour::M));
        assert_eq!(plate.ticket_name.as_deref(), Some("00123-00456_Pasta"));
    }

    #[test]
    fn test_suffix_colour_convention() {
        assert_eq!(extract_colour("06558_SM72_K.tif"), Some(Colour::K));
        assert_eq!(extract_colour("06558_SM72-Y"), Some(Colour::Y));
        assert_eq!(extract_colour("06558_SM72_X.tif"), None);
    }

    #[test]
    fn test_paren_tag_wins_over_suffix() {
        assert_eq!(extract_colour("a_K_(C).tif"), Some(Colour::C));
    }

    #[test]
    fn test_no_pattern_leaves_fields_none() {
        let plate = normalize_plate(&json!({
            "path_name": "avulso.tif",
            "status": "Ready"
        }))
        .unwrap();

        assert_eq!(plate.colour, None);
        assert_eq!(plate.caderno, None);
    }

    #[test]
    fn test_explicit_fields_win() {
        let plate = normalize_plate(&json!({
            "path_name": "(Cad 1) x_K.tif",
            "colour": "M",
            "caderno": "(Cad 7) algo.tif",
            "ticket_name": "T9"
        }))
        .unwrap();

        assert_eq!(plate.colour, Some(Colour::M));
        assert_eq!(plate.caderno.as_deref(), Some("7"));
        assert_eq!(plate.ticket_name.as_deref(), Some("T9"));
    }

    #[test]
    fn test_plain_caderno_value_kept() {
        let plate = normalize_plate(&json!({
            "path_name": "x_algum_nome.tif",
            "caderno": "3"
        }))
        .unwrap();

        assert_eq!(plate.caderno.as_deref(), Some("3"));
    }

    #[test]
    fn test_recover_ticket_name_variants() {
        assert_eq!(
            recover_ticket_name("(Cad 1) 06558-06572_SM72_Pasta_FF.PDF (C).tif").as_deref(),
            Some("06558-06572_SM72_Pasta_FF.PDF")
        );
        assert_eq!(
            recover_ticket_name("trabalho_gravacao.pdf").as_deref(),
            Some("trabalho_gravacao")
        );
        // too short after cleaning
        assert_eq!(recover_ticket_name("(Cad 1) ab.tif"), None);
    }

    #[test]
    fn test_unattachable_record_is_skipped() {
        assert!(normalize_plate(&json!({"status": "Ready"})).is_none());
    }

    #[test]
    fn test_timestamps_parsed_leniently() {
        let plate = normalize_plate(&json!({
            "path_name": "(Cad 1) Pasta_Grande (C).tif",
            "inicio": "2024-05-01 10:00:00",
            "fim": "quase pronto"
        }))
        .unwrap();

        assert!(plate.start_at.is_some());
        assert_eq!(plate.printed_at, None);
        assert_eq!(plate.printed_at_raw.as_deref(), Some("quase pronto"));
    }
}
