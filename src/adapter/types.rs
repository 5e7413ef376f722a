//! Canonical shapes produced by the upstream adapters.
//!
//! Raw imaging-system records arrive with inconsistent field names and
//! formats; everything downstream of this module only ever sees these
//! types. Fields that could not be resolved stay `None` — they are never
//! guessed later in the pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Colour channel of a plate exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Colour {
    C,
    M,
    Y,
    K,
}

impl Colour {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Colour::C),
            'M' => Some(Colour::M),
            'Y' => Some(Colour::Y),
            'K' => Some(Colour::K),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Colour::C => "C",
            Colour::M => "M",
            Colour::Y => "Y",
            Colour::K => "K",
        }
    }

    /// CMYK press order, used for plate display sorting.
    pub fn sort_order(&self) -> u8 {
        match self {
            Colour::C => 0,
            Colour::M => 1,
            Colour::Y => 2,
            Colour::K => 3,
        }
    }
}

/// Reduced plate status. The raw status string is kept alongside on the
/// plate; this is the classification the metrics and display logic use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlateStatus {
    Printing,
    Ready,
    Printed,
    Other,
}

/// Status strings the imaging system uses for a finished plate. Upstream
/// mixes English and Portuguese spellings.
const PRINTED_STATUSES: &[&str] = &["printed", "done", "completed", "successo", "success"];

impl PlateStatus {
    /// Classify a raw status string. A completion timestamp counts as
    /// completed even when the status string disagrees — upstream systems
    /// are inconsistent about which of the two they set.
    pub fn classify(raw_status: &str, has_printed_at: bool) -> Self {
        let val = raw_status.trim().to_lowercase();
        if has_printed_at || PRINTED_STATUSES.contains(&val.as_str()) {
            return PlateStatus::Printed;
        }
        if val.contains("print") {
            return PlateStatus::Printing;
        }
        if val.contains("ready") || val.contains("waiting") {
            return PlateStatus::Ready;
        }
        PlateStatus::Other
    }

    pub fn sort_order(&self) -> u8 {
        match self {
            PlateStatus::Printing => 0,
            PlateStatus::Ready => 1,
            PlateStatus::Printed => 2,
            PlateStatus::Other => 3,
        }
    }
}

/// One submitted job ticket, normalized.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedTicket {
    /// Unique name within the imaging system.
    pub name: String,
    /// Raw status string, trimmed. Job status derivation works on
    /// prefixes of this value.
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Original timestamp text, kept when the lenient parser gave up.
    pub created_at_raw: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub last_update_raw: Option<String>,
    /// Order number from the ticket registry (the only trusted source).
    pub nr_os: Option<String>,
    pub ano: Option<String>,
}

/// One physical plate exposure, normalized.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedPlate {
    /// Owning ticket name, resolved from an explicit field or recovered
    /// from the path name.
    pub ticket_name: Option<String>,
    pub path_name: Option<String>,
    pub colour: Option<Colour>,
    /// Booklet identifier ("Cad N") grouping plates within a ticket.
    pub caderno: Option<String>,
    pub status: String,
    pub start_at: Option<DateTime<Utc>>,
    pub start_at_raw: Option<String>,
    pub printed_at: Option<DateTime<Utc>>,
    pub printed_at_raw: Option<String>,
}

impl NormalizedPlate {
    pub fn plate_status(&self) -> PlateStatus {
        PlateStatus::classify(&self.status, self.printed_at.is_some() || self.printed_at_raw.is_some())
    }

    /// A plate counts as completed when its status says so or when it
    /// carries any completion timestamp, parsed or not.
    pub fn is_completed(&self) -> bool {
        self.plate_status() == PlateStatus::Printed
    }

    /// Identity of a plate event for duplicate suppression: the same
    /// booklet, colour and completion text means the same physical
    /// exposure delivered twice.
    pub fn fingerprint(&self) -> (String, String, String) {
        (
            self.caderno.clone().unwrap_or_default(),
            self.colour.map(|c| c.as_str().to_string()).unwrap_or_default(),
            self.printed_at_raw.clone().unwrap_or_default(),
        )
    }

    /// Duration of the exposure in seconds, when both timestamps parsed
    /// and the difference is positive. Negative spans come from clock
    /// skew and would corrupt the ETA average, so they yield `None`.
    pub fn duration_seconds(&self) -> Option<f64> {
        let start = self.start_at?;
        let end = self.printed_at?;
        let diff = (end - start).num_milliseconds() as f64 / 1000.0;
        if diff > 0.0 { Some(diff) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_printed_by_status() {
        assert_eq!(PlateStatus::classify("Printed", false), PlateStatus::Printed);
        assert_eq!(PlateStatus::classify("done", false), PlateStatus::Printed);
        assert_eq!(PlateStatus::classify("successo", false), PlateStatus::Printed);
    }

    #[test]
    fn test_classify_printed_by_timestamp() {
        // status says ready, but the completion timestamp wins
        assert_eq!(PlateStatus::classify("Ready", true), PlateStatus::Printed);
    }

    #[test]
    fn test_classify_printing_vs_ready() {
        assert_eq!(PlateStatus::classify("Printing plate 2", false), PlateStatus::Printing);
        assert_eq!(PlateStatus::classify("Ready", false), PlateStatus::Ready);
        assert_eq!(PlateStatus::classify("Waiting for media", false), PlateStatus::Ready);
        assert_eq!(PlateStatus::classify("Aborted", false), PlateStatus::Other);
    }

    #[test]
    fn test_duration_excludes_negative() {
        use chrono::TimeZone;
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 30).unwrap();

        let mut plate = NormalizedPlate {
            ticket_name: None,
            path_name: Some("p".into()),
            colour: None,
            caderno: None,
            status: "Printed".into(),
            start_at: Some(t1),
            start_at_raw: None,
            printed_at: Some(t0),
            printed_at_raw: None,
        };
        assert_eq!(plate.duration_seconds(), None);

        plate.start_at = Some(t0);
        plate.printed_at = Some(t1);
        assert_eq!(plate.duration_seconds(), Some(30.0));
    }
}
