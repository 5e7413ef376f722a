//! Upstream record adapters (the event normalizer).
//!
//! Converts heterogeneous raw imaging-system records — tickets and
//! per-plate path events — into the canonical shapes the engine works
//! with. One adapter function per upstream schema; every accepted legacy
//! field name lives in the [`fields`] mapping tables rather than in
//! inline fallback chains.
//!
//! Adapters never fail a batch: a record without identity yields `None`
//! and is skipped, malformed timestamps pass through as opaque strings.

pub mod fields;
mod plate;
mod ticket;
mod timestamp;
mod types;

pub use plate::{extract_caderno, extract_colour, normalize_plate, recover_ticket_name};
pub use ticket::normalize_ticket;
pub use timestamp::parse_timestamp;
pub use types::{Colour, NormalizedPlate, NormalizedTicket, PlateStatus};
