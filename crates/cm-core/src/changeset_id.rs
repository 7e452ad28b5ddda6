//! Changeset identifiers.
//!
//! An identifier is a 14-digit UTC timestamp (`YYYYMMDDHHMMSS`), an
//! underscore, and a snake_case name: `20240115093000_initial_schema`. The
//! fixed-width prefix makes plain string ordering chronological, so the
//! runner only ever sorts identifiers and never needs a central sequence.

use crate::error::{CoreError, CoreResult};
use crate::identifier::define_identifier;

/// Width of the timestamp prefix.
const TIMESTAMP_LEN: usize = 14;

define_identifier! {
    /// Ordered, immutable identifier of a changeset.
    pub struct ChangesetId;
    validate = validate_changeset_id;
}

impl ChangesetId {
    /// The `YYYYMMDDHHMMSS` prefix.
    pub fn timestamp(&self) -> &str {
        &self.as_str()[..TIMESTAMP_LEN]
    }

    /// The human-readable part after the timestamp prefix.
    pub fn name(&self) -> &str {
        &self.as_str()[TIMESTAMP_LEN + 1..]
    }
}

fn validate_changeset_id(id: &str) -> CoreResult<()> {
    let invalid = |reason: &str| CoreError::InvalidChangesetId {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    let bytes = id.as_bytes();
    if bytes.len() < TIMESTAMP_LEN + 2 {
        return Err(invalid("expected `YYYYMMDDHHMMSS_name`"));
    }
    if !bytes[..TIMESTAMP_LEN].iter().all(u8::is_ascii_digit) {
        return Err(invalid("must start with a 14-digit timestamp"));
    }
    if bytes[TIMESTAMP_LEN] != b'_' {
        return Err(invalid("timestamp must be followed by '_'"));
    }

    let month = &id[4..6];
    let day = &id[6..8];
    if !("01"..="12").contains(&month) || !("01"..="31").contains(&day) {
        return Err(invalid("timestamp has an out-of-range month or day"));
    }
    if &id[8..10] > "23" || &id[10..12] > "59" || &id[12..14] > "59" {
        return Err(invalid("timestamp has an out-of-range time of day"));
    }

    let name = &id[TIMESTAMP_LEN + 1..];
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    {
        return Err(invalid("name must be snake_case"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "changeset_id_test.rs"]
mod tests;
