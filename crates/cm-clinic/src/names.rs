//! Table names shared between changesets.

pub const USERS: &str = "users";
pub const DOCTORS: &str = "doctors";
pub const PATIENTS: &str = "patients";
pub const APPOINTMENTS: &str = "appointments";
pub const MEDICAL_RECORDS: &str = "medical_records";
pub const MEDICAL_RECORD_ATTACHMENTS: &str = "medical_record_attachments";
pub const DATA_PROTECTION_KEYS: &str = "data_protection_keys";
