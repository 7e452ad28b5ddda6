//! Clinic changesets, one module per changeset.

use cm_migrate::Changeset;

mod m20240115_093000_initial_schema;
mod m20240203_141500_add_appointment_notes;
mod m20240220_101000_create_medical_records;
mod m20240305_160000_add_record_attachments;
mod m20240318_120000_create_data_protection_keys;
mod m20240402_090000_add_patient_contact_fields;
mod m20240419_113000_add_doctor_specialty;

pub use m20240115_093000_initial_schema::InitialSchema;
pub use m20240203_141500_add_appointment_notes::AddAppointmentNotes;
pub use m20240220_101000_create_medical_records::CreateMedicalRecords;
pub use m20240305_160000_add_record_attachments::AddRecordAttachments;
pub use m20240318_120000_create_data_protection_keys::{
    CreateDataProtectionKeys, KEY_RING_MARKER,
};
pub use m20240402_090000_add_patient_contact_fields::AddPatientContactFields;
pub use m20240419_113000_add_doctor_specialty::AddDoctorSpecialty;

pub(crate) fn all() -> Vec<Box<dyn Changeset>> {
    vec![
        Box::new(InitialSchema),
        Box::new(AddAppointmentNotes),
        Box::new(CreateMedicalRecords),
        Box::new(AddRecordAttachments),
        Box::new(CreateDataProtectionKeys),
        Box::new(AddPatientContactFields),
        Box::new(AddDoctorSpecialty),
    ]
}
