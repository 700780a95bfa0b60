//! Experience stores for ClinSim.
//!
//! Each store is a sparse landmark set of prior question/answer exchanges,
//! keyed by question embeddings. Inserts are deduplicated by cosine
//! similarity against every stored key; lookups return the nearest
//! exemplars above a threshold, capped at two, and are injected into
//! generation prompts as few-shot grounding.
//!
//! Two shapes exist: the patient store keys on a single question, the
//! doctor store on a chained pair of questions with independent
//! thresholds. Thresholds differ per store and are deliberately not
//! unified.

mod codec;
mod error;
mod record;
mod store;

pub use codec::{decode_patient_row, decode_doctor_row, encode_patient_row, encode_doctor_row};
pub use error::StoreError;
pub use record::{DoctorExchange, ExperienceRecord};
pub use store::{DoctorEvolveStore, DoctorStoreConfig, PatientEvolveStore, PatientStoreConfig};
