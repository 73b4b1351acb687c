pub mod log;
pub mod medication;
pub mod pattern;
pub mod relations;
pub mod side_effect;
pub mod user;

pub use log::{LogInput, LogStatus, MedicationLog, SeverityLevel};
pub use medication::{Medication, MedicationInput, MedicationSchedule};
pub use pattern::{MedicationPattern, PatternInput, ScheduleType};
pub use relations::{LogWithMedication, MedicationWithRelations};
pub use side_effect::{default_catalog, SideEffectType};
pub use user::{CurrentUser, Session, User};
