pub mod conflict;
pub mod lifecycle;
pub mod scheduler;
pub mod store;

pub use conflict::{ConflictValidator, Rejection, ValidationOutcome};
pub use lifecycle::AppointmentLifecycleService;
pub use scheduler::AppointmentScheduler;
pub use store::{AppointmentStore, SupabaseAppointmentStore};
