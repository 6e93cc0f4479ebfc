pub mod availability;
pub mod slots;
pub mod therapist;

pub use availability::{AvailabilityModel, OpenInterval};
pub use slots::SlotGenerator;
pub use therapist::{ScheduleSource, TherapistService};
