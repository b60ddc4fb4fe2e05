pub mod attendance;
pub mod credits;
pub mod enrollment;

pub use attendance::AttendanceService;
pub use enrollment::{EnrollmentService, OfferingLocks};
