pub mod attendance;
pub mod course;
pub mod enrollment;
pub mod offering;
pub mod person;
pub mod role;

pub use attendance::{
    AttendanceEntry, AttendanceRecord, AttendanceStatus, AttendanceSummary, MarkAttendanceRequest,
    MarkReceipt,
};
pub use course::{Course, NewCourseRequest};
pub use enrollment::{Enrollment, EnrollmentReceipt, EnrollmentRequest};
pub use offering::{DEFAULT_CAPACITY, NewOfferingRequest, Offering, OfferingSummary};
pub use person::{Instructor, NewPersonRequest, RosterEntry, Student};
pub use role::Role;
