mod enrollment_mode;
mod online_course_error;

pub use enrollment_mode::EnrollmentMode;
pub use online_course_error::OnlineCourseError;

/// Key prefix marking an exam form field as a choice selector.
pub const CHOICE_FIELD_PREFIX: &str = "choice";

/// Number of courses shown on the catalogue page.
pub const COURSE_LIST_LIMIT: usize = 10;
