pub mod catalog;
pub mod enrollment;
pub mod exam;

pub use catalog::{course_detail, list_courses, CourseListing};
pub use enrollment::{enroll, EnrollOutcome};
pub use exam::{extract_answers, show_exam_result, submit};
