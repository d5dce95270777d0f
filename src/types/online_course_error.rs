use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum OnlineCourseError {
    #[error("course not found: {0}")]
    CourseNotFound(i64),
    #[error("submission not found: {0}")]
    SubmissionNotFound(i64),
    #[error("no enrollment for user {user_id:?} in course {course_id}")]
    EnrollmentNotFound { user_id: Option<i64>, course_id: i64 },
    #[error("User already exists.")]
    UserExists,
    #[error("The given username must be set")]
    MissingUsername,
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("invalid choice id: {0}")]
    InvalidChoice(String),
    #[error("invalid enrollment mode: {0}")]
    InvalidMode(String),
    #[error("staff access required")]
    Forbidden,
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<anyhow::Error> for OnlineCourseError {
    fn from(err: anyhow::Error) -> Self {
        OnlineCourseError::StorageError(format!("{:#}", err))
    }
}
