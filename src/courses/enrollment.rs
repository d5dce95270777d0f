use crate::auth::Principal;
use crate::storage::{Storage, StorageRead, StorageTx, StorageWrite};
use crate::types::{EnrollmentMode, OnlineCourseError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled { enrollment_id: i64 },
    AlreadyEnrolled,
    Anonymous,
}

/// True iff the principal has at least one enrollment in the course.
/// Anonymous principals are never enrolled and never hit storage.
pub fn check_if_enrolled<R: StorageRead>(
    storage: &R,
    principal: &Principal,
    course_id: i64,
) -> Result<bool, OnlineCourseError> {
    let Some(user_id) = principal.user_id() else {
        return Ok(false);
    };
    Ok(storage.count_enrollments(user_id, course_id)? > 0)
}

/// Enroll the principal in honor mode and bump the course counter.
///
/// The existence check, the insert and the counter update share one
/// immediate transaction, so concurrent enrolls for the same pair cannot
/// double count.
pub fn enroll<S: Storage>(
    storage: &S,
    principal: &Principal,
    course_id: i64,
) -> Result<EnrollOutcome, OnlineCourseError> {
    if storage.load_course(course_id)?.is_none() {
        return Err(OnlineCourseError::CourseNotFound(course_id));
    }
    let Some(user_id) = principal.user_id() else {
        return Ok(EnrollOutcome::Anonymous);
    };

    let tx = storage.begin_tx()?;
    if tx.count_enrollments(user_id, course_id)? > 0 {
        return Ok(EnrollOutcome::AlreadyEnrolled);
    }
    let enrollment_id = tx.insert_enrollment(user_id, course_id, EnrollmentMode::Honor)?;
    tx.increment_total_enrollment(course_id)?;
    tx.commit()?;

    log::info!(
        "📚 user {} enrolled in course {} (enrollment {})",
        user_id,
        course_id,
        enrollment_id
    );
    Ok(EnrollOutcome::Enrolled { enrollment_id })
}
