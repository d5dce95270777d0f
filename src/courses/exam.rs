use std::collections::HashSet;

use serde::Serialize;

use super::catalog::CourseContent;
use crate::auth::Principal;
use crate::storage::{
    traits::{Choice, Question},
    Storage, StorageRead, StorageTx, StorageWrite,
};
use crate::types::{OnlineCourseError, CHOICE_FIELD_PREFIX};

/// Collect the choice ids from exam form fields. Only keys carrying the
/// choice prefix count; their values must be integer ids.
pub fn extract_answers<'a, I>(fields: I) -> Result<Vec<i64>, OnlineCourseError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    fields
        .into_iter()
        .filter(|(key, _)| key.starts_with(CHOICE_FIELD_PREFIX))
        .map(|(_, value)| {
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| OnlineCourseError::InvalidChoice(value.to_string()))
        })
        .collect()
}

/// More than one correct choice.
pub fn is_multi_choice(choices: &[Choice]) -> bool {
    choices.iter().filter(|c| c.is_correct).count() > 1
}

/// Full credit iff every correct choice of the question was selected.
///
/// Incorrect selections are not looked at: picking every choice of a
/// question still earns its grade.
pub fn is_get_score(question: &Question, choices: &[Choice], selected: &HashSet<i64>) -> bool {
    let correct = || {
        choices
            .iter()
            .filter(|c| c.question_id == question.id && c.is_correct)
    };
    let all_answers = correct().count();
    let selected_correct = correct().filter(|c| selected.contains(&c.id)).count();
    all_answers == selected_correct
}

/// Floor of `earned * 100 / possible`. A course without graded questions
/// scores zero.
pub fn percent_score(earned: u64, possible: u64) -> u64 {
    if possible == 0 {
        return 0;
    }
    earned * 100 / possible
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ExamScore {
    pub earned: u64,
    pub possible: u64,
    /// Exposed on results as `grade`.
    #[serde(skip_serializing)]
    pub percent: u64,
}

pub fn grade_exam(questions: &[Question], choices: &[Choice], selected: &HashSet<i64>) -> ExamScore {
    let earned = questions
        .iter()
        .filter(|q| is_get_score(q, choices, selected))
        .map(|q| q.grade as u64)
        .sum();
    let possible = questions.iter().map(|q| q.grade as u64).sum();
    ExamScore {
        earned,
        possible,
        percent: percent_score(earned, possible),
    }
}

/// Record an exam attempt for the principal's enrollment in the course.
/// Returns the new submission id.
pub fn submit<S: Storage>(
    storage: &S,
    principal: &Principal,
    course_id: i64,
    choice_ids: &[i64],
) -> Result<i64, OnlineCourseError> {
    if storage.load_course(course_id)?.is_none() {
        return Err(OnlineCourseError::CourseNotFound(course_id));
    }
    let enrollment = match principal.user_id() {
        Some(user_id) => storage.load_enrollment(user_id, course_id)?,
        None => None,
    };
    let Some(enrollment) = enrollment else {
        return Err(OnlineCourseError::EnrollmentNotFound {
            user_id: principal.user_id(),
            course_id,
        });
    };

    let tx = storage.begin_tx()?;
    let submission_id = tx.insert_submission(enrollment.id)?;
    tx.add_submission_choices(submission_id, choice_ids)?;
    tx.commit()?;

    log::info!(
        "📝 submission {} for enrollment {} with {} choices",
        submission_id,
        enrollment.id,
        choice_ids.len()
    );
    Ok(submission_id)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExamResult {
    pub course: CourseContent,
    pub grade: u64,
    pub score: ExamScore,
    pub selected_ids: Vec<i64>,
}

pub fn show_exam_result<R: StorageRead>(
    storage: &R,
    course_id: i64,
    submission_id: i64,
) -> Result<ExamResult, OnlineCourseError> {
    let course = storage
        .load_course(course_id)?
        .ok_or(OnlineCourseError::CourseNotFound(course_id))?;
    let Some(submission) = storage.load_submission(submission_id)? else {
        return Err(OnlineCourseError::SubmissionNotFound(submission_id));
    };
    log::debug!(
        "grading submission {} of enrollment {}",
        submission.id,
        submission.enrollment_id
    );

    let selected_ids = storage.list_submission_choice_ids(submission.id)?;
    let selected: HashSet<i64> = selected_ids.iter().copied().collect();
    let questions = storage.list_course_questions(course.id)?;
    let choices = storage.list_course_choices(course.id)?;

    let score = grade_exam(&questions, &choices, &selected);
    if score.possible == 0 {
        log::warn!("course {} has no graded questions", course.id);
    }

    let instructors = storage.list_course_instructors(course.id)?;
    let lessons = storage.list_lessons(course.id)?;
    let content = CourseContent::assemble(course, instructors, lessons, &questions, &choices, true);

    Ok(ExamResult {
        course: content,
        grade: score.percent,
        score,
        selected_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::courses::enrollment::enroll;
    use crate::courses::test_support::{seed_course, seeded_storage, user_principal};

    fn question(id: i64, grade: u32) -> Question {
        Question {
            id,
            lesson_id: 1,
            question_text: format!("question {id}"),
            grade,
        }
    }

    fn choice(id: i64, question_id: i64, is_correct: bool) -> Choice {
        Choice {
            id,
            question_id,
            choice_text: format!("choice {id}"),
            is_correct,
        }
    }

    fn selected(ids: &[i64]) -> HashSet<i64> {
        ids.iter().copied().collect()
    }

    // A=1, B=2 correct, C=3 wrong
    fn abc() -> (Question, Vec<Choice>) {
        (
            question(1, 10),
            vec![choice(1, 1, true), choice(2, 1, true), choice(3, 1, false)],
        )
    }

    #[test]
    fn exact_correct_selection_scores() {
        let (q, choices) = abc();
        assert!(is_get_score(&q, &choices, &selected(&[1, 2])));
    }

    #[test]
    fn over_selection_still_scores() {
        let (q, choices) = abc();
        assert!(is_get_score(&q, &choices, &selected(&[1, 2, 3])));
    }

    #[test]
    fn partial_selection_scores_zero() {
        let (q, choices) = abc();
        assert!(!is_get_score(&q, &choices, &selected(&[1])));
        assert!(!is_get_score(&q, &choices, &selected(&[1, 3])));
        assert!(!is_get_score(&q, &choices, &selected(&[])));
    }

    #[test]
    fn selections_for_other_questions_do_not_count() {
        let (q, mut choices) = abc();
        choices.push(choice(4, 2, true));
        assert!(!is_get_score(&q, &choices, &selected(&[1, 4])));
    }

    #[test]
    fn multi_choice_needs_two_correct_choices() {
        let (_, choices) = abc();
        assert!(is_multi_choice(&choices));
        assert!(!is_multi_choice(&choices[1..]));
    }

    #[test]
    fn percent_is_floored() {
        let questions = vec![question(1, 10), question(2, 20), question(3, 30)];
        let choices = vec![
            choice(1, 1, true),
            choice(2, 2, true),
            choice(3, 3, true),
            choice(4, 3, false),
        ];
        let score = grade_exam(&questions, &choices, &selected(&[1, 2, 4]));
        assert_eq!(score.earned, 30);
        assert_eq!(score.possible, 60);
        assert_eq!(score.percent, 50);

        assert_eq!(percent_score(1, 3), 33);
        assert_eq!(percent_score(2, 3), 66);
        assert_eq!(percent_score(5, 0), 0);
    }

    #[test]
    fn extract_answers_reads_prefixed_fields_only() {
        let fields = [
            ("csrfmiddlewaretoken", "abc"),
            ("choice_1", "11"),
            ("choice_2", " 12 "),
            ("comment", "99"),
        ];
        let ids = extract_answers(fields.iter().copied()).unwrap();
        assert_eq!(ids, vec![11, 12]);
    }

    #[test]
    fn extract_answers_rejects_non_numeric_values() {
        let err = extract_answers([("choice_1", "abc")]).unwrap_err();
        assert_eq!(err, OnlineCourseError::InvalidChoice("abc".to_string()));
    }

    #[test]
    fn submit_without_enrollment_fails() {
        let (_dir, storage) = seeded_storage();
        let rust = seed_course(&storage, "rust");
        let ada = user_principal(&storage, "ada");

        let err = submit(&storage, &ada, rust.course_id, &[]).unwrap_err();
        assert!(matches!(err, OnlineCourseError::EnrollmentNotFound { .. }));

        let err = submit(&storage, &Principal::Anonymous, rust.course_id, &[]).unwrap_err();
        assert_eq!(
            err,
            OnlineCourseError::EnrollmentNotFound {
                user_id: None,
                course_id: rust.course_id
            }
        );
    }

    #[test]
    fn submit_and_show_result_scores_course() {
        let (_dir, storage) = seeded_storage();
        let rust = seed_course(&storage, "rust");
        let ada = user_principal(&storage, "ada");
        enroll(&storage, &ada, rust.course_id).unwrap();

        // q1 (10): both correct picked plus the wrong one, q2 (20): correct,
        // q3 (30): wrong choice only
        let picks = [
            rust.correct[0],
            rust.correct[1],
            rust.wrong[0],
            rust.correct[2],
            rust.wrong[2],
        ];
        let submission_id = submit(&storage, &ada, rust.course_id, &picks).unwrap();

        let result = show_exam_result(&storage, rust.course_id, submission_id).unwrap();
        assert_eq!(result.score.earned, 30);
        assert_eq!(result.score.possible, 60);
        assert_eq!(result.grade, 50);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["grade"], 50);
        assert_eq!(json["score"], serde_json::json!({"earned": 30, "possible": 60}));
        let mut expected = picks.to_vec();
        expected.sort();
        assert_eq!(result.selected_ids, expected);
        assert!(result.course.lessons[0].questions[0].choices[0]
            .is_correct
            .is_some());
    }

    #[test]
    fn show_result_reports_missing_records() {
        let (_dir, storage) = seeded_storage();
        let rust = seed_course(&storage, "rust");

        let err = show_exam_result(&storage, 999, 1).unwrap_err();
        assert_eq!(err, OnlineCourseError::CourseNotFound(999));
        let err = show_exam_result(&storage, rust.course_id, 1).unwrap_err();
        assert_eq!(err, OnlineCourseError::SubmissionNotFound(1));
    }
}
