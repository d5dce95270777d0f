use serde::Serialize;

use super::enrollment::check_if_enrolled;
use super::exam::is_multi_choice;
use crate::auth::Principal;
use crate::storage::{
    traits::{Choice, Course, Instructor, Lesson, Question},
    StorageRead,
};
use crate::types::{OnlineCourseError, COURSE_LIST_LIMIT};

/// A course as the catalogue shows it to one viewer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CourseListing {
    #[serde(flatten)]
    pub course: Course,
    pub is_enrolled: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChoiceView {
    pub id: i64,
    pub choice_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuestionView {
    pub id: i64,
    pub question_text: String,
    pub grade: u32,
    pub is_multi_choice: bool,
    pub choices: Vec<ChoiceView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LessonView {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub questions: Vec<QuestionView>,
}

/// Course with its instructors, ordered lessons, and the exam questions
/// hanging off each lesson.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CourseContent {
    #[serde(flatten)]
    pub course: Course,
    pub instructors: Vec<Instructor>,
    pub lessons: Vec<LessonView>,
}

impl CourseContent {
    /// Choice correctness is only included when `reveal_answers` is set.
    pub fn assemble(
        course: Course,
        instructors: Vec<Instructor>,
        lessons: Vec<Lesson>,
        questions: &[Question],
        choices: &[Choice],
        reveal_answers: bool,
    ) -> Self {
        let lessons = lessons
            .into_iter()
            .map(|lesson| {
                let questions = questions
                    .iter()
                    .filter(|q| q.lesson_id == lesson.id)
                    .map(|q| {
                        let own: Vec<Choice> = choices
                            .iter()
                            .filter(|c| c.question_id == q.id)
                            .cloned()
                            .collect();
                        QuestionView {
                            id: q.id,
                            question_text: q.question_text.clone(),
                            grade: q.grade,
                            is_multi_choice: is_multi_choice(&own),
                            choices: own
                                .into_iter()
                                .map(|c| ChoiceView {
                                    id: c.id,
                                    choice_text: c.choice_text,
                                    is_correct: reveal_answers.then_some(c.is_correct),
                                })
                                .collect(),
                        }
                    })
                    .collect();
                LessonView { lesson, questions }
            })
            .collect();

        Self {
            course,
            instructors,
            lessons,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub content: CourseContent,
    pub is_enrolled: bool,
}

/// Top courses by enrollment, each annotated with the viewer's status.
pub fn list_courses<R: StorageRead>(
    storage: &R,
    principal: &Principal,
) -> Result<Vec<CourseListing>, OnlineCourseError> {
    let courses = storage.list_courses_by_enrollment(COURSE_LIST_LIMIT)?;
    courses
        .into_iter()
        .map(|course| {
            let is_enrolled = check_if_enrolled(storage, principal, course.id)?;
            Ok(CourseListing {
                course,
                is_enrolled,
            })
        })
        .collect()
}

pub fn load_course_content<R: StorageRead>(
    storage: &R,
    course: Course,
    reveal_answers: bool,
) -> Result<CourseContent, OnlineCourseError> {
    let instructors = storage.list_course_instructors(course.id)?;
    let lessons = storage.list_lessons(course.id)?;
    let questions = storage.list_course_questions(course.id)?;
    let choices = storage.list_course_choices(course.id)?;
    Ok(CourseContent::assemble(
        course,
        instructors,
        lessons,
        &questions,
        &choices,
        reveal_answers,
    ))
}

pub fn course_detail<R: StorageRead>(
    storage: &R,
    principal: &Principal,
    course_id: i64,
) -> Result<CourseDetail, OnlineCourseError> {
    let course = storage
        .load_course(course_id)?
        .ok_or(OnlineCourseError::CourseNotFound(course_id))?;
    let is_enrolled = check_if_enrolled(storage, principal, course.id)?;
    let content = load_course_content(storage, course, false)?;
    Ok(CourseDetail {
        content,
        is_enrolled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::courses::enrollment::enroll;
    use crate::courses::test_support::{seed_course, seeded_storage, user_principal};

    #[test]
    fn list_courses_marks_enrolled_courses_for_viewer() {
        let (_dir, storage) = seeded_storage();
        let seeded = seed_course(&storage, "rust");
        let other = seed_course(&storage, "go");
        let viewer = user_principal(&storage, "ada");

        enroll(&storage, &viewer, seeded.course_id).unwrap();

        let listing = list_courses(&storage, &viewer).unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].course.id, seeded.course_id);
        assert!(listing[0].is_enrolled);
        assert_eq!(listing[1].course.id, other.course_id);
        assert!(!listing[1].is_enrolled);

        let anonymous = list_courses(&storage, &Principal::Anonymous).unwrap();
        assert!(anonymous.iter().all(|c| !c.is_enrolled));
    }

    #[test]
    fn course_detail_hides_answers() {
        let (_dir, storage) = seeded_storage();
        let seeded = seed_course(&storage, "rust");

        let detail = course_detail(&storage, &Principal::Anonymous, seeded.course_id).unwrap();
        assert!(!detail.is_enrolled);
        assert_eq!(detail.content.lessons.len(), 1);
        let questions = &detail.content.lessons[0].questions;
        assert_eq!(questions.len(), 3);
        assert!(questions[0].is_multi_choice);
        assert!(!questions[1].is_multi_choice);
        assert!(questions
            .iter()
            .flat_map(|q| q.choices.iter())
            .all(|c| c.is_correct.is_none()));

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["name"], "rust");
        assert!(json["lessons"][0]["questions"][0]["choices"][0]
            .get("is_correct")
            .is_none());
    }

    #[test]
    fn course_detail_unknown_course_is_not_found() {
        let (_dir, storage) = seeded_storage();
        let err = course_detail(&storage, &Principal::Anonymous, 77).unwrap_err();
        assert_eq!(err, OnlineCourseError::CourseNotFound(77));
    }
}
