use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::types::EnrollmentMode;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub date_joined: NaiveDateTime,
}

#[derive(Clone, Debug)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
    pub is_staff: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Instructor {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub full_time: bool,
    pub total_learners: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Learner {
    pub id: i64,
    pub user_id: i64,
    pub level: i64,
    pub occupation: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub description: String,
    pub pub_date: Option<NaiveDate>,
    pub total_enrollment: i64,
}

#[derive(Clone, Debug)]
pub struct NewCourse<'a> {
    pub name: &'a str,
    pub image: &'a str,
    pub description: &'a str,
    pub pub_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Lesson {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub order: i64,
    pub content: String,
}

#[derive(Clone, Debug)]
pub struct NewLesson<'a> {
    pub course_id: i64,
    pub title: &'a str,
    pub order: i64,
    pub content: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: i64,
    pub lesson_id: i64,
    pub question_text: String,
    pub grade: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub choice_text: String,
    pub is_correct: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enrollment {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub date_enrolled: NaiveDate,
    pub mode: EnrollmentMode,
    pub rating: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub id: i64,
    pub enrollment_id: i64,
}

/// Filters behind the course admin list (search over name and description).
#[derive(Clone, Debug, Default)]
pub struct CourseQuery {
    pub search: Option<String>,
    pub pub_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default)]
pub struct QuestionQuery {
    pub search: Option<String>,
    pub lesson_id: Option<i64>,
    pub grade: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct ChoiceQuery {
    pub search: Option<String>,
    pub is_correct: Option<bool>,
}

/// A question joined with the title of its lesson, as the admin list shows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuestionListRow {
    pub question: Question,
    pub lesson_title: String,
}

/// A choice joined with the text of its question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChoiceListRow {
    pub choice: Choice,
    pub question_text: String,
}

pub trait StorageRead {
    fn load_user(&self, id: i64) -> anyhow::Result<Option<User>>;
    fn load_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    fn load_session_user(&self, token: &str) -> anyhow::Result<Option<User>>;
    fn load_learner(&self, user_id: i64) -> anyhow::Result<Option<Learner>>;
    fn load_course(&self, id: i64) -> anyhow::Result<Option<Course>>;
    fn list_courses_by_enrollment(&self, limit: usize) -> anyhow::Result<Vec<Course>>;
    fn list_course_instructors(&self, course_id: i64) -> anyhow::Result<Vec<Instructor>>;
    fn list_lessons(&self, course_id: i64) -> anyhow::Result<Vec<Lesson>>;
    fn list_course_questions(&self, course_id: i64) -> anyhow::Result<Vec<Question>>;
    fn list_course_choices(&self, course_id: i64) -> anyhow::Result<Vec<Choice>>;
    fn count_enrollments(&self, user_id: i64, course_id: i64) -> anyhow::Result<u64>;
    fn load_enrollment(&self, user_id: i64, course_id: i64) -> anyhow::Result<Option<Enrollment>>;
    fn load_submission(&self, id: i64) -> anyhow::Result<Option<Submission>>;
    fn list_submission_choice_ids(&self, submission_id: i64) -> anyhow::Result<Vec<i64>>;
    fn search_courses(&self, query: &CourseQuery) -> anyhow::Result<Vec<Course>>;
    fn search_questions(&self, query: &QuestionQuery) -> anyhow::Result<Vec<QuestionListRow>>;
    fn search_choices(&self, query: &ChoiceQuery) -> anyhow::Result<Vec<ChoiceListRow>>;
}

pub trait StorageWrite {
    fn insert_user(&self, user: &NewUser<'_>) -> anyhow::Result<i64>;
    fn insert_session(&self, token: &str, user_id: i64) -> anyhow::Result<()>;
    fn delete_session(&self, token: &str) -> anyhow::Result<()>;
    fn insert_instructor(
        &self,
        user_id: i64,
        full_time: bool,
        total_learners: i64,
    ) -> anyhow::Result<i64>;
    fn insert_learner(&self, user_id: i64, level: i64, occupation: &str) -> anyhow::Result<i64>;
    fn insert_course(&self, course: &NewCourse<'_>) -> anyhow::Result<i64>;
    fn add_course_instructor(&self, course_id: i64, instructor_id: i64) -> anyhow::Result<()>;
    fn insert_lesson(&self, lesson: &NewLesson<'_>) -> anyhow::Result<i64>;
    fn insert_question(&self, lesson_id: i64, text: &str, grade: u32) -> anyhow::Result<i64>;
    fn insert_choice(&self, question_id: i64, text: &str, is_correct: bool)
        -> anyhow::Result<i64>;
    fn insert_enrollment(
        &self,
        user_id: i64,
        course_id: i64,
        mode: EnrollmentMode,
    ) -> anyhow::Result<i64>;
    fn increment_total_enrollment(&self, course_id: i64) -> anyhow::Result<()>;
    fn insert_submission(&self, enrollment_id: i64) -> anyhow::Result<i64>;
    fn add_submission_choices(&self, submission_id: i64, choice_ids: &[i64])
        -> anyhow::Result<()>;
}

pub trait StorageTx: StorageRead + StorageWrite {
    fn commit(self) -> anyhow::Result<()>;
}

pub trait Storage: StorageRead {
    type Tx: StorageTx;

    fn begin_tx(&self) -> anyhow::Result<Self::Tx>;
}
