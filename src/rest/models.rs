use serde::{Deserialize, Serialize};

use crate::admin::{ChoiceRow, CourseRow, ModelAdmin, QuestionRow};
use crate::courses::CourseListing;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Registration and login pages. `message` carries the recoverable error
/// when the form is re-rendered.
#[derive(Serialize, Deserialize)]
pub struct PageResponse {
    pub page: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct CourseListResponse {
    pub username: Option<String>,
    pub courses: Vec<CourseListing>,
}

#[derive(Deserialize)]
pub struct RegistrationForm {
    pub username: String,
    pub psw: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub psw: String,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelAdmin>,
}

#[derive(Serialize)]
pub struct AdminCoursesResponse {
    pub results: Vec<CourseRow>,
}

#[derive(Serialize)]
pub struct AdminQuestionsResponse {
    pub results: Vec<QuestionRow>,
}

#[derive(Serialize)]
pub struct AdminChoicesResponse {
    pub results: Vec<ChoiceRow>,
}

#[derive(Deserialize, Default)]
pub struct CourseAdminParams {
    pub q: Option<String>,
    pub pub_date: Option<chrono::NaiveDate>,
}

#[derive(Deserialize, Default)]
pub struct QuestionAdminParams {
    pub q: Option<String>,
    pub lesson: Option<i64>,
    pub grade: Option<u32>,
}

#[derive(Deserialize, Default)]
pub struct ChoiceAdminParams {
    pub q: Option<String>,
    pub is_correct: Option<bool>,
}
