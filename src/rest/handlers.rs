use axum::{
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};

use crate::{
    admin::{self, Model},
    auth::{self, Principal, Registration, Session},
    courses::{self, EnrollOutcome},
    storage::{
        traits::{ChoiceQuery, CourseQuery, QuestionQuery},
        Storage,
    },
    types::OnlineCourseError,
};

use super::{
    models::{
        AdminChoicesResponse, AdminCoursesResponse, AdminQuestionsResponse, ChoiceAdminParams,
        CourseAdminParams, CourseListResponse, ErrorResponse, HealthResponse, LoginForm,
        ModelsResponse, PageResponse, QuestionAdminParams, RegistrationForm,
    },
    session::{expired_session_cookie, session_cookie, SessionToken},
    AppState,
};

pub fn error_response(err: OnlineCourseError) -> Response {
    let status = match &err {
        OnlineCourseError::CourseNotFound(_) | OnlineCourseError::SubmissionNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        OnlineCourseError::InvalidChoice(_) | OnlineCourseError::InvalidMode(_) => {
            StatusCode::BAD_REQUEST
        }
        OnlineCourseError::UserExists
        | OnlineCourseError::MissingUsername
        | OnlineCourseError::InvalidCredentials => StatusCode::BAD_REQUEST,
        OnlineCourseError::Forbidden => StatusCode::FORBIDDEN,
        OnlineCourseError::EnrollmentNotFound { .. } | OnlineCourseError::StorageError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        log::error!("Request failed: {}", err);
    } else {
        log::warn!("Request rejected: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            message: err.to_string(),
        }),
    )
        .into_response()
}

fn page(name: &str, message: Option<String>) -> Response {
    Json(PageResponse {
        page: name.to_string(),
        message,
    })
    .into_response()
}

fn logged_in_redirect(session: &Session) -> Response {
    log::info!("🔑 {} logged in", session.user.username);
    ([(SET_COOKIE, session_cookie(&session.token))], Redirect::to("/")).into_response()
}

pub async fn health<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    let uptime_secs = state.started_at.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            uptime_secs,
        }),
    )
}

pub async fn registration_page() -> Response {
    page("registration", None)
}

pub async fn registration<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    Form(form): Form<RegistrationForm>,
) -> Response {
    let registration = Registration {
        username: &form.username,
        password: &form.psw,
        first_name: &form.firstname,
        last_name: &form.lastname,
    };
    match auth::register(&state.storage, &registration) {
        Ok(session) => logged_in_redirect(&session),
        Err(err @ (OnlineCourseError::UserExists | OnlineCourseError::MissingUsername)) => {
            page("registration", Some(err.to_string()))
        }
        Err(err) => error_response(err),
    }
}

pub async fn login_page() -> Response {
    page("login", None)
}

pub async fn login<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    Form(form): Form<LoginForm>,
) -> Response {
    match auth::login(&state.storage, &form.username, &form.psw) {
        Ok(session) => logged_in_redirect(&session),
        Err(err @ OnlineCourseError::InvalidCredentials) => page("login", Some(err.to_string())),
        Err(err) => error_response(err),
    }
}

pub async fn logout<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    SessionToken(token): SessionToken,
) -> Response {
    if let Err(err) = auth::logout(&state.storage, token.as_deref()) {
        return error_response(err);
    }
    ([(SET_COOKIE, expired_session_cookie())], Redirect::to("/")).into_response()
}

pub async fn index<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    principal: Principal,
) -> Response {
    match courses::list_courses(&state.storage, &principal) {
        Ok(courses) => Json(CourseListResponse {
            username: principal.user().map(|u| u.username.clone()),
            courses,
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn course_detail<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    principal: Principal,
    Path(course_id): Path<i64>,
) -> Response {
    match courses::course_detail(&state.storage, &principal, course_id) {
        Ok(detail) => Json(detail).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn enroll<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    principal: Principal,
    Path(course_id): Path<i64>,
) -> Response {
    match courses::enroll(&state.storage, &principal, course_id) {
        Ok(outcome) => {
            if !principal.is_authenticated() {
                log::debug!("anonymous enroll for course {} ignored", course_id);
            } else if outcome == EnrollOutcome::AlreadyEnrolled {
                log::debug!("user already enrolled in course {}", course_id);
            }
            Redirect::to(&format!("/courses/{}", course_id)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub async fn submit<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    principal: Principal,
    Path(course_id): Path<i64>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let answers = match courses::extract_answers(
        fields.iter().map(|(key, value)| (key.as_str(), value.as_str())),
    ) {
        Ok(answers) => answers,
        Err(err) => return error_response(err),
    };
    match courses::submit(&state.storage, &principal, course_id, &answers) {
        Ok(submission_id) => Redirect::to(&format!(
            "/courses/{}/submissions/{}/result",
            course_id, submission_id
        ))
        .into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn exam_result<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    Path((course_id, submission_id)): Path<(i64, i64)>,
) -> Response {
    match courses::show_exam_result(&state.storage, course_id, submission_id) {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn admin_models(principal: Principal) -> Response {
    if let Err(err) = admin::require_staff(&principal) {
        return error_response(err);
    }
    Json(ModelsResponse {
        models: admin::registry(),
    })
    .into_response()
}

pub async fn admin_model(principal: Principal, Path(model): Path<String>) -> Response {
    if let Err(err) = admin::require_staff(&principal) {
        return error_response(err);
    }
    match model.parse::<Model>().ok().and_then(admin::lookup) {
        Some(entry) => Json(entry).into_response(),
        None => {
            log::warn!("Unregistered admin model {}", model);
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    message: format!("model not registered: {}", model),
                }),
            )
                .into_response()
        }
    }
}

pub async fn admin_courses<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    principal: Principal,
    Query(params): Query<CourseAdminParams>,
) -> Response {
    let query = CourseQuery {
        search: params.q,
        pub_date: params.pub_date,
    };
    match admin::list_courses(&state.storage, &principal, &query) {
        Ok(results) => Json(AdminCoursesResponse { results }).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn admin_questions<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    principal: Principal,
    Query(params): Query<QuestionAdminParams>,
) -> Response {
    let query = QuestionQuery {
        search: params.q,
        lesson_id: params.lesson,
        grade: params.grade,
    };
    match admin::list_questions(&state.storage, &principal, &query) {
        Ok(results) => Json(AdminQuestionsResponse { results }).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn admin_choices<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    principal: Principal,
    Query(params): Query<ChoiceAdminParams>,
) -> Response {
    let query = ChoiceQuery {
        search: params.q,
        is_correct: params.is_correct,
    };
    match admin::list_choices(&state.storage, &principal, &query) {
        Ok(results) => Json(AdminChoicesResponse { results }).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: "endpoint not found".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{
            header::{CONTENT_TYPE, COOKIE, LOCATION},
            Request, StatusCode,
        },
        response::Response,
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::time::SystemTime;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::auth::{self, Registration};
    use crate::courses::test_support::{seed_course, seeded_storage, SeededCourse};
    use crate::rest::{router, AppState};
    use crate::storage::{SqliteStorage, StorageRead};

    struct TestApp {
        _dir: TempDir,
        storage: SqliteStorage,
        router: Router,
    }

    impl TestApp {
        fn new() -> Self {
            let (dir, storage) = seeded_storage();
            let router = router(AppState {
                storage: storage.clone(),
                started_at: SystemTime::now(),
            });
            Self {
                _dir: dir,
                storage,
                router,
            }
        }

        fn login_token(&self, username: &str, is_staff: bool) -> String {
            let registration = Registration {
                username,
                password: "secret",
                first_name: "",
                last_name: "",
            };
            auth::create_user(&self.storage, &registration, is_staff).unwrap();
            auth::login(&self.storage, username, "secret").unwrap().token
        }

        async fn get(&self, uri: &str, token: Option<&str>) -> Response {
            let mut builder = Request::builder().uri(uri).method("GET");
            if let Some(token) = token {
                builder = builder.header(COOKIE, format!("sessionid={}", token));
            }
            self.router
                .clone()
                .oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap()
        }

        async fn post(&self, uri: &str, form: &str, token: Option<&str>) -> Response {
            let mut builder = Request::builder()
                .uri(uri)
                .method("POST")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
            if let Some(token) = token {
                builder = builder.header(COOKIE, format!("sessionid={}", token));
            }
            self.router
                .clone()
                .oneshot(builder.body(Body::from(form.to_string())).unwrap())
                .await
                .unwrap()
        }

        fn seed(&self) -> SeededCourse {
            seed_course(&self.storage, "rust")
        }
    }

    async fn json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers().get(LOCATION).unwrap().to_str().unwrap()
    }

    fn set_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get(axum::http::header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
    }

    fn cookie_token(response: &Response) -> String {
        let cookie = set_cookie(response).unwrap();
        let pair = cookie.split(';').next().unwrap();
        pair.trim_start_matches("sessionid=").to_string()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = TestApp::new();
        let response = app.get("/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_endpoint_is_json_404() {
        let app = TestApp::new();
        let response = app.get("/nope", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["message"], "endpoint not found");
    }

    #[tokio::test]
    async fn registration_logs_in_and_rejects_duplicates() {
        let app = TestApp::new();
        let form = "username=grace&psw=cobol&firstname=Grace&lastname=Hopper";

        let response = app.post("/registration", form, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        let token = cookie_token(&response);

        let index = json(app.get("/", Some(&token)).await).await;
        assert_eq!(index["username"], "grace");

        let response = app.post("/registration", form, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_none());
        let body = json(response).await;
        assert_eq!(body["page"], "registration");
        assert_eq!(body["message"], "User already exists.");
    }

    #[tokio::test]
    async fn registration_without_username_rerenders_the_form() {
        let app = TestApp::new();
        let response = app
            .post("/registration", "username=&psw=pw&firstname=&lastname=", None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_none());
        let body = json(response).await;
        assert_eq!(body["page"], "registration");
        assert_eq!(body["message"], "The given username must be set");
    }

    #[tokio::test]
    async fn login_and_logout_manage_the_session() {
        let app = TestApp::new();
        app.login_token("ada", false);

        let response = app.post("/login", "username=ada&psw=wrong", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_none());
        assert_eq!(
            json(response).await["message"],
            "Invalid username or password."
        );

        let response = app.post("/login", "username=ada&psw=secret", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let token = cookie_token(&response);
        assert_eq!(json(app.get("/", Some(&token)).await).await["username"], "ada");

        let response = app.get("/logout", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(set_cookie(&response).unwrap().contains("Max-Age=0"));
        assert!(json(app.get("/", Some(&token)).await).await["username"].is_null());
    }

    #[tokio::test]
    async fn bearer_token_identifies_the_user() {
        let app = TestApp::new();
        let token = app.login_token("ada", false);
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json(response).await["username"], "ada");
    }

    #[tokio::test]
    async fn enroll_redirects_and_counts_once() {
        let app = TestApp::new();
        let rust = app.seed();
        let uri = format!("/courses/{}/enroll", rust.course_id);

        let response = app.post(&uri, "", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/courses/{}", rust.course_id));
        let course = app.storage.load_course(rust.course_id).unwrap().unwrap();
        assert_eq!(course.total_enrollment, 0);

        let token = app.login_token("ada", false);
        app.post(&uri, "", Some(&token)).await;
        app.post(&uri, "", Some(&token)).await;
        let course = app.storage.load_course(rust.course_id).unwrap().unwrap();
        assert_eq!(course.total_enrollment, 1);

        let detail = json(
            app.get(&format!("/courses/{}", rust.course_id), Some(&token))
                .await,
        )
        .await;
        assert_eq!(detail["is_enrolled"], true);
        assert_eq!(detail["name"], "rust");
        let choice = &detail["lessons"][0]["questions"][0]["choices"][0];
        assert!(choice.get("is_correct").is_none());
        assert_eq!(detail["lessons"][0]["questions"][0]["is_multi_choice"], true);
    }

    #[tokio::test]
    async fn missing_course_is_404() {
        let app = TestApp::new();
        let response = app.get("/courses/42", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = app.post("/courses/42/enroll", "", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn submit_redirects_to_scored_result() {
        let app = TestApp::new();
        let rust = app.seed();
        let token = app.login_token("ada", false);
        app.post(&format!("/courses/{}/enroll", rust.course_id), "", Some(&token))
            .await;

        // q1 and q2 right, q3 left unanswered
        let form = format!(
            "csrfmiddlewaretoken=x&choice_{}={}&choice_{}={}&choice_{}={}",
            rust.correct[0],
            rust.correct[0],
            rust.correct[1],
            rust.correct[1],
            rust.correct[2],
            rust.correct[2]
        );
        let response = app
            .post(
                &format!("/courses/{}/submit", rust.course_id),
                &form,
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let result_uri = location(&response).to_string();
        assert!(result_uri.ends_with("/result"));

        let result = json(app.get(&result_uri, Some(&token)).await).await;
        assert_eq!(result["grade"], 50);
        assert!(result["score"].get("percent").is_none());
        assert_eq!(result["selected_ids"].as_array().unwrap().len(), 3);
        let choice = &result["course"]["lessons"][0]["questions"][0]["choices"][0];
        assert_eq!(choice["is_correct"], true);
    }

    #[tokio::test]
    async fn submit_rejects_bad_input() {
        let app = TestApp::new();
        let rust = app.seed();
        let token = app.login_token("ada", false);
        let uri = format!("/courses/{}/submit", rust.course_id);

        let response = app.post(&uri, "choice_1=1", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        app.post(&format!("/courses/{}/enroll", rust.course_id), "", Some(&token))
            .await;
        let response = app.post(&uri, "choice_1=abc", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .get(&format!("/courses/{}/submissions/999/result", rust.course_id), None)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_requires_staff() {
        let app = TestApp::new();
        let learner = app.login_token("ada", false);

        let response = app.get("/admin/models", None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let response = app.get("/admin/courses", Some(&learner)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_registry_and_lists() {
        let app = TestApp::new();
        let rust = app.seed();
        let staff = app.login_token("root", true);

        let models = json(app.get("/admin/models", Some(&staff)).await).await;
        assert_eq!(models["models"].as_array().unwrap().len(), 6);

        let course = json(app.get("/admin/models/course", Some(&staff)).await).await;
        assert_eq!(course["inlines"][0]["model"], "lesson");
        assert_eq!(course["inlines"][0]["extra"], 5);
        let response = app.get("/admin/models/enrollment", Some(&staff)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let courses = json(app.get("/admin/courses?q=test", Some(&staff)).await).await;
        assert_eq!(courses["results"][0]["id"], rust.course_id);

        let questions = json(
            app.get(
                &format!("/admin/questions?lesson={}&grade=30", rust.lesson_id),
                Some(&staff),
            )
            .await,
        )
        .await;
        let results = questions["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["question_text"], "q3");

        let choices = json(app.get("/admin/choices?is_correct=true", Some(&staff)).await).await;
        assert_eq!(choices["results"].as_array().unwrap().len(), 4);
    }
}
