use std::{net::SocketAddr, time::Instant};

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tracing::Instrument;

use crate::storage::Storage;

mod handlers;
mod models;
mod session;

use handlers::{
    admin_choices, admin_courses, admin_model, admin_models, admin_questions, course_detail,
    enroll, exam_result, health, index, login, login_page, logout, not_found, registration,
    registration_page, submit,
};

#[derive(Clone)]
pub struct AppState<S: Storage> {
    pub storage: S,
    pub started_at: std::time::SystemTime,
}

pub fn router<S: Storage + Clone + Send + Sync + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health::<S>))
        .route(
            "/registration",
            get(registration_page).post(registration::<S>),
        )
        .route("/login", get(login_page).post(login::<S>))
        .route("/logout", get(logout::<S>))
        .route("/", get(index::<S>))
        .route("/courses/:course_id", get(course_detail::<S>))
        .route("/courses/:course_id/enroll", post(enroll::<S>))
        .route("/courses/:course_id/submit", post(submit::<S>))
        .route(
            "/courses/:course_id/submissions/:submission_id/result",
            get(exam_result::<S>),
        )
        .route("/admin/models", get(admin_models))
        .route("/admin/models/:model", get(admin_model))
        .route("/admin/courses", get(admin_courses::<S>))
        .route("/admin/questions", get(admin_questions::<S>))
        .route("/admin/choices", get(admin_choices::<S>))
        .fallback(not_found)
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}

async fn trace_request(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "http",
        method = %request.method(),
        path = %request.uri().path()
    );
    let started = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        log::debug!("{} in {:?}", response.status(), started.elapsed());
    });
    response
}

pub async fn serve<S: Storage + Clone + Send + Sync + 'static>(
    addr: SocketAddr,
    storage: S,
    shutdown: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()> {
    log::info!("🌐 HTTP service on http://{}", addr);

    let app = router(AppState {
        storage,
        started_at: std::time::SystemTime::now(),
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            log::info!("🛑 HTTP shutdown requested");
        })
        .await?;
    log::info!("👋 HTTP server exited");
    Ok(())
}
