use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::*,
    query::{self, Facets},
    store::CourseStore,
    video::{BackendStatus, BatchReport, GeneratedVideo, VideoOrchestrator},
};

type Generating = Arc<Mutex<HashSet<(Uuid, usize)>>>;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn CourseStore>,
    videos: Arc<VideoOrchestrator>,
    // modules with a request in flight through this process
    generating: Generating,
}

impl AppState {
    pub fn new(store: Arc<dyn CourseStore>, videos: VideoOrchestrator) -> Self {
        Self {
            store,
            videos: Arc::new(videos),
            generating: Arc::default(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // catalog
        .route("/api/courses", get(list_courses))
        .route("/api/courses/stream", get(stream_courses))
        .route("/api/courses/:course_id", get(get_course))
        .route("/api/tutors/:tutor_id", get(get_tutor))
        // video generation
        .route("/api/courses/:course_id/modules/:index/video", post(generate_module_video))
        .route("/api/courses/:course_id/videos", post(generate_all_videos))
        .route("/api/courses/:course_id/publish", post(publish_course))
        .route("/api/video-backend/status", get(video_backend_status))
        .route("/api/video-backend/test", post(test_video_backend))
        .with_state(state)
}

#[derive(Serialize, Debug)]
pub struct CatalogPage {
    pub courses: Vec<Course>,
    pub total: usize,
    pub filtered: usize,
    pub facets: Facets,
}

async fn catalog_page(
    store: &dyn CourseStore,
    filters: &FilterConfig,
) -> Result<CatalogPage, StoreError> {
    let all = store.list_courses().await?;
    let courses = query::apply(&all, filters);
    Ok(CatalogPage {
        total: all.len(),
        filtered: courses.len(),
        facets: query::derive_facets(&all),
        courses,
    })
}

async fn list_courses(
    State(state): State<AppState>,
    Query(filters): Query<FilterConfig>,
) -> Result<Json<CatalogPage>, (StatusCode, String)> {
    let page = catalog_page(state.store.as_ref(), &filters).await.map_err(e500)?;
    Ok(Json(page))
}

async fn stream_courses(
    State(state): State<AppState>,
    Query(filters): Query<FilterConfig>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let store = state.store.clone();
    let mut changes = store.subscribe();
    tracing::info!(?filters, "catalog subscriber connected");

    let stream = async_stream::stream! {
        loop {
            match catalog_page(store.as_ref(), &filters).await {
                Ok(page) => match Event::default().event("catalog").json_data(&page) {
                    Ok(ev) => yield Ok(ev),
                    Err(e) => tracing::warn!(error = %e, "failed to encode catalog event"),
                },
                Err(e) => {
                    tracing::error!(error = %e, "failed to load catalog");
                    yield Ok(Event::default().event("error").data(e.to_string()));
                }
            }

            match changes.recv().await {
                Ok(change) => tracing::debug!(?change, "catalog changed"),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "catalog subscriber lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

async fn load_course(state: &AppState, course_id: Uuid) -> Result<Course, (StatusCode, String)> {
    state
        .store
        .get_course(course_id)
        .await
        .map_err(e500)?
        .ok_or_else(|| e404("course not found"))
}

async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Course>, (StatusCode, String)> {
    Ok(Json(load_course(&state, course_id).await?))
}

async fn get_tutor(
    State(state): State<AppState>,
    Path(tutor_id): Path<String>,
) -> Result<Json<Tutor>, (StatusCode, String)> {
    let tutor = state
        .store
        .get_tutor(&tutor_id)
        .await
        .map_err(e500)?
        .ok_or_else(|| e404("tutor not found"))?;
    Ok(Json(tutor))
}

/// Marks a module as generating until dropped.
struct GeneratingGuard {
    set: Generating,
    key: (Uuid, usize),
}

impl GeneratingGuard {
    fn acquire(set: &Generating, key: (Uuid, usize)) -> Option<Self> {
        let mut in_flight = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(key) {
            return None;
        }
        Some(Self {
            set: set.clone(),
            key,
        })
    }
}

impl Drop for GeneratingGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[derive(Serialize, Debug)]
struct ModuleVideoResponse {
    module: Module,
    update: ModuleUpdate,
}

async fn generate_module_video(
    State(state): State<AppState>,
    Path((course_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<ModuleVideoResponse>, (StatusCode, String)> {
    let mut course = load_course(&state, course_id).await?;
    let module = course.modules.get(index).ok_or_else(|| e404("module not found"))?;
    if module.video_generated {
        return Err(e409("module already has a video"));
    }
    let _guard = GeneratingGuard::acquire(&state.generating, (course_id, index))
        .ok_or_else(|| e409("video generation already in progress for this module"))?;

    let update = state
        .videos
        .generate_for_module(module, &course.title, &course.description)
        .await;
    course.modules[index].apply(&update);

    state
        .store
        .update_modules(course_id, &course.modules)
        .await
        .map_err(e500)?;

    Ok(Json(ModuleVideoResponse {
        module: course.modules[index].clone(),
        update,
    }))
}

async fn generate_all_videos(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<(StatusCode, Json<BatchReport>), (StatusCode, String)> {
    let mut course = load_course(&state, course_id).await?;
    let report = state.videos.generate_all(state.store.as_ref(), &mut course).await;

    let status = if report.has_persist_errors() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    Ok((status, Json(report)))
}

async fn publish_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let course = load_course(&state, course_id).await?;
    state
        .store
        .publish(course_id, &course.modules)
        .await
        .map_err(e500)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Serialize, Debug)]
struct VideoBackendStatus {
    base_url: String,
    #[serde(flatten)]
    status: BackendStatus,
}

async fn video_backend_status(State(state): State<AppState>) -> Json<VideoBackendStatus> {
    Json(VideoBackendStatus {
        base_url: state.videos.config().base_url.clone(),
        status: state.videos.probe().await,
    })
}

#[derive(Deserialize, Debug)]
struct TestGenerationReq {
    course_title: String,
    #[serde(default)]
    course_description: String,
}

// One real generation round-trip, with no fallback, for diagnosing the backend.
async fn test_video_backend(
    State(state): State<AppState>,
    Json(req): Json<TestGenerationReq>,
) -> Result<Json<GeneratedVideo>, (StatusCode, String)> {
    let video = state
        .videos
        .request_video(&req.course_title, &req.course_description)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "video backend test failed");
            (StatusCode::BAD_GATEWAY, e.to_string())
        })?;
    Ok(Json(video))
}

// --- helpers ---
fn e404<T: Into<String>>(msg: T) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, msg.into())
}

fn e409<T: Into<String>>(msg: T) -> (StatusCode, String) {
    (StatusCode::CONFLICT, msg.into())
}

fn e500<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    tracing::error!(error=%e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
