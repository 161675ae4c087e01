//! Video generation for course modules.
//!
//! [`VideoOrchestrator`] turns a module plus its course context into a
//! [`ModuleUpdate`]. Backend failures never reach the caller: they are
//! replaced by a placeholder video flagged with `is_fallback`.

mod backend;
mod pacing;

pub use backend::{BackendStatus, GenerationError, HttpVideoBackend, VideoBackend, VideoRequest};
pub use pacing::{Pacer, TokioPacer};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::models::{Course, Module, ModuleUpdate};
use crate::store::CourseStore;
use crate::topic::extract_topic;

pub const FALLBACK_VIDEO_URL: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";

/// Response fields that may carry the generated file, in priority order.
pub const RESPONSE_PATH_FIELDS: [&str; 4] = ["file_path", "video_url", "url", "filename"];

const FILENAME: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone)]
pub struct VideoConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub inter_request_delay: Duration,
    pub fallback_video_url: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            timeout: Duration::from_secs(120),
            inter_request_delay: Duration::from_secs(2),
            fallback_video_url: FALLBACK_VIDEO_URL.into(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVideo {
    pub video_url: String,
    pub filename: String,
    pub used_topic: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ModuleOutcome {
    pub index: usize,
    pub title: String,
    pub used_topic: String,
    pub is_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub course_id: Uuid,
    pub outcomes: Vec<ModuleOutcome>,
    pub skipped: Vec<usize>,
}

impl BatchReport {
    pub fn has_persist_errors(&self) -> bool {
        self.outcomes.iter().any(|o| o.persist_error.is_some())
    }
}

/// First non-empty string among [`RESPONSE_PATH_FIELDS`].
pub fn extract_video_path(body: &Value) -> Option<&str> {
    RESPONSE_PATH_FIELDS
        .iter()
        .filter_map(|field| body.get(*field).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Last path segment, accepting both `/` and `\` separators.
pub fn file_name(raw_path: &str) -> &str {
    raw_path
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(raw_path)
}

/// Public URL of an uploaded asset on the video backend.
pub fn asset_url(base_url: &str, filename: &str) -> String {
    format!(
        "{}/uploads/{}",
        base_url.trim_end_matches('/'),
        utf8_percent_encode(filename, FILENAME)
    )
}

pub struct VideoOrchestrator {
    config: VideoConfig,
    backend: Arc<dyn VideoBackend>,
    pacer: Arc<dyn Pacer>,
}

impl VideoOrchestrator {
    pub fn new(config: VideoConfig, backend: Arc<dyn VideoBackend>, pacer: Arc<dyn Pacer>) -> Self {
        Self {
            config,
            backend,
            pacer,
        }
    }

    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    pub async fn probe(&self) -> BackendStatus {
        self.backend.probe().await
    }

    /// Single generation attempt without fallback.
    pub async fn request_video(
        &self,
        course_title: &str,
        course_description: &str,
    ) -> Result<GeneratedVideo, GenerationError> {
        self.request(extract_topic(course_title), course_title, course_description)
            .await
    }

    async fn request(
        &self,
        topic: &str,
        course_title: &str,
        course_description: &str,
    ) -> Result<GeneratedVideo, GenerationError> {
        let req = VideoRequest {
            topic: topic.to_string(),
            course_title: course_title.to_string(),
            course_description: course_description.to_string(),
        };
        let body = self.backend.generate(&req).await?;

        let raw = extract_video_path(&body).ok_or_else(|| {
            GenerationError::MalformedResponse("backend did not return a valid video path".into())
        })?;
        let normalized = raw.replace('\\', "/");
        let filename = file_name(&normalized);
        if filename.is_empty() {
            return Err(GenerationError::MalformedResponse(format!(
                "no file name in {raw:?}"
            )));
        }

        Ok(GeneratedVideo {
            video_url: asset_url(&self.config.base_url, filename),
            filename: filename.to_string(),
            used_topic: topic.to_string(),
        })
    }

    /// Never fails: any backend error yields the placeholder video.
    pub async fn generate_for_module(
        &self,
        module: &Module,
        course_title: &str,
        course_description: &str,
    ) -> ModuleUpdate {
        let topic = extract_topic(course_title);
        tracing::info!(module = %module.title, course = %course_title, topic, "generating module video");

        match self.request(topic, course_title, course_description).await {
            Ok(video) => {
                tracing::info!(module = %module.title, url = %video.video_url, "module video generated");
                ModuleUpdate {
                    video_url: video.video_url,
                    filename: video.filename,
                    is_fallback: false,
                    used_topic: video.used_topic,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(module = %module.title, topic, error = %e, "video generation failed, using fallback");
                self.fallback(topic, &e)
            }
        }
    }

    fn fallback(&self, topic: &str, error: &GenerationError) -> ModuleUpdate {
        ModuleUpdate {
            video_url: self.config.fallback_video_url.clone(),
            filename: format!("fallback-video-{topic}.mp4"),
            is_fallback: true,
            used_topic: topic.to_string(),
            error: Some(error.to_string()),
        }
    }

    /// Generates every module that has no video yet, one at a time in list
    /// order, persisting the module list after each one and pausing for
    /// `inter_request_delay` before the next.
    pub async fn generate_all(&self, store: &dyn CourseStore, course: &mut Course) -> BatchReport {
        let (pending, skipped): (Vec<usize>, Vec<usize>) =
            (0..course.modules.len()).partition(|&i| !course.modules[i].video_generated);
        let mut queue = VecDeque::from(pending);

        tracing::info!(course_id = %course.id, pending = queue.len(), skipped = skipped.len(), "starting batch video generation");

        let mut outcomes = Vec::with_capacity(queue.len());
        while let Some(index) = queue.pop_front() {
            let update = self
                .generate_for_module(&course.modules[index], &course.title, &course.description)
                .await;
            course.modules[index].apply(&update);

            let persist_error = match store.update_modules(course.id, &course.modules).await {
                Ok(()) => None,
                Err(e) => {
                    tracing::error!(course_id = %course.id, index, error = %e, "failed to persist modules");
                    Some(e.to_string())
                }
            };

            outcomes.push(ModuleOutcome {
                index,
                title: course.modules[index].title.clone(),
                used_topic: update.used_topic,
                is_fallback: update.is_fallback,
                persist_error,
            });

            self.pacer.pause(self.config.inter_request_delay).await;
        }

        BatchReport {
            course_id: course.id,
            outcomes,
            skipped,
        }
    }
}
