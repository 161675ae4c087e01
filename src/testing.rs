// Shared fixtures for unit tests.

use async_trait::async_trait;
use axum::Router;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use crate::models::{Course, Module};
use crate::video::{BackendStatus, GenerationError, Pacer, VideoBackend, VideoRequest};

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn course_with_modules(title: &str, modules: &[&str]) -> Course {
    let mut course = Course::new(title);
    course.modules = modules.iter().map(|m| Module::new(*m)).collect();
    course
}

/// Ordered record of calls made to the fakes below.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<&'static str>>>);

impl EventLog {
    fn push(&self, event: &'static str) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

pub struct FakeBackend {
    log: EventLog,
    responses: Mutex<VecDeque<Result<Value, GenerationError>>>,
    requests: Mutex<Vec<VideoRequest>>,
    running: bool,
}

impl FakeBackend {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            running: true,
        }
    }

    pub fn offline(log: EventLog) -> Self {
        Self {
            running: false,
            ..Self::new(log)
        }
    }

    pub fn push(&self, response: Result<Value, GenerationError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_ok(&self, body: Value) {
        self.push(Ok(body));
    }

    pub fn requests(&self) -> Vec<VideoRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoBackend for FakeBackend {
    async fn generate(&self, req: &VideoRequest) -> Result<Value, GenerationError> {
        self.log.push("generate");
        self.requests.lock().unwrap().push(req.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Network("no scripted response".into())))
    }

    async fn probe(&self) -> BackendStatus {
        if self.running {
            BackendStatus {
                is_running: true,
                status: Some(200),
                error: None,
            }
        } else {
            BackendStatus {
                is_running: false,
                status: None,
                error: Some("connection refused".into()),
            }
        }
    }
}

pub struct RecordingPacer {
    log: EventLog,
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPacer {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            pauses: Mutex::new(Vec::new()),
        }
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, delay: Duration) {
        self.log.push("pause");
        self.pauses.lock().unwrap().push(delay);
    }
}
