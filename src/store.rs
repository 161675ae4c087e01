//! Course document store.
//!
//! The catalog and the video pipeline only talk to storage through
//! [`CourseStore`]. Every write is announced on a broadcast channel so
//! readers can keep a live view of the catalog.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Course, Module, Tutor};

pub const CHANGE_CAPACITY: usize = 64;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", content = "course_id", rename_all = "snake_case")]
pub enum CourseChange {
    ModulesUpdated(Uuid),
    Published(Uuid),
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, StoreError>;

    /// All courses, newest first, with tutor display names filled in.
    async fn list_courses(&self) -> Result<Vec<Course>, StoreError>;

    async fn get_tutor(&self, id: &str) -> Result<Option<Tutor>, StoreError>;

    async fn update_modules(&self, id: Uuid, modules: &[Module]) -> Result<(), StoreError>;

    /// Writes the final module list and marks the course published.
    async fn publish(&self, id: Uuid, modules: &[Module]) -> Result<(), StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<CourseChange>;
}

#[cfg(test)]
pub use memory::MemoryStore;
