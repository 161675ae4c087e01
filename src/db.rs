use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, Pool, Postgres};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Course, CourseStatus, Difficulty, Module, Tutor, DEFAULT_CATEGORY};
use crate::store::{CourseChange, CourseStore, CHANGE_CAPACITY};

pub type Db = Pool<Postgres>;

pub async fn connect(url: &str) -> anyhow::Result<Db> {
    Ok(Pool::<Postgres>::connect(url).await?)
}

const COURSE_SELECT: &str = r#"
    SELECT c.id, c.title, c.description, c.category, c.difficulty, c.tutor_id,
           u.display_name AS tutor_name, c.created_at, c.enrolled_count, c.rating,
           c.modules, c.status, c.creation_step, c.updated_at
    FROM courses c
    LEFT JOIN users u ON u.id = c.tutor_id
"#;

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: Uuid,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    difficulty: Option<String>,
    tutor_id: Option<String>,
    tutor_name: Option<String>,
    created_at: Option<DateTime<Utc>>,
    enrolled_count: Option<i32>,
    rating: Option<f64>,
    modules: Option<Json<Vec<Module>>>,
    status: Option<String>,
    creation_step: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<CourseRow> for Course {
    fn from(r: CourseRow) -> Self {
        Course {
            id: r.id,
            title: r.title.unwrap_or_default(),
            description: r.description.unwrap_or_default(),
            category: r
                .category
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.into()),
            difficulty: r.difficulty.map(Difficulty::from).unwrap_or_default(),
            tutor_id: r.tutor_id.filter(|t| !t.is_empty()),
            tutor_name: r.tutor_name,
            created_at: r.created_at,
            enrolled_count: r.enrolled_count.unwrap_or(0).max(0) as u32,
            rating: r.rating.unwrap_or(0.0),
            modules: r.modules.map(|m| m.0).unwrap_or_default(),
            status: r.status.as_deref().map(CourseStatus::parse).unwrap_or_default(),
            creation_step: r.creation_step,
            updated_at: r.updated_at,
        }
    }
}

pub struct PgStore {
    db: Db,
    changes: broadcast::Sender<CourseChange>,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self { db, changes }
    }

    fn announce(&self, change: CourseChange) {
        // no subscribers is fine
        let _ = self.changes.send(change);
    }
}

#[async_trait]
impl CourseStore for PgStore {
    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        let row: Option<CourseRow> = sqlx::query_as(&format!("{COURSE_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Course::from))
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
        let rows: Vec<CourseRow> =
            sqlx::query_as(&format!("{COURSE_SELECT} ORDER BY c.created_at DESC NULLS LAST"))
                .fetch_all(&self.db)
                .await?;
        Ok(rows.into_iter().map(Course::from).collect())
    }

    async fn get_tutor(&self, id: &str) -> Result<Option<Tutor>, StoreError> {
        let tutor = sqlx::query_as::<_, Tutor>(
            "SELECT id, display_name, email, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(tutor)
    }

    async fn update_modules(&self, id: Uuid, modules: &[Module]) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE courses SET modules = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(Json(modules.to_vec()))
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("course {id}")));
        }
        tracing::debug!(course_id = %id, modules = modules.len(), "modules saved");
        self.announce(CourseChange::ModulesUpdated(id));
        Ok(())
    }

    async fn publish(&self, id: Uuid, modules: &[Module]) -> Result<(), StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE courses
            SET modules = $2, creation_step = 'completed', status = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(modules.to_vec()))
        .bind(CourseStatus::Published.as_str())
        .execute(&self.db)
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("course {id}")));
        }
        tracing::info!(course_id = %id, "course published");
        self.announce(CourseChange::Published(id));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<CourseChange> {
        self.changes.subscribe()
    }
}
