//! Profile Store — where confirmed imports land.
//!
//! `AppState` holds an `Arc<dyn ProfileStore>`: PostgreSQL when `DATABASE_URL` is set,
//! in-memory otherwise. Sections are stored whole, most recent entry first.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::import::reconcile::{reconcile, ReconcileMode};
use crate::models::entry::{ParsedEntry, SectionType};
use crate::models::profile::ProfileSectionRow;

/// Attempts at a merge that keeps losing the version race to another writer.
const MERGE_ATTEMPTS: u32 = 3;

/// A section as written by `ProfileStore::merge`.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSection {
    pub version: i32,
    pub entries: Vec<ParsedEntry>,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Current entries of a section; empty when nothing has been stored yet.
    async fn load(&self, user_id: Uuid, section: SectionType)
        -> Result<Vec<ParsedEntry>, AppError>;

    async fn count(&self, user_id: Uuid, section: SectionType) -> Result<usize, AppError> {
        Ok(self.load(user_id, section).await?.len())
    }

    /// Reconciles `imported` with the section as currently stored and writes the result.
    ///
    /// Read and write happen as one step: merges into the same section are serialized and
    /// each one sees the previous one's result.
    async fn merge(
        &self,
        user_id: Uuid,
        section: SectionType,
        mode: ReconcileMode,
        imported: Vec<ParsedEntry>,
    ) -> Result<SavedSection, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

/// Append-only: every save INSERTs a new version row, the highest version wins.
pub struct PgProfileStore {
    pool: PgPool,
}

const LATEST_ROW: &str = r#"
    SELECT * FROM profile_sections
    WHERE user_id = $1 AND section = $2
    ORDER BY version DESC
    LIMIT 1
"#;

const LATEST_ROW_FOR_UPDATE: &str = r#"
    SELECT * FROM profile_sections
    WHERE user_id = $1 AND section = $2
    ORDER BY version DESC
    LIMIT 1
    FOR UPDATE
"#;

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One merge attempt inside a transaction. The latest row stays locked until commit;
    /// two first-ever writes can still race, which the version UNIQUE constraint catches.
    async fn try_merge(
        &self,
        user_id: Uuid,
        section: SectionType,
        mode: ReconcileMode,
        imported: Vec<ParsedEntry>,
    ) -> Result<SavedSection, AppError> {
        let mut tx = self.pool.begin().await?;

        let latest = sqlx::query_as::<_, ProfileSectionRow>(LATEST_ROW_FOR_UPDATE)
            .bind(user_id)
            .bind(section.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let (current_version, existing) = match latest {
            Some(row) => (row.version, decode_entries(section, row)?),
            None => (0, Vec::new()),
        };

        let entries = reconcile(mode, imported, existing);
        let version = current_version + 1;
        insert_version(&mut *tx, user_id, section, version, &entries).await?;
        tx.commit().await?;

        info!(
            "Stored {} {} entries for user {} as version {}",
            entries.len(),
            section,
            user_id,
            version
        );
        Ok(SavedSection { version, entries })
    }
}

fn decode_entries(
    section: SectionType,
    row: ProfileSectionRow,
) -> Result<Vec<ParsedEntry>, AppError> {
    let entries = serde_json::from_value(row.entries)
        .with_context(|| format!("Stored {section} section v{} is corrupt", row.version))?;
    Ok(entries)
}

async fn insert_version(
    conn: &mut PgConnection,
    user_id: Uuid,
    section: SectionType,
    version: i32,
    entries: &[ParsedEntry],
) -> Result<(), AppError> {
    let data = serde_json::to_value(entries).context("Failed to serialize profile entries")?;
    let entry_count = i32::try_from(entries.len()).context("Section has too many entries")?;

    sqlx::query(
        r#"
        INSERT INTO profile_sections (id, user_id, section, version, entries, entry_count)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(section.as_str())
    .bind(version)
    .bind(data)
    .bind(entry_count)
    .execute(conn)
    .await?;
    Ok(())
}

fn is_version_conflict(err: &AppError) -> bool {
    match err {
        AppError::Database(e) => e
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation()),
        _ => false,
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn load(
        &self,
        user_id: Uuid,
        section: SectionType,
    ) -> Result<Vec<ParsedEntry>, AppError> {
        let latest = sqlx::query_as::<_, ProfileSectionRow>(LATEST_ROW)
            .bind(user_id)
            .bind(section.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match latest {
            Some(row) => decode_entries(section, row),
            None => Ok(Vec::new()),
        }
    }

    async fn count(&self, user_id: Uuid, section: SectionType) -> Result<usize, AppError> {
        let count: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT entry_count FROM profile_sections
            WHERE user_id = $1 AND section = $2
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(section.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(usize::try_from(count.unwrap_or(0)).unwrap_or(0))
    }

    async fn merge(
        &self,
        user_id: Uuid,
        section: SectionType,
        mode: ReconcileMode,
        imported: Vec<ParsedEntry>,
    ) -> Result<SavedSection, AppError> {
        let mut attempt = 1;
        loop {
            match self.try_merge(user_id, section, mode, imported.clone()).await {
                Err(e) if attempt < MERGE_ATTEMPTS && is_version_conflict(&e) => {
                    warn!("Version conflict on {section} for {user_id}, retry {attempt}");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryProfileStore {
    sections: RwLock<HashMap<(Uuid, SectionType), (i32, Vec<ParsedEntry>)>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn load(
        &self,
        user_id: Uuid,
        section: SectionType,
    ) -> Result<Vec<ParsedEntry>, AppError> {
        Ok(self
            .sections
            .read()
            .await
            .get(&(user_id, section))
            .map(|(_, entries)| entries.clone())
            .unwrap_or_default())
    }

    async fn merge(
        &self,
        user_id: Uuid,
        section: SectionType,
        mode: ReconcileMode,
        imported: Vec<ParsedEntry>,
    ) -> Result<SavedSection, AppError> {
        let mut sections = self.sections.write().await;
        let slot = sections.entry((user_id, section)).or_default();
        let existing = std::mem::take(&mut slot.1);
        slot.0 += 1;
        slot.1 = reconcile(mode, imported, existing);
        Ok(SavedSection {
            version: slot.0,
            entries: slot.1.clone(),
        })
    }
}
