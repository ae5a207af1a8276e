//! Owner directory backed by the `owners` table.
//!
//! Credentials are managed elsewhere; this table only records which
//! identities the store has seen.

use crate::model::owner::OwnerId;
use crate::repo::schema::ensure_table_ready;
use crate::repo::RepoResult;
use rusqlite::{params, Connection, OptionalExtension};

const OWNER_COLUMNS: &[&str] = &["name", "created_at"];

/// Persisted identity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRecord {
    pub owner: OwnerId,
    pub created_at: i64,
}

/// Repository interface for known owners.
pub trait OwnerRepository {
    /// Inserts `owner` when absent. Returns `true` when a row was created.
    fn ensure_owner(&self, owner: &OwnerId, now: i64) -> RepoResult<bool>;
    fn find_owner(&self, owner: &OwnerId) -> RepoResult<Option<OwnerRecord>>;
    /// Lists owners sorted by name.
    fn list_owners(&self) -> RepoResult<Vec<OwnerRecord>>;
}

/// SQLite-backed owner directory.
pub struct SqliteOwnerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOwnerRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "owners", OWNER_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl OwnerRepository for SqliteOwnerRepository<'_> {
    fn ensure_owner(&self, owner: &OwnerId, now: i64) -> RepoResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO owners (name, created_at) VALUES (?1, ?2);",
            params![owner.as_str(), now],
        )?;
        Ok(inserted == 1)
    }

    fn find_owner(&self, owner: &OwnerId) -> RepoResult<Option<OwnerRecord>> {
        let created_at = self
            .conn
            .query_row(
                "SELECT created_at FROM owners WHERE name = ?1;",
                [owner.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        Ok(created_at.map(|created_at| OwnerRecord {
            owner: owner.clone(),
            created_at,
        }))
    }

    fn list_owners(&self) -> RepoResult<Vec<OwnerRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, created_at FROM owners ORDER BY name ASC;")?;
        let mut rows = stmt.query([])?;
        let mut owners = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get("name")?;
            owners.push(OwnerRecord {
                owner: OwnerId::parse(&name)?,
                created_at: row.get("created_at")?,
            });
        }
        Ok(owners)
    }
}
