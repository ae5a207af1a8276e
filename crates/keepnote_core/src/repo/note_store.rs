//! Note record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide find/insert/update/remove primitives over the `notes` table.
//! - Offer the atomic conditional update used by optimistic concurrency.
//!
//! # Invariants
//! - `insert` is the only place ids are assigned.
//! - Updates never rewrite `owner`.
//! - Filters are field-equality predicates; an empty filter matches every row.

use crate::model::note::{NewNote, Note, NoteId};
use crate::model::owner::OwnerId;
use crate::repo::schema::ensure_table_ready;
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    text,
    status,
    updated,
    owner,
    version
FROM notes";

const NOTE_COLUMNS: &[&str] = &["id", "text", "status", "updated", "owner", "version"];

/// Equality filter over note fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub id: Option<NoteId>,
    pub owner: Option<OwnerId>,
}

impl NoteFilter {
    pub fn by_id(id: NoteId) -> Self {
        Self {
            id: Some(id),
            owner: None,
        }
    }

    pub fn by_owner(owner: &OwnerId) -> Self {
        Self {
            id: None,
            owner: Some(owner.clone()),
        }
    }

    /// Matches `id` only when it belongs to `owner`.
    pub fn owned(id: NoteId, owner: &OwnerId) -> Self {
        Self {
            id: Some(id),
            owner: Some(owner.clone()),
        }
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut sql = String::from(" WHERE 1 = 1");
        let mut bind_values = Vec::new();
        if let Some(id) = self.id {
            sql.push_str(" AND id = ?");
            bind_values.push(Value::Text(id.to_string()));
        }
        if let Some(owner) = self.owner.as_ref() {
            sql.push_str(" AND owner = ?");
            bind_values.push(Value::Text(owner.as_str().to_string()));
        }
        (sql, bind_values)
    }
}

/// Typed persistence primitive for notes.
///
/// Implementations perform no ownership or version checks.
pub trait NoteStore {
    /// Returns every note matching `filter`, newest first.
    fn find(&self, filter: &NoteFilter) -> RepoResult<Vec<Note>>;
    /// Returns the first note matching `filter`.
    fn find_one(&self, filter: &NoteFilter) -> RepoResult<Option<Note>>;
    /// Persists a new note and returns it with its assigned id.
    fn insert(&self, note: &NewNote) -> RepoResult<Note>;
    /// Overwrites text/status/updated/version of `id`; returns matched rows (0 or 1).
    fn update(&self, id: NoteId, note: &Note) -> RepoResult<usize>;
    /// Like `update`, but matches only while the persisted version is
    /// `<= max_version`. Check and write happen in one statement.
    fn update_if_version_at_most(
        &self,
        id: NoteId,
        note: &Note,
        max_version: i64,
    ) -> RepoResult<usize>;
    /// Deletes every note matching `filter`; returns removed rows.
    fn remove(&self, filter: &NoteFilter) -> RepoResult<usize>;
}

/// SQLite-backed note store.
pub struct SqliteNoteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteStore<'conn> {
    /// Constructs a store from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "notes", NOTE_COLUMNS)?;
        Ok(Self { conn })
    }

    fn write(&self, sql: &str, id: NoteId, note: &Note, guard: Option<i64>) -> RepoResult<usize> {
        note.validate()?;
        let changed = match guard {
            Some(max_version) => self.conn.execute(
                sql,
                params![
                    note.text.as_str(),
                    note.status.as_str(),
                    note.updated,
                    note.version,
                    id.to_string(),
                    max_version,
                ],
            )?,
            None => self.conn.execute(
                sql,
                params![
                    note.text.as_str(),
                    note.status.as_str(),
                    note.updated,
                    note.version,
                    id.to_string(),
                ],
            )?,
        };
        Ok(changed)
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn find(&self, filter: &NoteFilter) -> RepoResult<Vec<Note>> {
        let (where_sql, bind_values) = filter.where_clause();
        let sql = format!("{NOTE_SELECT_SQL}{where_sql} ORDER BY updated DESC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn find_one(&self, filter: &NoteFilter) -> RepoResult<Option<Note>> {
        let (where_sql, bind_values) = filter.where_clause();
        let sql = format!("{NOTE_SELECT_SQL}{where_sql} ORDER BY updated DESC, id ASC LIMIT 1;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn insert(&self, note: &NewNote) -> RepoResult<Note> {
        note.validate()?;
        let id = Uuid::new_v4();

        self.conn.execute(
            "INSERT INTO notes (
                id,
                text,
                status,
                updated,
                owner,
                version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                note.text.as_str(),
                note.status.as_str(),
                note.updated,
                note.owner.as_str(),
                note.version,
            ],
        )?;

        Ok(note.clone().into_note(id))
    }

    fn update(&self, id: NoteId, note: &Note) -> RepoResult<usize> {
        self.write(
            "UPDATE notes
             SET
                text = ?1,
                status = ?2,
                updated = ?3,
                version = ?4
             WHERE id = ?5;",
            id,
            note,
            None,
        )
    }

    fn update_if_version_at_most(
        &self,
        id: NoteId,
        note: &Note,
        max_version: i64,
    ) -> RepoResult<usize> {
        self.write(
            "UPDATE notes
             SET
                text = ?1,
                status = ?2,
                updated = ?3,
                version = ?4
             WHERE id = ?5
               AND version <= ?6;",
            id,
            note,
            Some(max_version),
        )
    }

    fn remove(&self, filter: &NoteFilter) -> RepoResult<usize> {
        let (where_sql, bind_values) = filter.where_clause();
        let removed = self.conn.execute(
            &format!("DELETE FROM notes{where_sql};"),
            params_from_iter(bind_values),
        )?;
        Ok(removed)
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in notes.id"))
    })?;

    let owner_text: String = row.get("owner")?;
    let owner = OwnerId::parse(&owner_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid owner `{owner_text}` in notes.owner: {err}"))
    })?;

    let note = Note {
        id,
        text: row.get("text")?,
        status: row.get("status")?,
        updated: row.get("updated")?,
        owner,
        version: row.get("version")?,
    };
    note.validate()?;
    Ok(note)
}
