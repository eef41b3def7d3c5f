mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::*;

const MEETING_COLUMNS: &str = "id, title, transcript_id, summary, functional_doc, mockups, markdown,
     project_plan, generated_project_plan, generated_backlog, generated_files, version,
     created_at, updated_at";

/// Outcome of saving a generation result with an expected version.
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    Saved(Meeting),
    NotFound,
    /// The meeting changed since it was read; nothing was written.
    Conflict { current_version: i64 },
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "meeting-intel")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("meetings.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Meeting operations
    // ============================================================

    /// All meetings, newest first.
    pub fn get_all_meetings(&self) -> Result<Vec<Meeting>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM meetings ORDER BY created_at DESC, title",
            MEETING_COLUMNS
        ))?;

        let meetings = stmt
            .query_map([], meeting_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(meetings)
    }

    pub fn get_meeting(&self, id: Uuid) -> Result<Option<Meeting>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        Ok(meeting_by_id(&conn, id)?)
    }

    pub fn get_meeting_by_transcript(&self, transcript_id: &str) -> Result<Option<Meeting>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let meeting = conn
            .query_row(
                &format!(
                    "SELECT {} FROM meetings WHERE transcript_id = ?",
                    MEETING_COLUMNS
                ),
                [transcript_id],
                meeting_from_row,
            )
            .optional()?;
        Ok(meeting)
    }

    pub fn create_meeting(&self, input: CreateMeetingInput) -> Result<Meeting> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO meetings (id, title, transcript_id, summary, functional_doc, mockups,
                 markdown, project_plan, generated_files, version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, '[]', 1, ?, ?)",
            rusqlite::params![
                id.to_string(),
                &input.title,
                &input.transcript_id,
                &input.summary,
                &input.functional_doc,
                &input.mockups,
                &input.markdown,
                &input.project_plan,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        Ok(Meeting {
            id,
            title: input.title,
            transcript_id: input.transcript_id,
            summary: input.summary,
            functional_doc: input.functional_doc,
            mockups: input.mockups,
            markdown: input.markdown,
            project_plan: input.project_plan,
            generated_project_plan: None,
            generated_backlog: None,
            generated_files: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply the fields set in `input`. Read and write happen under one lock.
    pub fn update_meeting(&self, id: Uuid, input: UpdateMeetingInput) -> Result<Option<Meeting>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let Some(existing) = meeting_by_id(&conn, id)? else {
            return Ok(None);
        };

        conn.execute(
            "UPDATE meetings SET title = ?, summary = ?, functional_doc = ?, mockups = ?,
                 markdown = ?, project_plan = ?, version = version + 1, updated_at = ?
             WHERE id = ?",
            rusqlite::params![
                input.title.unwrap_or(existing.title),
                input.summary.unwrap_or(existing.summary),
                input.functional_doc.unwrap_or(existing.functional_doc),
                input.mockups.unwrap_or(existing.mockups),
                input.markdown.unwrap_or(existing.markdown),
                input.project_plan.unwrap_or(existing.project_plan),
                Utc::now().to_rfc3339(),
                id.to_string(),
            ],
        )?;

        Ok(meeting_by_id(&conn, id)?)
    }

    pub fn delete_meeting(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM meetings WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Generation results
    // ============================================================

    pub fn save_project_plan(
        &self,
        id: Uuid,
        expected_version: i64,
        plan: &str,
    ) -> Result<SaveOutcome> {
        self.save_if_version(id, expected_version, "generated_project_plan", plan)
    }

    pub fn save_backlog(
        &self,
        id: Uuid,
        expected_version: i64,
        backlog: &str,
    ) -> Result<SaveOutcome> {
        self.save_if_version(id, expected_version, "generated_backlog", backlog)
    }

    pub fn save_files(
        &self,
        id: Uuid,
        expected_version: i64,
        files: &[FileResult],
    ) -> Result<SaveOutcome> {
        let json = serde_json::to_string(files)?;
        self.save_if_version(id, expected_version, "generated_files", &json)
    }

    /// Replace the content of one stored file, looked up by name without
    /// regard to case. The stored name is kept as-is.
    ///
    /// Returns `None` if either the meeting or the file does not exist.
    pub fn update_file(&self, id: Uuid, name: &str, content: &str) -> Result<Option<Meeting>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let Some(mut meeting) = meeting_by_id(&conn, id)? else {
            return Ok(None);
        };
        let Some(file) = meeting.generated_files.iter_mut().find(|f| f.is_named(name)) else {
            return Ok(None);
        };
        file.content = content.to_string();

        conn.execute(
            "UPDATE meetings SET generated_files = ?, version = version + 1, updated_at = ?
             WHERE id = ?",
            (
                serde_json::to_string(&meeting.generated_files)?,
                Utc::now().to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(meeting_by_id(&conn, id)?)
    }

    /// Write `value` into `column` only if the stored version still equals
    /// `expected_version`. `column` is always one of the fixed names above.
    fn save_if_version(
        &self,
        id: Uuid,
        expected_version: i64,
        column: &'static str,
        value: &str,
    ) -> Result<SaveOutcome> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            &format!(
                "UPDATE meetings SET {} = ?, version = version + 1, updated_at = ?
                 WHERE id = ? AND version = ?",
                column
            ),
            (
                value,
                Utc::now().to_rfc3339(),
                id.to_string(),
                expected_version,
            ),
        )?;

        match meeting_by_id(&conn, id)? {
            None => Ok(SaveOutcome::NotFound),
            Some(meeting) if rows > 0 => Ok(SaveOutcome::Saved(meeting)),
            Some(meeting) => Ok(SaveOutcome::Conflict {
                current_version: meeting.version,
            }),
        }
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn meeting_by_id(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Meeting>> {
    conn.query_row(
        &format!("SELECT {} FROM meetings WHERE id = ?", MEETING_COLUMNS),
        [id.to_string()],
        meeting_from_row,
    )
    .optional()
}

fn meeting_from_row(row: &Row<'_>) -> rusqlite::Result<Meeting> {
    let files_json: String = row.get(10)?;
    let generated_files: Vec<FileResult> = serde_json::from_str(&files_json).unwrap_or_default();

    Ok(Meeting {
        id: parse_uuid(row.get::<_, String>(0)?),
        title: row.get(1)?,
        transcript_id: row.get(2)?,
        summary: row.get(3)?,
        functional_doc: row.get(4)?,
        mockups: row.get(5)?,
        markdown: row.get(6)?,
        project_plan: row.get(7)?,
        generated_project_plan: row.get(8)?,
        generated_backlog: row.get(9)?,
        generated_files,
        version: row.get(11)?,
        created_at: parse_datetime(row.get::<_, String>(12)?),
        updated_at: parse_datetime(row.get::<_, String>(13)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
