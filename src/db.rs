use crate::config::TimetableConfig;
use crate::overlay::MoveOperation;
use crate::roster::{Membership, Student, StudentStatus};
use crate::schedule::{ScheduleCell, Snapshot, Weekday};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use uuid::Uuid;

pub const DB_FILE: &str = "timetable.sqlite3";
pub const CONFIG_KEY: &str = "timetable.config";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            main_teacher TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            english_name TEXT NOT NULL DEFAULT '',
            school TEXT NOT NULL DEFAULT '',
            grade TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'active',
            updated_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS memberships(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            class_name TEXT NOT NULL,
            start_date TEXT,
            end_date TEXT,
            withdrawal_date TEXT,
            on_hold INTEGER NOT NULL DEFAULT 0,
            emphasis INTEGER NOT NULL DEFAULT 0,
            attendance_days TEXT NOT NULL DEFAULT '[]',
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_memberships_student ON memberships(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_memberships_class ON memberships(class_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schedule_cells(
            slot_key TEXT PRIMARY KEY,
            cell_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    ensure_classes_main_teacher(&conn)?;

    tracing::debug!(path = %db_path.display(), "workspace database opened");
    Ok(conn)
}

fn ensure_classes_main_teacher(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "classes", "main_teacher")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE classes ADD COLUMN main_teacher TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value_json FROM settings WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

/// Saved config, or the defaults when nothing has been saved yet.
pub fn load_config(conn: &Connection) -> anyhow::Result<TimetableConfig> {
    match settings_get_json(conn, CONFIG_KEY)? {
        Some(v) => Ok(serde_json::from_value(v)?),
        None => Ok(TimetableConfig::default()),
    }
}

pub fn save_config(conn: &Connection, config: &TimetableConfig) -> anyhow::Result<()> {
    settings_set_json(conn, CONFIG_KEY, &serde_json::to_value(config)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    pub main_teacher: Option<String>,
}

pub fn list_classes(conn: &Connection) -> anyhow::Result<Vec<ClassRecord>> {
    let mut stmt = conn.prepare("SELECT id, name, main_teacher FROM classes ORDER BY name")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(ClassRecord {
                id: r.get(0)?,
                name: r.get(1)?,
                main_teacher: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Inserts or updates a class by id. A `None` teacher keeps the stored one.
pub fn upsert_class(conn: &Connection, id: &str, name: &str, main_teacher: Option<&str>) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO classes(id, name, main_teacher) VALUES(?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            main_teacher = COALESCE(excluded.main_teacher, classes.main_teacher)",
        (id, name, main_teacher),
    )?;
    Ok(())
}

/// Class id → primary teacher, for classes that have one.
pub fn primary_teachers(conn: &Connection) -> anyhow::Result<HashMap<String, String>> {
    let mut stmt =
        conn.prepare("SELECT id, main_teacher FROM classes WHERE main_teacher IS NOT NULL")?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(rows)
}

/// A class registry row supplied alongside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassUpsert {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub main_teacher: Option<String>,
}

/// Replaces the stored snapshot wholesale and syncs the class registry, all in
/// one transaction.
///
/// Every class id the snapshot names takes the name the snapshot gives it. A
/// stale row still holding one of those names under another id is dropped.
/// `classes` are upserted last; any failure leaves the workspace untouched.
pub fn replace_snapshot(conn: &Connection, snapshot: &Snapshot, classes: &[ClassUpsert]) -> anyhow::Result<usize> {
    let mut registered: BTreeMap<&str, &str> = BTreeMap::new();
    let mut claimed: HashMap<&str, &str> = HashMap::new();
    for cell in snapshot.values() {
        let primary = cell.class_id.as_deref().zip(cell.class_name.as_deref());
        let stubs = cell
            .merged
            .iter()
            .filter_map(|m| m.class_id.as_deref().map(|id| (id, m.class_name.as_str())));
        for (id, name) in primary.into_iter().chain(stubs) {
            let name = name.trim();
            if id.trim().is_empty() || name.is_empty() || registered.contains_key(id) {
                continue;
            }
            if let Some(owner) = claimed.get(name) {
                tracing::warn!(class_id = %id, owner = %owner, name = %name, "class name claimed by two ids");
                continue;
            }
            claimed.insert(name, id);
            registered.insert(id, name);
        }
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM schedule_cells", [])?;
    {
        let mut insert =
            tx.prepare("INSERT INTO schedule_cells(slot_key, cell_json) VALUES(?, ?)")?;
        for (key, cell) in snapshot {
            insert.execute((key, serde_json::to_string(cell)?))?;
        }

        // Park the names first so swapped names never trip the UNIQUE index.
        let mut park = tx.prepare("UPDATE classes SET name = char(1) || id WHERE id = ?")?;
        let mut evict = tx.prepare("DELETE FROM classes WHERE name = ? AND id <> ?")?;
        let mut register = tx.prepare(
            "INSERT INTO classes(id, name) VALUES(?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )?;
        for id in registered.keys() {
            park.execute([id])?;
        }
        for (id, name) in &registered {
            let evicted = evict.execute((name, id))?;
            if evicted > 0 {
                tracing::info!(class_id = %id, name = %name, "dropped stale class row");
            }
            register.execute((id, name))?;
        }
    }
    for class in classes {
        upsert_class(&tx, &class.id, &class.name, class.main_teacher.as_deref())?;
    }
    tx.commit()?;
    tracing::info!(
        cells = snapshot.len(),
        classes = registered.len() + classes.len(),
        "schedule snapshot replaced"
    );
    Ok(snapshot.len())
}

pub fn load_snapshot(conn: &Connection) -> anyhow::Result<Snapshot> {
    let mut stmt = conn.prepare("SELECT slot_key, cell_json FROM schedule_cells")?;
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    let mut out = Snapshot::new();
    for (key, raw) in rows {
        match serde_json::from_str::<ScheduleCell>(&raw) {
            Ok(cell) => {
                out.insert(key, cell);
            }
            Err(e) => tracing::warn!(slot_key = %key, error = %e, "skipping unreadable cell"),
        }
    }
    Ok(out)
}

fn status_str(s: StudentStatus) -> &'static str {
    match s {
        StudentStatus::Active => "active",
        StudentStatus::Inactive => "inactive",
        StudentStatus::Withdrawn => "withdrawn",
    }
}

fn parse_status(s: &str) -> StudentStatus {
    match s {
        "inactive" => StudentStatus::Inactive,
        "withdrawn" => StudentStatus::Withdrawn,
        _ => StudentStatus::Active,
    }
}

pub fn upsert_student(conn: &Connection, student: &Student) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO students(id, name, english_name, school, grade, status, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            english_name = excluded.english_name,
            school = excluded.school,
            grade = excluded.grade,
            status = excluded.status,
            updated_at = excluded.updated_at",
        (
            &student.id,
            &student.name,
            &student.english_name,
            &student.school,
            &student.grade,
            status_str(student.status),
            chrono::Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(())
}

pub fn list_students(conn: &Connection) -> anyhow::Result<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, english_name, school, grade, status FROM students ORDER BY name, id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(Student {
                id: r.get(0)?,
                name: r.get(1)?,
                english_name: r.get(2)?,
                school: r.get(3)?,
                grade: r.get(4)?,
                status: parse_status(&r.get::<_, String>(5)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn student_exists(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM students WHERE id = ?", [id], |r| r.get::<_, i64>(0))
        .optional()?
        .is_some())
}

/// Stores a membership. An empty id gets a fresh one; the id used is returned.
pub fn add_membership(conn: &Connection, membership: &Membership) -> anyhow::Result<String> {
    let id = if membership.id.trim().is_empty() {
        Uuid::new_v4().to_string()
    } else {
        membership.id.clone()
    };
    conn.execute(
        "INSERT INTO memberships(
            id, student_id, class_name, start_date, end_date, withdrawal_date,
            on_hold, emphasis, attendance_days)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &membership.student_id,
            &membership.class_name,
            &membership.start_date,
            &membership.end_date,
            &membership.withdrawal_date,
            membership.on_hold as i64,
            membership.emphasis as i64,
            serde_json::to_string(&membership.attendance_days)?,
        ),
    )?;
    Ok(id)
}

pub fn list_memberships(conn: &Connection) -> anyhow::Result<Vec<Membership>> {
    let mut stmt = conn.prepare(
        "SELECT id, student_id, class_name, start_date, end_date, withdrawal_date,
                on_hold, emphasis, attendance_days
         FROM memberships
         ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                Membership {
                    id: r.get(0)?,
                    student_id: r.get(1)?,
                    class_name: r.get(2)?,
                    start_date: r.get(3)?,
                    end_date: r.get(4)?,
                    withdrawal_date: r.get(5)?,
                    on_hold: r.get::<_, i64>(6)? != 0,
                    emphasis: r.get::<_, i64>(7)? != 0,
                    attendance_days: Vec::new(),
                },
                r.get::<_, String>(8)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(rows.len());
    for (mut m, days) in rows {
        match serde_json::from_str::<Vec<Weekday>>(&days) {
            Ok(parsed) => m.attendance_days = parsed,
            Err(e) => tracing::warn!(
                membership_id = %m.id,
                raw = %days,
                error = %e,
                "unreadable attendance days"
            ),
        }
        out.push(m);
    }
    Ok(out)
}

/// Closes the source membership and opens the destination one in a single transaction.
pub fn apply_move(conn: &Connection, op: &MoveOperation) -> anyhow::Result<String> {
    let tx = conn.unchecked_transaction()?;
    let closed = tx.execute(
        "UPDATE memberships SET end_date = ?
         WHERE student_id = ? AND class_name = ?
           AND end_date IS NULL AND withdrawal_date IS NULL",
        (
            &op.closed.end_date,
            &op.closed.student_id,
            &op.closed.class_name,
        ),
    )?;
    if closed == 0 {
        let _ = tx.rollback();
        anyhow::bail!(
            "no active membership for student {} in {}",
            op.closed.student_id,
            op.closed.class_name
        );
    }
    let id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO memberships(
            id, student_id, class_name, start_date, on_hold, emphasis, attendance_days)
         VALUES(?, ?, ?, ?, 0, ?, ?)",
        (
            &id,
            &op.opened.student_id,
            &op.opened.class_name,
            &op.opened.start_date,
            op.opened.emphasis as i64,
            serde_json::to_string(&op.opened.attendance_days)?,
        ),
    )?;
    tx.commit()?;
    tracing::info!(
        student_id = %op.student_id,
        from = %op.closed.class_name,
        to = %op.opened.class_name,
        "student moved"
    );
    Ok(id)
}

#[derive(Debug, thiserror::Error)]
pub enum RenameError {
    #[error("a class named {0} already exists")]
    Collision(String),
    #[error("nothing to update for class {0}")]
    NothingToUpdate(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOutcome {
    pub old_name: String,
    pub new_name: String,
    pub affected: usize,
    pub classes: usize,
    pub memberships: usize,
    pub cells: usize,
    pub custom_groups: usize,
}

fn name_in_use(conn: &Connection, name: &str) -> Result<bool, RenameError> {
    let in_classes = conn
        .query_row("SELECT 1 FROM classes WHERE name = ?", [name], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some();
    if in_classes {
        return Ok(true);
    }
    let snapshot = load_snapshot(conn)?;
    Ok(snapshot.values().any(|c| {
        c.class_name.as_deref() == Some(name) || c.merged.iter().any(|s| s.class_name == name)
    }))
}

/// Renames a class everywhere it is referenced, all or nothing.
///
/// Ended memberships keep the old name so history stays readable.
pub fn rename_class(conn: &Connection, old: &str, new: &str) -> Result<RenameOutcome, RenameError> {
    if name_in_use(conn, new)? {
        return Err(RenameError::Collision(new.to_string()));
    }

    let tx = conn.unchecked_transaction()?;
    let mut outcome = RenameOutcome {
        old_name: old.to_string(),
        new_name: new.to_string(),
        ..Default::default()
    };

    outcome.classes = tx.execute("UPDATE classes SET name = ? WHERE name = ?", (new, old))?;
    outcome.memberships = tx.execute(
        "UPDATE memberships SET class_name = ?
         WHERE class_name = ? AND end_date IS NULL AND withdrawal_date IS NULL",
        (new, old),
    )?;

    let cells = {
        let mut stmt = tx.prepare("SELECT slot_key, cell_json FROM schedule_cells")?;
        let rows = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    for (key, raw) in cells {
        let Ok(mut cell) = serde_json::from_str::<ScheduleCell>(&raw) else {
            continue;
        };
        if cell.rename_class(old, new) == 0 {
            continue;
        }
        tx.execute(
            "UPDATE schedule_cells SET cell_json = ? WHERE slot_key = ?",
            (serde_json::to_string(&cell)?, &key),
        )?;
        outcome.cells += 1;
    }

    // Older configs reference group members by name rather than id.
    let mut config = load_config(&tx)?;
    for group in &mut config.custom_groups {
        let mut touched = false;
        for id in &mut group.class_ids {
            if id == old {
                *id = new.to_string();
                touched = true;
            }
        }
        if touched {
            outcome.custom_groups += 1;
        }
    }
    if outcome.custom_groups > 0 {
        save_config(&tx, &config)?;
    }

    outcome.affected =
        outcome.classes + outcome.memberships + outcome.cells + outcome.custom_groups;
    if outcome.affected == 0 {
        let _ = tx.rollback();
        return Err(RenameError::NothingToUpdate(old.to_string()));
    }
    tx.commit()?;
    tracing::info!(
        old = %old,
        new = %new,
        affected = outcome.affected,
        "class renamed"
    );
    Ok(outcome)
}
