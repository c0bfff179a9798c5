use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const CURRENT_SCHEMA_VERSION: i64 = 1;
pub const NEXT_HANDLE_KEY: &str = "next_handle";

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    name: "baseline_alarm_schema_v1",
    sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS alarms (
    handle INTEGER PRIMARY KEY,
    token TEXT NOT NULL,
    registration TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_alarms_registration ON alarms(registration);
"#,
}];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;
    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES (?1, '1')
ON CONFLICT(key) DO NOTHING
"#,
        params![NEXT_HANDLE_KEY],
    )?;

    tx.commit()
}

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRow {
    pub handle: i64,
    pub token: String,
    pub registration: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct UpsertAlarm<'a> {
    pub handle: i64,
    pub token: &'a str,
    pub registration: &'a str,
    pub updated_at: &'a str,
}

pub fn upsert_alarm(conn: &Connection, args: &UpsertAlarm<'_>) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO alarms (handle, token, registration, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?4)
ON CONFLICT(handle) DO UPDATE SET
    token = excluded.token,
    registration = excluded.registration,
    updated_at = excluded.updated_at
"#,
        params![args.handle, args.token, args.registration, args.updated_at],
    )?;
    Ok(())
}

pub fn get_alarm(conn: &Connection, handle: i64) -> Result<Option<AlarmRow>> {
    conn.query_row(
        r#"
SELECT handle, token, registration, created_at, updated_at
FROM alarms
WHERE handle = ?1
"#,
        params![handle],
        |row| {
            Ok(AlarmRow {
                handle: row.get(0)?,
                token: row.get(1)?,
                registration: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn list_alarms(conn: &Connection) -> Result<Vec<AlarmRow>> {
    let mut stmt = conn.prepare(
        r#"
SELECT handle, token, registration, created_at, updated_at
FROM alarms
ORDER BY handle ASC
"#,
    )?;

    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(AlarmRow {
            handle: row.get(0)?,
            token: row.get(1)?,
            registration: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        });
    }

    Ok(result)
}

pub fn delete_alarm(conn: &Connection, handle: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM alarms WHERE handle = ?1", params![handle])?;
    Ok(changed > 0)
}

pub fn set_alarm_registration(
    conn: &Connection,
    handle: i64,
    registration: &str,
    updated_at: &str,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE alarms SET registration = ?2, updated_at = ?3 WHERE handle = ?1",
        params![handle, registration, updated_at],
    )?;
    Ok(changed > 0)
}

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO meta (key, value)
VALUES (?1, ?2)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![key, value],
    )?;
    Ok(())
}
