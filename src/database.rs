use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::error::{PersistenceError, SqlResult};
use crate::gateway::{Gateway, Row};
use crate::model::{ListId, Task, TaskId, TodoList};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA_LISTS: &str = "CREATE TABLE IF NOT EXISTS lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE CHECK (name <> ''),
    kind TEXT NOT NULL,
    pinned INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
)";
const SCHEMA_TASKS: &str = "CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    list_id INTEGER NOT NULL,
    text TEXT NOT NULL CHECK (text <> ''),
    completed INTEGER NOT NULL DEFAULT 0,
    important INTEGER NOT NULL DEFAULT 0,
    urgent INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    deadline TEXT,
    FOREIGN KEY (list_id) REFERENCES lists (id) ON DELETE CASCADE
)";
const INDEX_TASKS_LIST: &str = "CREATE INDEX IF NOT EXISTS tasks_list_id ON tasks (list_id)";

const LIST_COLUMNS: &str = "id, name, kind, pinned, created_at";
const TASK_COLUMNS: &str = "id, list_id, text, completed, important, urgent, created_at, deadline";

pub fn init_db(gateway: &impl Gateway) -> SqlResult<()> {
    gateway.execute(SCHEMA_LISTS, &[])?;
    gateway.execute(SCHEMA_TASKS, &[])?;
    gateway.execute(INDEX_TASKS_LIST, &[])?;
    Ok(())
}

pub fn add_list(gateway: &impl Gateway, list: &TodoList) -> SqlResult<ListId> {
    let rows = gateway.query(
        "INSERT INTO lists (name, kind, pinned, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING id",
        &[
            list.name.as_str().into(),
            list.kind.as_str().into(),
            list.pinned.into(),
            format_timestamp(list.created_at).into(),
        ],
    )?;
    let id = ListId(returned_id(&rows)?);
    info!(list_id = %id, name = %list.name, "list created");
    Ok(id)
}

pub fn fetch_lists(gateway: &impl Gateway) -> SqlResult<Vec<TodoList>> {
    gateway
        .query(&format!("SELECT {LIST_COLUMNS} FROM lists"), &[])?
        .iter()
        .map(list_from_row)
        .collect()
}

pub fn fetch_list(gateway: &impl Gateway, list_id: ListId) -> SqlResult<Option<TodoList>> {
    gateway
        .query(
            &format!("SELECT {LIST_COLUMNS} FROM lists WHERE id = ?1"),
            &[list_id.0.into()],
        )?
        .first()
        .map(list_from_row)
        .transpose()
}

pub fn set_list_pinned(gateway: &impl Gateway, list_id: ListId, pinned: bool) -> SqlResult<bool> {
    let changed = gateway.execute(
        "UPDATE lists SET pinned = ?2 WHERE id = ?1",
        &[list_id.0.into(), pinned.into()],
    )?;
    Ok(changed > 0)
}

/// Removes the list; its tasks go with it through the foreign key.
pub fn delete_list(gateway: &impl Gateway, list_id: ListId) -> SqlResult<bool> {
    let removed = gateway.execute("DELETE FROM lists WHERE id = ?1", &[list_id.0.into()])?;
    if removed > 0 {
        info!(list_id = %list_id, "list deleted");
    }
    Ok(removed > 0)
}

pub fn add_task(gateway: &impl Gateway, task: &Task) -> SqlResult<TaskId> {
    let rows = gateway.query(
        "INSERT INTO tasks (list_id, text, completed, important, urgent, created_at, deadline)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING id",
        &[
            task.list_id.0.into(),
            task.text.as_str().into(),
            task.completed.into(),
            task.important.into(),
            task.urgent.into(),
            format_timestamp(task.created_at).into(),
            task.deadline.map(format_date).into(),
        ],
    )?;
    let id = TaskId(returned_id(&rows)?);
    info!(task_id = %id, list_id = %task.list_id, "task created");
    Ok(id)
}

pub fn fetch_tasks(gateway: &impl Gateway, list_id: ListId) -> SqlResult<Vec<Task>> {
    gateway
        .query(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE list_id = ?1"),
            &[list_id.0.into()],
        )?
        .iter()
        .map(task_from_row)
        .collect()
}

/// Incomplete tasks from every list whose deadline is on or before `date`.
pub fn fetch_due_tasks(gateway: &impl Gateway, date: NaiveDate) -> SqlResult<Vec<Task>> {
    gateway
        .query(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                WHERE completed = 0 AND deadline IS NOT NULL AND deadline <= ?1"
            ),
            &[format_date(date).into()],
        )?
        .iter()
        .map(task_from_row)
        .collect()
}

pub fn update_task_completion(
    gateway: &impl Gateway,
    task_id: TaskId,
    completed: bool,
) -> SqlResult<bool> {
    let changed = gateway.execute(
        "UPDATE tasks SET completed = ?2 WHERE id = ?1",
        &[task_id.0.into(), completed.into()],
    )?;
    Ok(changed > 0)
}

pub fn update_task_text(gateway: &impl Gateway, task_id: TaskId, text: &str) -> SqlResult<bool> {
    let changed = gateway.execute(
        "UPDATE tasks SET text = ?2 WHERE id = ?1",
        &[task_id.0.into(), text.into()],
    )?;
    Ok(changed > 0)
}

pub fn update_task_flags(
    gateway: &impl Gateway,
    task_id: TaskId,
    important: bool,
    urgent: bool,
) -> SqlResult<bool> {
    let changed = gateway.execute(
        "UPDATE tasks SET important = ?2, urgent = ?3 WHERE id = ?1",
        &[task_id.0.into(), important.into(), urgent.into()],
    )?;
    Ok(changed > 0)
}

pub fn update_task_deadline(
    gateway: &impl Gateway,
    task_id: TaskId,
    deadline: Option<NaiveDate>,
) -> SqlResult<bool> {
    let changed = gateway.execute(
        "UPDATE tasks SET deadline = ?2 WHERE id = ?1",
        &[task_id.0.into(), deadline.map(format_date).into()],
    )?;
    Ok(changed > 0)
}

pub fn delete_task(gateway: &impl Gateway, task_id: TaskId) -> SqlResult<bool> {
    let removed = gateway.execute("DELETE FROM tasks WHERE id = ?1", &[task_id.0.into()])?;
    if removed > 0 {
        info!(task_id = %task_id, "task deleted");
    }
    Ok(removed > 0)
}

fn returned_id(rows: &[Row]) -> SqlResult<i64> {
    rows.first()
        .ok_or_else(|| PersistenceError::Malformed("insert returned no id".to_string()))?
        .get_i64("id")
}

fn list_from_row(row: &Row) -> SqlResult<TodoList> {
    let kind = row.get_text("kind")?;
    Ok(TodoList {
        id: Some(ListId(row.get_i64("id")?)),
        name: row.get_text("name")?.to_string(),
        kind: kind
            .parse()
            .map_err(|e| PersistenceError::Malformed(format!("{e}")))?,
        pinned: row.get_bool("pinned")?,
        created_at: parse_timestamp(row.get_text("created_at")?)?,
    })
}

fn task_from_row(row: &Row) -> SqlResult<Task> {
    Ok(Task {
        id: Some(TaskId(row.get_i64("id")?)),
        list_id: ListId(row.get_i64("list_id")?),
        text: row.get_text("text")?.to_string(),
        important: row.get_bool("important")?,
        urgent: row.get_bool("urgent")?,
        completed: row.get_bool("completed")?,
        created_at: parse_timestamp(row.get_text("created_at")?)?,
        deadline: row.get_opt_text("deadline")?.map(parse_date).transpose()?,
    })
}

fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> SqlResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map_err(|e| PersistenceError::Malformed(format!("timestamp '{s}': {e}")))
}

fn parse_date(s: &str) -> SqlResult<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| PersistenceError::Malformed(format!("date '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SqliteGateway;
    use crate::model::ListKind;

    #[test]
    fn timestamps_survive_storage_exactly() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_micro_opt(7, 8, 9, 123_456)
            .unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(at)).unwrap(), at);

        let whole = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().and_hms_opt(7, 8, 9).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(whole)).unwrap(), whole);
    }

    #[test]
    fn unknown_kind_in_storage_is_malformed() {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        init_db(&gateway).unwrap();
        gateway
            .execute(
                "INSERT INTO lists (name, kind, pinned, created_at) VALUES ('odd', 'Recipes', 0, '2024-01-01T00:00:00')",
                &[],
            )
            .unwrap();
        let err = fetch_lists(&gateway).unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed(_)));
    }

    #[test]
    fn init_db_is_idempotent() {
        let gateway = SqliteGateway::open_in_memory().unwrap();
        init_db(&gateway).unwrap();
        add_list(&gateway, &TodoList::new("Home", ListKind::Simple)).unwrap();
        init_db(&gateway).unwrap();
        assert_eq!(fetch_lists(&gateway).unwrap().len(), 1);
    }
}
