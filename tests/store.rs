//! Store behaviour against real SQLite databases.

use between::{
    database::*, rank_lists, rank_tasks, ListId, ListKind, PersistenceError, SqliteGateway, Task,
    TaskId, TodoList,
};
use chrono::{NaiveDate, NaiveDateTime};

fn setup_test_db() -> SqliteGateway {
    let gateway = SqliteGateway::open_in_memory().expect("Failed to open test DB");
    init_db(&gateway).expect("Failed to init test DB");
    gateway
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn list_at(name: &str, created_at: NaiveDateTime) -> TodoList {
    let mut list = TodoList::new(name, ListKind::Simple);
    list.created_at = created_at;
    list
}

fn task_at(list_id: ListId, text: &str, created_at: NaiveDateTime) -> Task {
    let mut task = Task::new(list_id, text);
    task.created_at = created_at;
    task
}

#[test]
fn test_list_roundtrip() {
    let db = setup_test_db();
    let mut list = list_at("Budget", at(1, 9));
    list.kind = ListKind::Financial;

    let id = add_list(&db, &list).unwrap();
    let stored = fetch_list(&db, id).unwrap().expect("list exists");

    assert_eq!(stored.id, Some(id));
    assert_eq!(stored.name, "Budget");
    assert_eq!(stored.kind, ListKind::Financial);
    assert!(!stored.pinned);
    assert_eq!(stored.created_at, at(1, 9));
}

#[test]
fn test_duplicate_list_name_leaves_table_unchanged() {
    let db = setup_test_db();
    add_list(&db, &list_at("Groceries", at(1, 9))).unwrap();
    add_list(&db, &list_at("Work", at(1, 10))).unwrap();
    let before = fetch_lists(&db).unwrap().len();

    let err = add_list(&db, &list_at("Groceries", at(2, 9))).unwrap_err();

    assert!(err.is_duplicate(), "unexpected error: {err}");
    assert_eq!(fetch_lists(&db).unwrap().len(), before);
}

#[test]
fn test_empty_names_are_rejected() {
    let db = setup_test_db();
    let err = add_list(&db, &list_at("", at(1, 9))).unwrap_err();
    assert!(matches!(err, PersistenceError::Constraint(_)), "{err}");

    let list_id = add_list(&db, &list_at("Home", at(1, 9))).unwrap();
    let err = add_task(&db, &task_at(list_id, "", at(1, 10))).unwrap_err();
    assert!(matches!(err, PersistenceError::Constraint(_)), "{err}");
}

#[test]
fn test_task_requires_existing_list() {
    let db = setup_test_db();
    let err = add_task(&db, &task_at(ListId(42), "orphan", at(1, 9))).unwrap_err();
    assert!(matches!(err, PersistenceError::Constraint(_)), "{err}");
}

#[test]
fn test_delete_list_cascades_to_tasks() {
    let db = setup_test_db();
    let doomed = add_list(&db, &list_at("Doomed", at(1, 9))).unwrap();
    let kept = add_list(&db, &list_at("Kept", at(1, 10))).unwrap();
    add_task(&db, &task_at(doomed, "one", at(1, 11))).unwrap();
    add_task(&db, &task_at(doomed, "two", at(1, 12))).unwrap();
    add_task(&db, &task_at(kept, "three", at(1, 13))).unwrap();

    assert!(delete_list(&db, doomed).unwrap());

    assert!(fetch_tasks(&db, doomed).unwrap().is_empty());
    assert_eq!(fetch_tasks(&db, kept).unwrap().len(), 1);
    assert!(fetch_list(&db, doomed).unwrap().is_none());
    assert!(!delete_list(&db, doomed).unwrap());
}

#[test]
fn test_pinning_changes_list_order() {
    let db = setup_test_db();
    let older = add_list(&db, &list_at("B", at(1, 9))).unwrap();
    let newer = add_list(&db, &list_at("A", at(2, 9))).unwrap();

    let names = |lists: Vec<TodoList>| lists.into_iter().map(|l| l.name).collect::<Vec<_>>();
    assert_eq!(names(rank_lists(fetch_lists(&db).unwrap())), ["B", "A"]);

    assert!(set_list_pinned(&db, newer, true).unwrap());
    assert_eq!(names(rank_lists(fetch_lists(&db).unwrap())), ["A", "B"]);

    assert!(set_list_pinned(&db, newer, false).unwrap());
    assert!(set_list_pinned(&db, older, true).unwrap());
    assert_eq!(names(rank_lists(fetch_lists(&db).unwrap())), ["B", "A"]);
}

#[test]
fn test_task_updates_reorder_ranking() {
    let db = setup_test_db();
    let list_id = add_list(&db, &list_at("Chores", at(1, 9))).unwrap();
    let laundry = add_task(&db, &task_at(list_id, "laundry", at(1, 10))).unwrap();
    let dishes = add_task(&db, &task_at(list_id, "dishes", at(1, 11))).unwrap();
    let taxes = add_task(&db, &task_at(list_id, "taxes", at(1, 12))).unwrap();

    let order = |db: &SqliteGateway| {
        rank_tasks(fetch_tasks(db, list_id).unwrap())
            .into_iter()
            .map(|t| t.text)
            .collect::<Vec<_>>()
    };
    assert_eq!(order(&db), ["laundry", "dishes", "taxes"]);

    assert!(update_task_flags(&db, taxes, true, true).unwrap());
    assert!(update_task_flags(&db, dishes, false, true).unwrap());
    assert_eq!(order(&db), ["taxes", "dishes", "laundry"]);

    assert!(update_task_completion(&db, taxes, true).unwrap());
    assert_eq!(order(&db), ["dishes", "laundry", "taxes"]);

    assert!(update_task_text(&db, laundry, "fold laundry").unwrap());
    assert_eq!(order(&db), ["dishes", "fold laundry", "taxes"]);

    assert!(delete_task(&db, dishes).unwrap());
    assert_eq!(order(&db), ["fold laundry", "taxes"]);
}

#[test]
fn test_updates_on_missing_task_report_nothing_changed() {
    let db = setup_test_db();
    let missing = TaskId(999);
    assert!(!update_task_completion(&db, missing, true).unwrap());
    assert!(!update_task_text(&db, missing, "x").unwrap());
    assert!(!update_task_flags(&db, missing, true, false).unwrap());
    assert!(!update_task_deadline(&db, missing, None).unwrap());
    assert!(!delete_task(&db, missing).unwrap());
}

#[test]
fn test_due_tasks_span_lists() {
    let db = setup_test_db();
    let home = add_list(&db, &list_at("Home", at(1, 9))).unwrap();
    let work = add_list(&db, &list_at("Work", at(1, 10))).unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();

    let mut rent = task_at(home, "rent", at(2, 9));
    rent.deadline = NaiveDate::from_ymd_opt(2024, 2, 1);
    let mut report = task_at(work, "report", at(2, 10));
    report.deadline = Some(today);
    report.important = true;
    let mut holiday = task_at(work, "holiday", at(2, 11));
    holiday.deadline = NaiveDate::from_ymd_opt(2024, 8, 1);
    let undated = task_at(home, "someday", at(2, 12));

    add_task(&db, &rent).unwrap();
    add_task(&db, &report).unwrap();
    add_task(&db, &holiday).unwrap();
    add_task(&db, &undated).unwrap();
    let paid = add_task(&db, &{
        let mut t = task_at(home, "paid", at(2, 13));
        t.deadline = NaiveDate::from_ymd_opt(2024, 1, 15);
        t
    })
    .unwrap();
    update_task_completion(&db, paid, true).unwrap();

    let due: Vec<_> = rank_tasks(fetch_due_tasks(&db, today).unwrap())
        .into_iter()
        .map(|t| t.text)
        .collect();
    assert_eq!(due, ["report", "rent"]);
}

#[test]
fn test_deadline_roundtrip_and_clear() {
    let db = setup_test_db();
    let list_id = add_list(&db, &list_at("Trips", at(1, 9))).unwrap();
    let mut task = task_at(list_id, "book flights", at(1, 10));
    task.deadline = NaiveDate::from_ymd_opt(2024, 6, 30);
    let id = add_task(&db, &task).unwrap();

    let stored = &fetch_tasks(&db, list_id).unwrap()[0];
    assert_eq!(stored.id, Some(id));
    assert_eq!(stored.deadline, NaiveDate::from_ymd_opt(2024, 6, 30));

    assert!(update_task_deadline(&db, id, None).unwrap());
    assert_eq!(fetch_tasks(&db, list_id).unwrap()[0].deadline, None);
}

#[test]
fn test_file_database_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("todos.sqlite");

    {
        let db = SqliteGateway::open(&path).unwrap();
        init_db(&db).unwrap();
        let list_id = add_list(&db, &list_at("Persistent", at(1, 9))).unwrap();
        add_task(&db, &task_at(list_id, "survive restart", at(1, 10))).unwrap();
    }

    let db = SqliteGateway::open(&path).unwrap();
    init_db(&db).unwrap();
    let lists = fetch_lists(&db).unwrap();
    assert_eq!(lists.len(), 1);
    let list_id = lists[0].id.unwrap();
    assert_eq!(fetch_tasks(&db, list_id).unwrap()[0].text, "survive restart");

    // Cascade must still hold on a reopened connection.
    delete_list(&db, list_id).unwrap();
    assert!(fetch_tasks(&db, list_id).unwrap().is_empty());
}
