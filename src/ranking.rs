//! Display ordering for lists and tasks.
//!
//! Everything here is pure: inputs are consumed, a freshly ordered `Vec` is
//! returned, and all sorts are stable so ties keep their incoming order.

use std::cmp::Reverse;

use chrono::NaiveDate;

use crate::model::{Task, TodoList};

/// Priority score from the important/urgent flags, 4 (both) down to 1 (neither).
pub fn task_priority(task: &Task) -> u8 {
    match (task.important, task.urgent) {
        (true, true) => 4,
        (true, false) => 3,
        (false, true) => 2,
        (false, false) => 1,
    }
}

/// Pinned lists first, then oldest first.
pub fn rank_lists<I>(lists: I) -> Vec<TodoList>
where
    I: IntoIterator<Item = TodoList>,
{
    let mut lists: Vec<TodoList> = lists.into_iter().collect();
    lists.sort_by_key(|list| (!list.pinned, list.created_at));
    lists
}

/// Open tasks before completed ones, then by descending priority, then oldest first.
pub fn rank_tasks<I>(tasks: I) -> Vec<Task>
where
    I: IntoIterator<Item = Task>,
{
    let mut tasks: Vec<Task> = tasks.into_iter().collect();
    tasks.sort_by_key(|task| (task.completed, Reverse(task_priority(task)), task.created_at));
    tasks
}

/// Open tasks with a deadline on or before `date`, ranked.
pub fn due_on_or_before<I>(tasks: I, date: NaiveDate) -> Vec<Task>
where
    I: IntoIterator<Item = Task>,
{
    rank_tasks(
        tasks
            .into_iter()
            .filter(|task| !task.completed && task.deadline.is_some_and(|due| due <= date)),
    )
}
