use std::{fmt, str::FromStr};

use chrono::{Local, NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub i64);

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a list is used for. Chosen at creation and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ListKind {
    #[default]
    Simple,
    Financial,
}

impl ListKind {
    pub const ALL: [ListKind; 2] = [ListKind::Simple, ListKind::Financial];

    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Simple => "Simple",
            ListKind::Financial => "Financial",
        }
    }

    /// The kind after this one, wrapping around. Used by the list form.
    pub fn next(self) -> ListKind {
        match self {
            ListKind::Simple => ListKind::Financial,
            ListKind::Financial => ListKind::Simple,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown list kind '{0}', expected simple or financial")]
pub struct UnknownListKind(pub String);

impl FromStr for ListKind {
    type Err = UnknownListKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(ListKind::Simple),
            "financial" => Ok(ListKind::Financial),
            _ => Err(UnknownListKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoList {
    /// `None` until the store has assigned one.
    pub id: Option<ListId>,
    pub name: String,
    pub kind: ListKind,
    pub pinned: bool,
    pub created_at: NaiveDateTime,
}

impl TodoList {
    pub fn new(name: impl Into<String>, kind: ListKind) -> Self {
        TodoList {
            id: None,
            name: name.into(),
            kind,
            pinned: false,
            created_at: Local::now().naive_local(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: Option<TaskId>,
    pub list_id: ListId,
    pub text: String,
    pub important: bool,
    pub urgent: bool,
    pub completed: bool,
    pub created_at: NaiveDateTime,
    pub deadline: Option<NaiveDate>,
}

impl Task {
    pub fn new(list_id: ListId, text: impl Into<String>) -> Self {
        Task {
            id: None,
            list_id,
            text: text.into(),
            important: false,
            urgent: false,
            completed: false,
            created_at: Local::now().naive_local(),
            deadline: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_kind_parses_case_insensitively() {
        assert_eq!("Financial".parse::<ListKind>(), Ok(ListKind::Financial));
        assert_eq!(" simple ".parse::<ListKind>(), Ok(ListKind::Simple));
        assert!("groceries".parse::<ListKind>().is_err());
    }

    #[test]
    fn unknown_kind_error_names_the_input() {
        let err = "groceries".parse::<ListKind>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown list kind 'groceries', expected simple or financial"
        );
    }

    #[test]
    fn new_list_starts_unpinned_without_id() {
        let list = TodoList::new("Groceries", ListKind::Simple);
        assert!(list.id.is_none());
        assert!(!list.pinned);
    }

    #[test]
    fn kind_cycles_through_all_variants() {
        let mut kind = ListKind::Simple;
        for expected in ListKind::ALL.iter().cycle().skip(1).take(4) {
            kind = kind.next();
            assert_eq!(kind, *expected);
        }
    }
}
