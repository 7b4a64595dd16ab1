use crate::model::{ListId, TaskId, TodoList};

/// Per-user interaction state, handed explicitly to every handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub logged_in: bool,
    pub selected_list: Option<ListId>,
    pub editing_task: Option<TaskId>,
}

impl Session {
    /// A session that starts logged in unless a password is required.
    pub fn new(password: Option<&str>) -> Self {
        Session {
            logged_in: password.is_none(),
            ..Session::default()
        }
    }

    pub fn login(&mut self, attempt: &str, password: Option<&str>) -> bool {
        self.logged_in = match password {
            Some(expected) => attempt == expected,
            None => true,
        };
        self.logged_in
    }

    pub fn select_list(&mut self, list_id: Option<ListId>) {
        if self.selected_list != list_id {
            self.editing_task = None;
        }
        self.selected_list = list_id;
    }

    /// Forget the selection if that list no longer exists. Returns true if it was dropped.
    pub fn reconcile(&mut self, lists: &[TodoList]) -> bool {
        match self.selected_list {
            Some(selected) if !lists.iter().any(|list| list.id == Some(selected)) => {
                self.select_list(None);
                true
            }
            _ => false,
        }
    }
}
