use std::{
    cmp::min,
    io::{self, Stdout},
    time::Duration,
};

use anyhow::Result;
use between::{
    database::{
        add_list, add_task, delete_list, delete_task, fetch_lists, fetch_tasks, set_list_pinned,
        update_task_completion, update_task_flags, update_task_text,
    },
    rank_lists, rank_tasks,
    session::Session,
    Gateway, ListKind, PersistenceError, Task, TodoList,
};
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::{Alignment, Constraint, CrosstermBackend, Direction, Layout},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph},
    Terminal,
};
use tracing::warn;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum InputField {
    Password,
    ListName,
    TaskText,
    TaskDeadline,
    EditText,
}

impl InputField {
    fn label(self) -> &'static str {
        match self {
            InputField::Password => "Password",
            InputField::ListName => "List name",
            InputField::TaskText => "Task",
            InputField::TaskDeadline => "Deadline (YYYY-MM-DD)",
            InputField::EditText => "Edit task",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum AppState {
    Browse,
    CreateList,
    CreateTask,
    Input(InputField),
}

enum Flow {
    Continue,
    Quit,
}

struct State {
    pub state: AppState,
    pub input: String,
    pub list_name: String,
    pub list_kind: ListKind,
    pub task_text: String,
    pub task_deadline: Option<NaiveDate>,
    pub task_important: bool,
    pub task_urgent: bool,
    pub lists_list_state: ListState,
    pub todo_list_state: ListState,
    pub selecting_list: bool,
    pub status: Option<String>,
}

impl State {
    fn new(state: AppState) -> Self {
        State {
            state,
            input: String::new(),
            list_name: String::new(),
            list_kind: ListKind::default(),
            task_text: String::new(),
            task_deadline: None,
            task_important: false,
            task_urgent: false,
            lists_list_state: ListState::default(),
            todo_list_state: ListState::default(),
            selecting_list: true,
            status: None,
        }
    }

    fn reset_list_form(&mut self) {
        self.list_name.clear();
        self.list_kind = ListKind::default();
    }

    fn reset_task_form(&mut self) {
        self.task_text.clear();
        self.task_deadline = None;
        self.task_important = false;
        self.task_urgent = false;
    }

    /// Keeps the outcome of a store call, turning failures into the status line.
    fn report<T>(&mut self, result: Result<T, PersistenceError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "store call failed");
                self.status = Some(if e.is_duplicate() {
                    "A list with this name already exists.".to_string()
                } else {
                    format!("Database error: {e}")
                });
                None
            }
        }
    }
}

pub fn run_app(gateway: &impl Gateway, password: Option<&str>) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let outcome = run(&mut terminal, gateway, password);
    restore_terminal(&mut terminal)?;
    outcome
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    Ok(terminal.show_cursor()?)
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    gateway: &impl Gateway,
    password: Option<&str>,
) -> Result<()> {
    let mut session = Session::new(password);
    let mut state = State::new(if session.logged_in {
        AppState::Browse
    } else {
        AppState::Input(InputField::Password)
    });

    loop {
        let mut lists = vec![];
        let mut tasks = vec![];
        if session.logged_in {
            lists = state
                .report(fetch_lists(gateway).map(rank_lists))
                .unwrap_or_default();
            if session.reconcile(&lists) {
                state.status = Some("The selected list may have been deleted.".to_string());
                state.selecting_list = true;
            }
            let selected_index = session
                .selected_list
                .and_then(|id| lists.iter().position(|list| list.id == Some(id)));
            state.lists_list_state.select(selected_index);

            if let Some(list_id) = session.selected_list {
                tasks = state
                    .report(fetch_tasks(gateway, list_id).map(rank_tasks))
                    .unwrap_or_default();
            }
            clamp_selection(&mut state.todo_list_state, tasks.len());
        }

        match state.state {
            AppState::Browse => draw_lists(terminal, &lists, &tasks, &session, &mut state),
            AppState::CreateList => draw_create_list(terminal, &state),
            AppState::CreateTask => draw_create_task(terminal, &state),
            AppState::Input(field) => draw_input(terminal, &state, field),
        };

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                let flow = match state.state {
                    AppState::Browse => {
                        handle_browse(key.code, gateway, &mut session, &mut state, &lists, &tasks)
                    }
                    AppState::CreateList => {
                        handle_create_list(key.code, gateway, &mut session, &mut state)
                    }
                    AppState::CreateTask => handle_create_task(key.code, gateway, &session, &mut state),
                    AppState::Input(field) => {
                        handle_input(key.code, field, gateway, &mut session, &mut state, password)
                    }
                };
                if let Flow::Quit = flow {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn clamp_selection(list_state: &mut ListState, len: usize) {
    if let Some(index) = list_state.selected() {
        list_state.select(match len {
            0 => None,
            len => Some(min(index, len - 1)),
        });
    }
}

fn handle_browse(
    code: KeyCode,
    gateway: &impl Gateway,
    session: &mut Session,
    state: &mut State,
    lists: &[TodoList],
    tasks: &[Task],
) -> Flow {
    state.status = None;
    let selected_list = state.lists_list_state.selected().and_then(|i| lists.get(i));
    let selected_task = state.todo_list_state.selected().and_then(|i| tasks.get(i));

    match code {
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Char('L') => {
            state.reset_list_form();
            state.state = AppState::CreateList;
        }
        KeyCode::Char('N') => {
            if selected_list.is_some() {
                state.reset_task_form();
                state.state = AppState::CreateTask;
            }
        }
        KeyCode::Char('P') => {
            if let Some(list) = selected_list {
                if let Some(id) = list.id {
                    state.report(set_list_pinned(gateway, id, !list.pinned));
                }
            }
        }
        KeyCode::Char('D') => match state.selecting_list {
            true => {
                if let Some(id) = selected_list.and_then(|list| list.id) {
                    if state.report(delete_list(gateway, id)) == Some(true) {
                        session.select_list(None);
                        state.lists_list_state.select(None);
                        state.todo_list_state.select(None);
                    }
                }
            }
            false => {
                if let Some(id) = selected_task.and_then(|task| task.id) {
                    state.report(delete_task(gateway, id));
                }
            }
        },
        KeyCode::Char('j') => match state.selecting_list {
            true => move_down(&mut state.lists_list_state, lists.len()),
            false => move_down(&mut state.todo_list_state, tasks.len()),
        },
        KeyCode::Char('k') => match state.selecting_list {
            true => move_up(&mut state.lists_list_state),
            false => move_up(&mut state.todo_list_state),
        },
        KeyCode::Char('h') => {
            if !state.selecting_list {
                state.selecting_list = true;
                state.todo_list_state.select(None);
            }
        }
        KeyCode::Char('l') => match state.selecting_list {
            true => {
                if selected_list.is_some() {
                    state.selecting_list = false;
                    if !tasks.is_empty() {
                        state.todo_list_state.select(Some(0));
                    }
                }
            }
            false => toggle_completion(gateway, state, selected_task),
        },
        KeyCode::Char(' ') => {
            if !state.selecting_list {
                toggle_completion(gateway, state, selected_task);
            }
        }
        KeyCode::Char('i') => {
            if let Some(task) = selected_task.filter(|_| !state.selecting_list) {
                if let Some(id) = task.id {
                    state.report(update_task_flags(gateway, id, !task.important, task.urgent));
                }
            }
        }
        KeyCode::Char('u') => {
            if let Some(task) = selected_task.filter(|_| !state.selecting_list) {
                if let Some(id) = task.id {
                    state.report(update_task_flags(gateway, id, task.important, !task.urgent));
                }
            }
        }
        KeyCode::Char('e') => {
            if let Some(task) = selected_task.filter(|_| !state.selecting_list) {
                session.editing_task = task.id;
                state.input = task.text.clone();
                state.state = AppState::Input(InputField::EditText);
            }
        }
        _ => {}
    }

    // The list cursor is the source of truth for which list is open.
    if state.selecting_list {
        let cursor = state.lists_list_state.selected().and_then(|i| lists.get(i));
        session.select_list(cursor.and_then(|list| list.id));
    }
    Flow::Continue
}

fn toggle_completion(gateway: &impl Gateway, state: &mut State, task: Option<&Task>) {
    if let Some(task) = task {
        if let Some(id) = task.id {
            state.report(update_task_completion(gateway, id, !task.completed));
        }
    }
}

fn handle_create_list(
    code: KeyCode,
    gateway: &impl Gateway,
    session: &mut Session,
    state: &mut State,
) -> Flow {
    match code {
        KeyCode::Char('q') => state.state = AppState::Browse,
        KeyCode::Char('t') => {
            state.input = state.list_name.clone();
            state.state = AppState::Input(InputField::ListName);
        }
        KeyCode::Char('k') => state.list_kind = state.list_kind.next(),
        KeyCode::Char('s') => {
            if state.list_name.trim().is_empty() {
                state.status = Some("A list needs a name.".to_string());
                return Flow::Continue;
            }
            let list = TodoList::new(state.list_name.trim(), state.list_kind);
            if let Some(id) = state.report(add_list(gateway, &list)) {
                session.select_list(Some(id));
                state.status = Some(format!("List '{}' created!", list.name));
                state.reset_list_form();
            }
            state.state = AppState::Browse;
        }
        _ => {}
    }
    Flow::Continue
}

fn handle_create_task(
    code: KeyCode,
    gateway: &impl Gateway,
    session: &Session,
    state: &mut State,
) -> Flow {
    match code {
        KeyCode::Char('q') => state.state = AppState::Browse,
        KeyCode::Char('t') => {
            state.input = state.task_text.clone();
            state.state = AppState::Input(InputField::TaskText);
        }
        KeyCode::Char('d') => {
            state.input = state.task_deadline.map(|d| d.to_string()).unwrap_or_default();
            state.state = AppState::Input(InputField::TaskDeadline);
        }
        KeyCode::Char('i') => state.task_important = !state.task_important,
        KeyCode::Char('u') => state.task_urgent = !state.task_urgent,
        KeyCode::Char('s') => {
            let Some(list_id) = session.selected_list else {
                state.state = AppState::Browse;
                return Flow::Continue;
            };
            if state.task_text.trim().is_empty() {
                state.status = Some("A task needs some text.".to_string());
                return Flow::Continue;
            }
            let mut task = Task::new(list_id, state.task_text.trim());
            task.important = state.task_important;
            task.urgent = state.task_urgent;
            task.deadline = state.task_deadline;
            if state.report(add_task(gateway, &task)).is_some() {
                state.reset_task_form();
            }
            state.state = AppState::Browse;
        }
        _ => {}
    }
    Flow::Continue
}

fn handle_input(
    code: KeyCode,
    field: InputField,
    gateway: &impl Gateway,
    session: &mut Session,
    state: &mut State,
    password: Option<&str>,
) -> Flow {
    match code {
        KeyCode::Char(c) => state.input.push(c),
        KeyCode::Backspace => {
            state.input.pop();
        }
        KeyCode::Esc => {
            state.input.clear();
            state.state = match field {
                InputField::Password => return Flow::Quit,
                InputField::ListName => AppState::CreateList,
                InputField::TaskText | InputField::TaskDeadline => AppState::CreateTask,
                InputField::EditText => {
                    session.editing_task = None;
                    AppState::Browse
                }
            };
        }
        KeyCode::Enter => {
            let value = std::mem::take(&mut state.input);
            state.state = match field {
                InputField::Password => {
                    if session.login(&value, password) {
                        state.status = None;
                        AppState::Browse
                    } else {
                        state.status = Some("Incorrect password".to_string());
                        AppState::Input(InputField::Password)
                    }
                }
                InputField::ListName => {
                    state.list_name = value;
                    AppState::CreateList
                }
                InputField::TaskText => {
                    state.task_text = value;
                    AppState::CreateTask
                }
                InputField::TaskDeadline => {
                    state.task_deadline = parse_deadline(&value, state);
                    AppState::CreateTask
                }
                InputField::EditText => {
                    if let Some(id) = session.editing_task.take() {
                        if !value.trim().is_empty() {
                            state.report(update_task_text(gateway, id, value.trim()));
                        }
                    }
                    AppState::Browse
                }
            };
        }
        _ => {}
    }
    Flow::Continue
}

fn parse_deadline(value: &str, state: &mut State) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<NaiveDate>() {
        Ok(date) => Some(date),
        Err(_) => {
            state.status = Some(format!("'{value}' is not a date, use YYYY-MM-DD"));
            None
        }
    }
}

fn move_up(list_state: &mut ListState) {
    match list_state.selected() {
        Some(v) => {
            let previous = match v {
                0 => None,
                v => Some(v - 1),
            };
            list_state.select(previous);
        }
        None => list_state.select(Some(0)),
    }
}

fn move_down(list_state: &mut ListState, len: usize) {
    if len == 0 {
        return;
    }
    match list_state.selected() {
        Some(v) => list_state.select(Some(min(v + 1, len - 1))),
        None => list_state.select(Some(0)),
    }
}

pub fn list_label(list: &TodoList) -> String {
    format!("{} {}", if list.pinned { "📌" } else { "📝" }, list.name)
}

pub fn task_label(task: &Task) -> String {
    let mut flags = String::new();
    if task.important {
        flags.push('⭐');
    }
    if task.urgent {
        flags.push('🔥');
    }
    let deadline = task
        .deadline
        .map(|d| format!(" (Due: {})", d.format("%b %d")))
        .unwrap_or_default();
    format!(
        "{} {}{}{}{}",
        if task.completed { "[x]" } else { "[ ]" },
        flags,
        if flags.is_empty() { "" } else { " " },
        task.text,
        deadline
    )
}

fn status_line(state: &State, help: &'static str) -> Paragraph<'static> {
    match &state.status {
        Some(message) => Paragraph::new(message.clone()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
    }
}

fn draw_input(terminal: &mut Terminal<CrosstermBackend<Stdout>>, state: &State, field: InputField) {
    let shown = match field {
        InputField::Password => "*".repeat(state.input.chars().count()),
        _ => state.input.clone(),
    };
    let heading = match field {
        InputField::Password => "✅ Between, your minimalist to-do list manager",
        _ => field.label(),
    };
    terminal
        .draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(2)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Length(4),
                        Constraint::Min(0),
                        Constraint::Length(1),
                    ]
                    .as_ref(),
                )
                .split(frame.size());

            frame.render_widget(
                Paragraph::new(heading).alignment(Alignment::Center),
                chunks[0],
            );
            frame.render_widget(
                Paragraph::new(shown)
                    .block(
                        Block::default()
                            .title(field.label())
                            .borders(Borders::ALL)
                            .border_type(BorderType::Rounded),
                    )
                    .alignment(Alignment::Center),
                chunks[1],
            );
            frame.render_widget(status_line(state, "(enter) Confirm  (esc) Cancel"), chunks[3]);
        })
        .ok();
}

fn draw_create_list(terminal: &mut Terminal<CrosstermBackend<Stdout>>, state: &State) {
    terminal
        .draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(2)
                .constraints(
                    [
                        Constraint::Length(2),
                        Constraint::Min(5),
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Length(1),
                    ]
                    .as_ref(),
                )
                .split(frame.size());

            let text = vec![
                Line::from("(t) Input name"),
                Line::from("(k) Change kind"),
                Line::from("(s) Create list".green().italic()),
                Line::from("(q) Cancel".red()),
            ];

            frame.render_widget(
                Paragraph::new("New list").alignment(Alignment::Center),
                chunks[0],
            );
            frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), chunks[1]);
            frame.render_widget(
                Paragraph::new(state.list_name.clone())
                    .block(
                        Block::default()
                            .title("Name")
                            .borders(Borders::ALL)
                            .border_type(BorderType::Rounded),
                    )
                    .alignment(Alignment::Center),
                chunks[2],
            );
            frame.render_widget(
                Paragraph::new(state.list_kind.as_str())
                    .block(
                        Block::default()
                            .title("Kind")
                            .borders(Borders::ALL)
                            .border_type(BorderType::Rounded),
                    )
                    .alignment(Alignment::Center),
                chunks[3],
            );
            frame.render_widget(status_line(state, ""), chunks[4]);
        })
        .ok();
}

fn draw_create_task(terminal: &mut Terminal<CrosstermBackend<Stdout>>, state: &State) {
    let flags = format!(
        "{}  {}",
        if state.task_important { "[x] ⭐ Important" } else { "[ ] ⭐ Important" },
        if state.task_urgent { "[x] 🔥 Urgent" } else { "[ ] 🔥 Urgent" },
    );
    let deadline = state.task_deadline.map(|d| d.to_string()).unwrap_or_default();
    terminal
        .draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(2)
                .constraints(
                    [
                        Constraint::Length(2),
                        Constraint::Min(7),
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Length(1),
                    ]
                    .as_ref(),
                )
                .split(frame.size());

            let text = vec![
                Line::from("(t) Input task"),
                Line::from("(d) Input deadline"),
                Line::from("(i) Toggle important"),
                Line::from("(u) Toggle urgent"),
                Line::from("(s) Add task".green().italic()),
                Line::from("(q) Cancel".red()),
            ];

            frame.render_widget(
                Paragraph::new("New task").alignment(Alignment::Center),
                chunks[0],
            );
            frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), chunks[1]);
            frame.render_widget(
                Paragraph::new(state.task_text.clone())
                    .block(
                        Block::default()
                            .title("Task")
                            .borders(Borders::ALL)
                            .border_type(BorderType::Rounded),
                    )
                    .alignment(Alignment::Center),
                chunks[2],
            );
            frame.render_widget(
                Paragraph::new(deadline)
                    .block(
                        Block::default()
                            .title("Deadline")
                            .borders(Borders::ALL)
                            .border_type(BorderType::Rounded),
                    )
                    .alignment(Alignment::Center),
                chunks[3],
            );
            frame.render_widget(
                Paragraph::new(flags)
                    .block(
                        Block::default()
                            .title("Priority")
                            .borders(Borders::ALL)
                            .border_type(BorderType::Rounded),
                    )
                    .alignment(Alignment::Center),
                chunks[4],
            );
            frame.render_widget(status_line(state, ""), chunks[5]);
        })
        .ok();
}

fn draw_lists(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    lists: &[TodoList],
    tasks: &[Task],
    session: &Session,
    state: &mut State,
) {
    let lists_items: Vec<_> = lists
        .iter()
        .map(|list| ListItem::new(vec![Line::from(list_label(list))]))
        .collect();

    let lists_ui = List::new(lists_items)
        .block(Block::default().title("Your Lists").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().add_modifier(Modifier::ITALIC))
        .highlight_symbol(">>");

    let todo_items: Vec<_> = tasks
        .iter()
        .map(|task| {
            let style = match task.completed {
                true => Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT),
                false => Style::default(),
            };
            ListItem::new(vec![Line::from(vec![Span::styled(task_label(task), style)])])
        })
        .collect();

    let title = session
        .selected_list
        .and_then(|id| lists.iter().find(|list| list.id == Some(id)))
        .map(|list| format!("{} ({})", list.name, list.kind))
        .unwrap_or_else(|| "Select a list to get started".to_string());

    let todo_ui = List::new(todo_items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().add_modifier(Modifier::ITALIC))
        .highlight_symbol(">>");

    let status = status_line(
        state,
        "(L) list (N) task (P) pin (D) delete (e) edit (i) important (u) urgent (space) done (q) quit",
    );

    terminal
        .draw(|frame| {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .margin(2)
                .constraints([Constraint::Min(3), Constraint::Length(1)].as_ref())
                .split(frame.size());
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(30), Constraint::Min(2)].as_ref())
                .split(rows[0]);

            frame.render_stateful_widget(lists_ui, chunks[0], &mut state.lists_list_state);
            frame.render_stateful_widget(todo_ui, chunks[1], &mut state.todo_list_state);
            frame.render_widget(status, rows[1]);
        })
        .ok();
}
