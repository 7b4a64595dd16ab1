use std::{fs::OpenOptions, path::PathBuf, sync::Mutex};

use anyhow::{bail, Context, Result};
use between::{
    config::Configuration,
    database::{
        add_list, add_task, delete_list, delete_task, fetch_due_tasks, fetch_list, fetch_lists,
        fetch_tasks, init_db, set_list_pinned, update_task_completion, update_task_flags,
        update_task_deadline, update_task_text,
    },
    due_on_or_before, rank_lists, rank_tasks, task_priority, Gateway, ListId, ListKind,
    SqliteGateway, Task, TaskId, TodoList,
};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod tui;

#[derive(Parser)]
#[command(
    name = "between",
    version,
    about = "Your minimalist to-do list manager",
    after_help = "BETWEEN_ADMIN_PASSWORD only gates the terminal UI. Subcommands run without a login."
)]
struct Cli {
    /// SQLite database file, overrides BETWEEN_DATABASE
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the terminal UI (default)
    Tui,
    /// Print every list, pinned first
    Lists,
    /// Create a list
    AddList {
        name: String,
        /// simple or financial
        #[arg(long, default_value = "simple")]
        kind: ListKind,
    },
    /// Pin or unpin a list
    Pin { list: i64 },
    /// Delete a list and all of its tasks
    DeleteList { list: i64 },
    /// Print the tasks of a list in priority order
    Tasks { list: i64 },
    /// Add a task to a list
    AddTask {
        list: i64,
        text: String,
        #[arg(long)]
        important: bool,
        #[arg(long)]
        urgent: bool,
        /// YYYY-MM-DD
        #[arg(long)]
        deadline: Option<NaiveDate>,
    },
    /// Mark a task as done, or open again with --undo
    Complete {
        task: i64,
        #[arg(long)]
        undo: bool,
    },
    /// Replace the text of a task
    Edit { task: i64, text: String },
    /// Set the priority flags of a task
    Flag {
        task: i64,
        #[arg(long)]
        important: bool,
        #[arg(long)]
        urgent: bool,
    },
    /// Set or clear the deadline of a task
    Deadline {
        task: i64,
        /// YYYY-MM-DD
        #[arg(required_unless_present = "clear", conflicts_with = "clear")]
        date: Option<NaiveDate>,
        #[arg(long)]
        clear: bool,
    },
    /// Delete a task
    DeleteTask { task: i64 },
    /// Print open tasks due on or before a date (default today)
    Due {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Configuration::create()?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }
    config.ensure_dirs()?;
    init_tracing(&config)?;

    let gateway = SqliteGateway::open(&config.database_path)
        .with_context(|| format!("could not open {}", config.database_path.display()))?;
    init_db(&gateway).context("could not create the schema")?;
    info!(database = %config.database_path.display(), "database ready");

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => tui::run_app(&gateway, config.admin_password.as_deref()),
        command => run_command(&gateway, command),
    }
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_tracing(config: &Configuration) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("could not open {}", config.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn run_command(gateway: &impl Gateway, command: Command) -> Result<()> {
    match command {
        Command::Tui => unreachable!("handled by main"),
        Command::Lists => {
            let lists = rank_lists(fetch_lists(gateway)?);
            if lists.is_empty() {
                println!("No lists yet. Create one!");
            }
            for list in lists {
                println!(
                    "{} {} ({})",
                    list.id.map(|id| id.0).unwrap_or_default(),
                    tui::list_label(&list),
                    list.kind
                );
            }
        }
        Command::AddList { name, kind } => {
            let name = name.trim();
            if name.is_empty() {
                bail!("a list needs a name");
            }
            match add_list(gateway, &TodoList::new(name, kind)) {
                Ok(id) => println!("List '{name}' created with id {id}"),
                Err(e) if e.is_duplicate() => bail!("a list named '{name}' already exists"),
                Err(e) => return Err(e.into()),
            }
        }
        Command::Pin { list } => {
            let Some(current) = fetch_list(gateway, ListId(list))? else {
                bail!("no list with id {list}");
            };
            set_list_pinned(gateway, ListId(list), !current.pinned)?;
            println!(
                "{} '{}'",
                if current.pinned { "Unpinned" } else { "Pinned" },
                current.name
            );
        }
        Command::DeleteList { list } => {
            if !delete_list(gateway, ListId(list))? {
                bail!("no list with id {list}");
            }
            println!("Deleted list {list}");
        }
        Command::Tasks { list } => {
            let Some(current) = fetch_list(gateway, ListId(list))? else {
                bail!("no list with id {list}");
            };
            println!("{} ({})", current.name, current.kind);
            print_tasks(rank_tasks(fetch_tasks(gateway, ListId(list))?));
        }
        Command::AddTask {
            list,
            text,
            important,
            urgent,
            deadline,
        } => {
            let text = text.trim();
            if text.is_empty() {
                bail!("a task needs some text");
            }
            if fetch_list(gateway, ListId(list))?.is_none() {
                bail!("no list with id {list}");
            }
            let mut task = Task::new(ListId(list), text);
            task.important = important;
            task.urgent = urgent;
            task.deadline = deadline;
            let id = add_task(gateway, &task)?;
            println!("Task {id} added with priority {}", task_priority(&task));
        }
        Command::Complete { task, undo } => {
            if !update_task_completion(gateway, TaskId(task), !undo)? {
                bail!("no task with id {task}");
            }
        }
        Command::Edit { task, text } => {
            let text = text.trim();
            if text.is_empty() {
                bail!("a task needs some text");
            }
            if !update_task_text(gateway, TaskId(task), text)? {
                bail!("no task with id {task}");
            }
        }
        Command::Flag {
            task,
            important,
            urgent,
        } => {
            if !update_task_flags(gateway, TaskId(task), important, urgent)? {
                bail!("no task with id {task}");
            }
        }
        Command::Deadline { task, date, clear } => {
            let deadline = if clear { None } else { date };
            if !update_task_deadline(gateway, TaskId(task), deadline)? {
                bail!("no task with id {task}");
            }
        }
        Command::DeleteTask { task } => {
            if !delete_task(gateway, TaskId(task))? {
                bail!("no task with id {task}");
            }
        }
        Command::Due { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            print_tasks(due_on_or_before(fetch_due_tasks(gateway, date)?, date));
        }
    }
    Ok(())
}

fn print_tasks(tasks: Vec<Task>) {
    if tasks.is_empty() {
        println!("Nothing to do.");
    }
    for task in tasks {
        println!(
            "{} {}",
            task.id.map(|id| id.0).unwrap_or_default(),
            tui::task_label(&task)
        );
    }
}
