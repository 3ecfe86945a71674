//! Task list and active task commands for CLI.

use clap::Subcommand;
use focusdeck_core::Database;

use super::{print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task text
        text: String,
    },
    /// List tasks with their accumulated focus time
    List,
    /// Make a task the target of focus time
    Select {
        /// Task ID
        id: String,
    },
    /// Clear the active task (pauses a running countdown)
    Deselect,
    /// Mark a task completed
    Done {
        /// Task ID
        id: String,
    },
    /// Mark a task not completed
    Undo {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> CmdResult {
    match action {
        TaskAction::Add { text } => {
            let db = Database::open()?;
            let task = db.create_task(&text)?;
            println!("Task created: {}", task.id);
            print_json(&task)?;
        }
        TaskAction::List => {
            let db = Database::open()?;
            print_json(&db.list_tasks()?)?;
        }
        TaskAction::Select { id } => {
            // Hydrate before the selection changes so earlier time goes to
            // the previous task.
            let mut session = Session::open()?;
            let task = session.db.select_task(&id)?;
            let event = session.engine.select_task(Some(task))?;
            session.finish(event)?;
        }
        TaskAction::Deselect => {
            let mut session = Session::open()?;
            session.db.clear_selection()?;
            let event = session.engine.select_task(None)?;
            session.finish(event)?;
        }
        TaskAction::Done { id } => {
            let db = Database::open()?;
            db.set_task_completed(&id, true)?;
            println!("Task completed: {id}");
        }
        TaskAction::Undo { id } => {
            let db = Database::open()?;
            db.set_task_completed(&id, false)?;
            println!("Task reopened: {id}");
        }
        TaskAction::Delete { id } => {
            let mut session = Session::open()?;
            if session.engine.active_task().is_some_and(|t| t.id == id) {
                // Settle the task's focus time before it goes away.
                session.engine.select_task(None)?;
                session.print_credits()?;
            }
            session.db.delete_task(&id)?;
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}
