use clap::Subcommand;
use focusdeck_core::Database;

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum NoteAction {
    /// Add a markdown note
    Add {
        /// Note content (markdown)
        content: String,
    },
    /// List notes, newest first
    List,
    /// Delete a note
    Delete {
        /// Note ID
        id: i64,
    },
}

pub fn run(action: NoteAction) -> CmdResult {
    let db = Database::open()?;

    match action {
        NoteAction::Add { content } => {
            let note = db.add_note(&content)?;
            print_json(&note)?;
        }
        NoteAction::List => {
            print_json(&db.list_notes()?)?;
        }
        NoteAction::Delete { id } => {
            db.delete_note(id)?;
            println!("Note deleted: {id}");
        }
    }
    Ok(())
}
