//! `quill history`: list past checks, show one in full, delete one, or
//! clear them all.

use std::process::ExitCode;

use anyhow::Result;

use quill_history::{HistoryFilter, HistoryRecord};

use crate::context::AppContext;
use crate::terminal_output::{note_error, note_success, preview, render_table, Column};

const PREVIEW_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    List(HistoryFilter),
    Show(u64),
    Delete(u64),
    Clear,
}

impl HistoryAction {
    /// Flags that conflict are rejected by clap before this runs.
    pub fn from_args(
        filter: HistoryFilter,
        id: Option<u64>,
        delete: Option<u64>,
        clear: bool,
    ) -> Self {
        match (id, delete, clear) {
            (_, Some(id), _) => Self::Delete(id),
            (_, _, true) => Self::Clear,
            (Some(id), _, _) => Self::Show(id),
            _ => Self::List(filter),
        }
    }
}

pub async fn run(ctx: &AppContext, action: HistoryAction) -> Result<ExitCode> {
    let store = ctx.history().await?;

    let filter = match action {
        HistoryAction::List(filter) => filter,
        HistoryAction::Show(id) => {
            return match store.get(id).await? {
                Some(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    note_error(&format!("No history record with id {id}"));
                    Ok(ExitCode::FAILURE)
                }
            };
        }
        HistoryAction::Delete(id) => {
            return if store.delete(id).await? {
                note_success(&format!("Deleted history record {id}"));
                Ok(ExitCode::SUCCESS)
            } else {
                note_error(&format!("No history record with id {id}"));
                Ok(ExitCode::FAILURE)
            };
        }
        HistoryAction::Clear => {
            store.clear().await?;
            note_success("History cleared");
            return Ok(ExitCode::SUCCESS);
        }
    };

    let records = store.list(filter).await?;
    if records.is_empty() {
        eprintln!("No history records ({filter}).");
        return Ok(ExitCode::SUCCESS);
    }
    print!("{}", render_table(&columns(), &rows(&records)));
    Ok(ExitCode::SUCCESS)
}

fn columns() -> Vec<Column> {
    vec![
        Column::right("ID"),
        Column::left("Created"),
        Column::left("Source"),
        Column::right("Errors"),
        Column::left("Essay"),
    ]
}

fn rows(records: &[HistoryRecord]) -> Vec<Vec<String>> {
    records
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                r.source_type.to_string(),
                r.result.detailed_errors.len().to_string(),
                preview(&r.content, PREVIEW_CHARS),
            ]
        })
        .collect()
}
