mod check_cmd;
mod context;
mod history_cmd;
mod ocr_cmd;
mod terminal_output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use quill_history::HistoryFilter;

use check_cmd::CheckArgs;
use history_cmd::HistoryAction;
use context::AppContext;

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Quill: essay correction from the terminal")]
#[command(version)]
struct Cli {
    /// Config file (defaults to quill.yaml in $QUILL_CONFIG_DIR or ~/.quill)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive; RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an essay from a .txt/.md/.docx file, an image, or inline text
    Check {
        /// Essay file
        #[arg(required_unless_present = "text")]
        file: Option<PathBuf>,

        /// Essay text given directly
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// Do not append the result to history
        #[arg(long)]
        no_history: bool,
    },
    /// Recognize the text in an image
    Ocr {
        image: PathBuf,
    },
    /// List past checks, show or delete one by id, or clear them all
    History {
        /// all, today, 3days or week
        #[arg(long, default_value = "all")]
        filter: HistoryFilter,

        #[arg(long)]
        id: Option<u64>,

        /// Delete the record with this id
        #[arg(long, conflicts_with_all = ["id", "clear"])]
        delete: Option<u64>,

        /// Delete every record
        #[arg(long, conflicts_with = "id")]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let ctx = AppContext::load(cli.config.as_deref()).await?;

    let level = cli.log_level.as_deref().unwrap_or(ctx.log_level());
    quill_logging::init_logger(ctx.log_dir(), level)?;
    ctx.log_warnings();
    debug!(base_dir = %ctx.base_dir.display(), "Configuration loaded");

    let code = match cli.command {
        Commands::Check {
            file,
            text,
            no_history,
        } => {
            check_cmd::run(
                &ctx,
                CheckArgs {
                    file,
                    text,
                    no_history,
                },
            )
            .await
        }
        Commands::Ocr { image } => ocr_cmd::run(&ctx, &image).await,
        Commands::History {
            filter,
            id,
            delete,
            clear,
        } => history_cmd::run(&ctx, HistoryAction::from_args(filter, id, delete, clear)).await,
    }?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_history_filter() {
        let cli = Cli::try_parse_from(["quill", "history", "--filter", "3days"]).unwrap();
        match cli.command {
            Commands::History {
                filter,
                id,
                delete,
                clear,
            } => {
                assert_eq!(
                    HistoryAction::from_args(filter, id, delete, clear),
                    HistoryAction::List(HistoryFilter::ThreeDays)
                );
            }
            _ => panic!("expected history command"),
        }
    }

    #[test]
    fn history_delete_and_clear() {
        let cli = Cli::try_parse_from(["quill", "history", "--delete", "7"]).unwrap();
        let Commands::History {
            filter,
            id,
            delete,
            clear,
        } = cli.command
        else {
            panic!("expected history command");
        };
        assert_eq!(HistoryAction::from_args(filter, id, delete, clear), HistoryAction::Delete(7));

        assert!(Cli::try_parse_from(["quill", "history", "--clear"]).is_ok());
        assert!(Cli::try_parse_from(["quill", "history", "--delete", "1", "--clear"]).is_err());
        assert!(Cli::try_parse_from(["quill", "history", "--id", "1", "--delete", "1"]).is_err());
    }

    #[test]
    fn check_needs_file_or_text() {
        assert!(Cli::try_parse_from(["quill", "check"]).is_err());
        assert!(Cli::try_parse_from(["quill", "check", "--text", "I has a dog."]).is_ok());
        assert!(Cli::try_parse_from(["quill", "check", "essay.docx", "--text", "x"]).is_err());
    }
}
