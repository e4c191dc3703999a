use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::de::DeserializeOwned;
use tablekit_lib::pagination::NavigationMode;
use tablekit_lib::persistence::StorageScope;
use tablekit_lib::query::MatchMode;

use crate::commands;
use crate::error::Result;

#[derive(Debug, Parser)]
#[command(name = "tablekit", about = "Page, search and inspect JSON datasets", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print one page of a dataset.
    Page(PageArgs),

    /// Search a dataset.
    Search(SearchArgs),

    /// Inspect or clear persisted table state.
    #[command(subcommand)]
    State(StateCommand),
}

#[derive(Debug, Args)]
pub struct PageArgs {
    /// JSON file holding an array of records.
    pub file: PathBuf,

    /// Table name; persisted state is keyed by it.
    #[arg(long, default_value = "table")]
    pub name: String,

    /// Rows per page.
    #[arg(long, default_value_t = 5)]
    pub page_size: usize,

    /// Page to show; the persisted page when omitted.
    #[arg(long)]
    pub page: Option<usize>,

    /// Navigation mode.
    #[arg(long, default_value = "basic", value_parser = parse_serde::<NavigationMode>)]
    pub navigation: NavigationMode,

    /// Sort by this field.
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort descending.
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Column filter as field=value; repeatable.
    #[arg(long = "filter")]
    pub filters: Vec<String>,

    /// Select rows by id; repeatable.
    #[arg(long = "select")]
    pub select: Vec<String>,

    /// Persist table state in this scope.
    #[arg(long, value_parser = parse_serde::<StorageScope>)]
    pub persist: Option<StorageScope>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// JSON file holding an array of entries.
    pub file: PathBuf,

    /// Query text.
    pub query: String,

    /// Search only these keys; repeatable.
    #[arg(long = "key")]
    pub keys: Vec<String>,

    /// Match mode.
    #[arg(long, default_value = "contains", value_parser = parse_serde::<MatchMode>)]
    pub mode: MatchMode,

    /// Match case.
    #[arg(long)]
    pub case_sensitive: bool,

    /// Minimum query length.
    #[arg(long, default_value_t = 1)]
    pub min_chars: usize,

    /// Maximum results, 0 for all.
    #[arg(long, default_value_t = 0)]
    pub limit: usize,
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// Print the persisted state of a table.
    Show(StateArgs),

    /// Remove the persisted state of a table.
    Clear(StateArgs),
}

#[derive(Debug, Args)]
pub struct StateArgs {
    /// Table name.
    pub name: String,

    /// Storage scope.
    #[arg(long, default_value = "local", value_parser = parse_serde::<StorageScope>)]
    pub scope: StorageScope,
}

/// Parses a value through its lowercase serde name.
fn parse_serde<T: DeserializeOwned>(value: &str) -> std::result::Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|e| e.to_string())
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Page(args) => commands::run_page(args).await,
        Commands::Search(args) => commands::run_search(args).await,
        Commands::State(StateCommand::Show(args)) => commands::show_state(args).await,
        Commands::State(StateCommand::Clear(args)) => commands::clear_state(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_page_command() {
        let cli = Cli::try_parse_from([
            "tablekit",
            "page",
            "people.json",
            "--page-size",
            "10",
            "--sort",
            "name",
            "--desc",
            "--filter",
            "city=London",
            "--persist",
            "session",
        ])
        .unwrap();
        let Commands::Page(args) = cli.command else {
            panic!("expected page command");
        };
        assert_eq!(args.page_size, 10);
        assert!(args.desc);
        assert_eq!(args.filters, vec!["city=London"]);
        assert_eq!(args.persist, Some(StorageScope::Session));
        assert_eq!(args.navigation, NavigationMode::Basic);
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["tablekit", "search", "f.json", "q", "--mode", "fuzzy"]).is_err());
        let cli = Cli::try_parse_from(["tablekit", "search", "f.json", "q", "--mode", "start"]).unwrap();
        let Commands::Search(args) = cli.command else {
            panic!("expected search command");
        };
        assert_eq!(args.mode, MatchMode::Start);
    }
}
