//! Leaf saved-query client.
//!
//! Provides the `leaf` binary for managing saved queries across a federation
//! of leaf nodes described by a JSON config file (see
//! `leaf_federation::config`). Every command starts a fresh session from the
//! home node's saved queries.
//!
//! - `leaf list` prints the caller's saved queries
//! - `leaf open <universal-id>` prints one definition as JSON
//! - `leaf save <file>` saves a definition read from a JSON file
//! - `leaf delete <universal-id> [--yes]` deletes, asking before cascading

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use leaf_core::{CorrelationId, NodeId, QueryDefinition, UniversalId};
use leaf_federation::{
    Decision, DeleteOutcome, Federation, FederationConfig, FederationError, OpenOutcome,
    PendingCascade, PropagationReport, QueryRef, SaveOutcome, Session,
};

/// Exit codes.
const EXIT_OK: i32 = 0;
const EXIT_REJECTED: i32 = 1;
const EXIT_CONFIG: i32 = 2;
const EXIT_IO: i32 = 3;

/// Leaf saved-query client.
#[derive(Parser)]
#[command(name = "leaf", about = "Save and delete Leaf queries across federated nodes")]
struct Cli {
    /// Path to the federation config file.
    #[arg(short, long, default_value = "leaf.json", env = "LEAF_CONFIG")]
    config: PathBuf,

    /// Cohort query id of a network node, as NODE_ID=CORRELATION_ID.
    /// Saves are mirrored only to nodes with a cohort.
    #[arg(long = "cohort", value_parser = parse_cohort)]
    cohorts: Vec<(NodeId, CorrelationId)>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List saved queries.
    List,

    /// Print a saved query as JSON.
    Open { universal_id: String },

    /// Save a query definition read from a JSON file.
    Save {
        file: PathBuf,

        /// Edit this saved query instead of the id in the file.
        #[arg(long)]
        universal_id: Option<String>,
    },

    /// Delete a saved query.
    Delete {
        universal_id: String,

        /// Confirm a cascading delete without asking.
        #[arg(short, long)]
        yes: bool,
    },
}

fn parse_cohort(value: &str) -> Result<(NodeId, CorrelationId), String> {
    let (node, cohort) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NODE_ID=CORRELATION_ID, got '{value}'"))?;
    let node: u32 = node
        .trim()
        .parse()
        .map_err(|_| format!("'{node}' is not a node id"))?;
    let cohort = cohort.trim();
    if cohort.is_empty() {
        return Err(format!("empty correlation id for node {node}"));
    }
    Ok((NodeId(node), CorrelationId(cohort.to_string())))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    process::exit(run(cli).await);
}

async fn run(cli: Cli) -> i32 {
    let config = match FederationConfig::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return EXIT_CONFIG;
        }
    };
    let federation = match config.connect() {
        Ok(federation) => federation,
        Err(err) => {
            eprintln!("Error: {err}");
            return EXIT_CONFIG;
        }
    };
    let mut session = match federation.bootstrap(config.user.clone()).await {
        Ok(session) => session,
        Err(err) => return report_rejection(&err),
    };
    session.network_cohorts.extend(cli.cohorts);

    match cli.command {
        Commands::List => run_list(&session),
        Commands::Open { universal_id } => run_open(&federation, session, universal_id.into()).await,
        Commands::Save { file, universal_id } => {
            run_save(&federation, session, file, universal_id.map(UniversalId::from)).await
        }
        Commands::Delete { universal_id, yes } => {
            run_delete(&federation, session, universal_id.into(), yes).await
        }
    }
}

fn run_list(session: &Session) -> i32 {
    if session.saved.is_empty() {
        println!("No saved queries.");
        return EXIT_OK;
    }
    for query in session.saved.values() {
        let uid = query
            .universal_id
            .as_ref()
            .map(UniversalId::as_str)
            .unwrap_or("-");
        let ver = query.ver.unwrap_or_default();
        if query.category.is_empty() {
            println!("{uid}  v{ver}  {}", query.name);
        } else {
            println!("{uid}  v{ver}  {} [{}]", query.name, query.category);
        }
    }
    EXIT_OK
}

async fn run_open(federation: &Federation, session: Session, universal_id: UniversalId) -> i32 {
    let transition = federation.open(session, &universal_id).await;
    let def = match transition.outcome {
        OpenOutcome::Opened(def) => def,
        OpenOutcome::AlreadyOpen => transition.session.candidate(),
        OpenOutcome::Rejected(err) => return report_rejection(&err),
    };
    print_json(&def)
}

async fn run_save(
    federation: &Federation,
    mut session: Session,
    file: PathBuf,
    universal_id: Option<UniversalId>,
) -> i32 {
    let text = match tokio::fs::read_to_string(&file).await {
        Ok(text) => text,
        Err(err) => {
            eprintln!("Error: cannot read '{}': {err}", file.display());
            return EXIT_IO;
        }
    };
    let mut def: QueryDefinition = match serde_json::from_str(&text) {
        Ok(def) => def,
        Err(err) => {
            eprintln!("Error: '{}' is not a query definition: {err}", file.display());
            return EXIT_IO;
        }
    };
    if universal_id.is_some() {
        def.universal_id = universal_id;
    }
    if let Some(existing) = def.universal_id.as_ref().and_then(|uid| session.saved.get(uid)) {
        def.id = existing.id;
        def.ver = existing.ver;
        def.owner = existing.owner.clone();
    }
    session.set_current(&def);

    let transition = federation.save(session).await;
    match transition.outcome {
        SaveOutcome::Saved(report) => {
            println!(
                "Saved \"{}\" as {} (v{})",
                report.query.name,
                report.universal_id,
                report.query.ver.unwrap_or_default()
            );
            print_propagation(&report.propagation);
            EXIT_OK
        }
        SaveOutcome::Rejected(err) => report_rejection(&err),
    }
}

async fn run_delete(
    federation: &Federation,
    session: Session,
    universal_id: UniversalId,
    yes: bool,
) -> i32 {
    let name = session
        .saved
        .get(&universal_id)
        .map(QueryDefinition::display_name)
        .unwrap_or_else(|| universal_id.to_string());
    let target = QueryRef::new(universal_id, name);

    let mut transition = federation.delete(session, &target).await;
    if let DeleteOutcome::NeedsConfirmation(pending) = transition.outcome {
        let decision = if yes {
            Decision::Yes
        } else {
            match ask(&pending).await {
                Ok(decision) => decision,
                Err(err) => {
                    eprintln!("Error: cannot read answer: {err}");
                    return EXIT_IO;
                }
            }
        };
        transition = federation
            .confirm(transition.session, pending, decision)
            .await;
    }

    match transition.outcome {
        DeleteOutcome::Deleted(report) => {
            for uid in &report.deleted {
                println!("Deleted {uid}");
            }
            print_propagation(&report.propagation);
            EXIT_OK
        }
        DeleteOutcome::Cancelled => {
            println!("Nothing deleted.");
            EXIT_OK
        }
        DeleteOutcome::Rejected(err) => report_rejection(&err),
        DeleteOutcome::NeedsConfirmation(pending) => {
            eprintln!("Error: {} still has dependents", pending.target.name);
            EXIT_REJECTED
        }
    }
}

async fn ask(pending: &PendingCascade) -> std::io::Result<Decision> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{}\n{} [y/N] ", pending.header(), pending.prompt()).as_bytes())
        .await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(if is_yes(&answer) {
        Decision::Yes
    } else {
        Decision::No
    })
}

fn report_rejection(err: &FederationError) -> i32 {
    eprintln!("{}: {err}", err.header());
    EXIT_REJECTED
}

fn print_propagation(report: &PropagationReport) {
    for outcome in report.failed().chain(report.skipped()) {
        eprintln!("  {} ({}): {:?}", outcome.name, outcome.node, outcome.status);
    }
}

fn print_json(def: &QueryDefinition) -> i32 {
    match serde_json::to_string_pretty(def) {
        Ok(json) => {
            println!("{json}");
            EXIT_OK
        }
        Err(err) => {
            eprintln!("Error: {err}");
            EXIT_IO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cohort_argument_parses_node_and_id() {
        let (node, cohort) = parse_cohort("2=abc-123").unwrap();
        assert_eq!(node, NodeId(2));
        assert_eq!(cohort, CorrelationId("abc-123".into()));
        assert!(parse_cohort("abc").is_err());
        assert!(parse_cohort("x=1").is_err());
        assert!(parse_cohort("1=").is_err());
    }

    #[test]
    fn delete_flags_parse() {
        let cli = Cli::try_parse_from(["leaf", "--cohort", "1=c", "delete", "urn:leaf:query:a", "--yes"])
            .unwrap();
        assert_eq!(cli.cohorts.len(), 1);
        assert!(matches!(cli.command, Commands::Delete { yes: true, .. }));
    }

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }
}
