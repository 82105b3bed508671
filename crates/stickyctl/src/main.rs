use anyhow::Context;
use clap::Parser;
use materializations::{MaterializationStore, ReadOp, SqliteStore, WriteOp};

/// Inspect and seed the sticky assignments of a SQLite materialization store.
#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Path of the SQLite materializations database.
    #[clap(
        long = "database",
        env = "STICKY_DATABASE",
        default_value = "materializations.db"
    )]
    database: std::path::PathBuf,
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Read assignments of a unit, printing one JSON result per rule.
    Read(ReadArgs),
    /// Persist the assignment of a unit to a rule.
    Write(WriteArgs),
}

#[derive(clap::Args, Debug)]
struct ReadArgs {
    /// Name of the materialization.
    #[clap(long)]
    materialization: String,
    /// Unit (user or device) whose assignments are read.
    #[clap(long)]
    unit: String,
    /// Rule to read. May be repeated.
    #[clap(long = "rule", required = true)]
    rules: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct WriteArgs {
    /// Name of the materialization.
    #[clap(long)]
    materialization: String,
    /// Unit (user or device) which is assigned.
    #[clap(long)]
    unit: String,
    /// Rule of the assignment.
    #[clap(long)]
    rule: String,
    /// Assigned variant.
    #[clap(long)]
    variant: String,
}

fn main() -> anyhow::Result<()> {
    // Structured logs go to stderr, leaving stdout for results.
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(!matches!(std::env::var("NO_COLOR"), Ok(v) if v == "1"))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting tracing default failed")?;

    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(run(cli));

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    result
}

async fn run(Cli { database, command }: Cli) -> anyhow::Result<()> {
    let store = SqliteStore::open(&database)?;
    tracing::debug!(database = %database.display(), "opened materialization store");

    let result = match command {
        Command::Read(args) => read(&store, args).await,
        Command::Write(args) => write(&store, args).await,
    };
    store.close().await?;

    result
}

async fn read(
    store: &SqliteStore,
    ReadArgs {
        materialization,
        unit,
        rules,
    }: ReadArgs,
) -> anyhow::Result<()> {
    let ops = rules
        .into_iter()
        .map(|rule| ReadOp {
            materialization: materialization.clone(),
            unit: unit.clone(),
            rule,
        })
        .collect();

    for result in store.read(ops).await? {
        println!("{}", serde_json::to_string(&result)?);
    }
    Ok(())
}

async fn write(store: &SqliteStore, args: WriteArgs) -> anyhow::Result<()> {
    let WriteArgs {
        materialization,
        unit,
        rule,
        variant,
    } = args;

    tracing::info!(%materialization, %unit, %rule, %variant, "writing assignment");

    store
        .write(vec![WriteOp {
            materialization,
            unit,
            rule,
            variant,
        }])
        .await
        .context("writing assignment")?;

    Ok(())
}
