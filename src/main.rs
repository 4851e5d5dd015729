mod handlers;

use anyhow::Result;
use clap::{Parser, Subcommand};
use delivery::engine::config::{Config, DATA_DIR_ENV, DEFAULT_DATA_DIR};
use delivery::engine::types::RunStatus;
use handlers::ScheduleArgs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "delivery", version, about = "Delivery task console")]
struct Cli {
    /// Directory holding the console database
    #[arg(long, global = true, env = DATA_DIR_ENV, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Initialize the console database
    Init,
    /// Add a new draft task
    Add {
        name: String,
        #[arg(long, short = 'd')]
        description: Option<String>,
        #[command(flatten)]
        schedule: ScheduleArgs,
    },
    /// Replace a task's schedule
    Reschedule {
        task: String,
        #[command(flatten)]
        schedule: ScheduleArgs,
    },
    /// Enable a task and compute its next run
    Enable {
        task: String,
    },
    /// Take a task out of the active schedule
    Pause {
        task: String,
    },
    /// Start a run of a task right now
    Run {
        task: String,
        /// Strict mode: require exact ID or name (no fuzzy matching)
        #[arg(long)]
        strict: bool,
    },
    /// Record the outcome of a run
    Finish {
        run_id: i64,
        #[arg(long, value_enum)]
        status: RunStatus,
        #[arg(long, short = 'm')]
        message: Option<String>,
    },
    /// List all tasks with their derived state
    List {
        #[arg(long)]
        json: bool,
    },
    /// Explain the state of a specific task
    Show {
        task: String,
        #[arg(long)]
        json: bool,
    },
    /// Show a summary of the console
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Show chronological run history
    History {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Copy a task into a fresh draft
    Duplicate {
        task: String,
    },
    /// Delete a task and its runs
    Remove {
        task: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::new(cli.data_dir);

    match cli.command {
        Commands::Init
        | Commands::Add { .. }
        | Commands::Reschedule { .. }
        | Commands::Enable { .. }
        | Commands::Pause { .. }
        | Commands::Run { .. }
        | Commands::Finish { .. }
        | Commands::Duplicate { .. }
        | Commands::Remove { .. } => dispatch_write_ops(&config, cli.command),
        Commands::List { .. }
        | Commands::Show { .. }
        | Commands::Status { .. }
        | Commands::History { .. } => dispatch_read_ops(&config, cli.command),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "delivery=debug" } else { "delivery=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch_write_ops(config: &Config, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init => handlers::init::handle(config),
        Commands::Add {
            name,
            description,
            schedule,
        } => handlers::add::handle(config, &name, description.as_deref(), &schedule),
        Commands::Reschedule { task, schedule } => {
            handlers::reschedule::handle(config, &task, &schedule)
        }
        Commands::Enable { task } => handlers::enable::handle(config, &task),
        Commands::Pause { task } => handlers::pause::handle(config, &task),
        Commands::Run { task, strict } => handlers::run::handle(config, &task, strict),
        Commands::Finish {
            run_id,
            status,
            message,
        } => handlers::finish::handle(config, run_id, status, message.as_deref()),
        Commands::Duplicate { task } => handlers::duplicate::handle(config, &task),
        Commands::Remove { task } => handlers::remove::handle(config, &task),
        _ => unreachable!("Invalid write command dispatch"),
    }
}

fn dispatch_read_ops(config: &Config, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::List { json } => handlers::list::handle(config, json),
        Commands::Show { task, json } => handlers::show::handle(config, &task, json),
        Commands::Status { json } => handlers::status::handle(config, json),
        Commands::History { limit } => handlers::history::handle(config, limit),
        _ => unreachable!("Invalid read command dispatch"),
    }
}
