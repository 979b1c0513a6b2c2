use anyhow::Result;
use askmydoc::{
    client::{HttpRemoteService, RemoteService},
    config::Config,
    session::{Message, MessageKind, OperationTask, SessionController},
    types::AppError,
    utils::{init_logger, LogTarget},
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "askmydoc")]
#[command(version, about = "Ask natural-language questions about your spreadsheets", long_about = None)]
struct Cli {
    /// Base URL of the document-QA service (overrides ASKMYDOC_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds (overrides ASKMYDOC_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Model to request for answers (overrides ASKMYDOC_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal UI (default)
    Tui {
        /// Files to select on startup
        files: Vec<PathBuf>,
    },

    /// Upload spreadsheets and print the resulting summary
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Ask one question, optionally uploading files first
    Ask {
        /// Files to upload before asking
        #[arg(short, long, num_args = 1..)]
        files: Vec<PathBuf>,

        question: String,
    },

    /// Reset the service's conversation memory
    Reset,

    /// Show the tables currently loaded on the service
    Schema,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(url) = cli.api_url {
        config.service.base_url = url;
    }
    if let Some(timeout) = cli.timeout {
        config.service.timeout_secs = timeout;
    }
    if let Some(model) = cli.model {
        config.service.model = Some(model);
    }

    let command = cli.command.unwrap_or(Command::Tui { files: Vec::new() });
    let target = match command {
        Command::Tui { .. } => LogTarget::File,
        _ => LogTarget::Stderr,
    };
    let _guard = init_logger(&config.logging, target)?;
    info!("Using service at {}", config.service.base_url);

    let service: Arc<dyn RemoteService> = Arc::new(HttpRemoteService::new(&config.service)?);

    match command {
        Command::Tui { files } => {
            askmydoc::tui::run(config, service, files).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Upload { files } => {
            let mut session = SessionController::new(service);
            Ok(exit_code(upload_files(&mut session, &config, &files).await))
        }
        Command::Ask { files, question } => {
            let mut session = SessionController::new(service);
            if !files.is_empty() && !upload_files(&mut session, &config, &files).await {
                return Ok(ExitCode::FAILURE);
            }
            let seen = session.state().messages().len();
            let ok = match session.begin_ask(&question) {
                Ok(task) => run_interruptible(&mut session, task).await,
                // The warning is in the transcript
                Err(AppError::Precondition(_)) => false,
                Err(e) => {
                    eprintln!("{}", e);
                    false
                }
            };
            print_new(&session, seen);
            Ok(exit_code(ok))
        }
        Command::Reset => {
            let mut session = SessionController::new(service);
            let task = session.begin_reset()?;
            let ok = run_interruptible(&mut session, task).await;
            print_new(&session, 0);
            Ok(exit_code(ok))
        }
        Command::Schema => {
            let schema = service.schema().await?;
            println!(
                "{} table(s), {} row(s)",
                schema.total_tables, schema.total_rows
            );
            for (name, table) in &schema.tables {
                println!("\n{} ({} rows)", name, table.row_count);
                for (i, column) in table.columns.iter().enumerate() {
                    let ty = table.types.get(i).map(String::as_str).unwrap_or("?");
                    println!("  - {} {}", column, ty);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Select and upload `files`, printing the transcript lines it produces.
/// Returns false if anything went wrong.
async fn upload_files(session: &mut SessionController, config: &Config, files: &[PathBuf]) -> bool {
    if let Err(e) = session.select_files(files).await {
        eprintln!("{}", e);
        return false;
    }

    let limit = config.upload.max_file_size_bytes();
    for (index, notes) in session.selection().advisories(limit) {
        for note in notes {
            warn!("{}: {}", session.selection().files()[index].name, note);
            eprintln!("warning: {}: {}", session.selection().files()[index].name, note);
        }
    }

    let seen = session.state().messages().len();
    let ok = match session.begin_upload() {
        Ok(task) => run_interruptible(session, task).await,
        Err(e) => {
            eprintln!("{}", e);
            false
        }
    };
    print_new(session, seen);
    ok && session.state().has_dataset()
}

/// Await `task`, cancelling it on Ctrl+C. True unless the operation ended
/// in an error or was cancelled.
async fn run_interruptible(session: &mut SessionController, mut task: OperationTask) -> bool {
    let completion = tokio::select! {
        completion = &mut task => completion,
        _ = tokio::signal::ctrl_c() => {
            session.cancel();
            task.await
        }
    };
    let cancelled = matches!(completion.outcome, askmydoc::session::Outcome::Cancelled);
    session.finish(completion);

    !cancelled
        && session
            .state()
            .last_message()
            .map_or(true, |m| m.kind != MessageKind::Error)
}

fn print_new(session: &SessionController, seen: usize) {
    for message in session.state().messages().iter().skip(seen) {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    match message.kind {
        MessageKind::User => println!("> {}", message.content),
        MessageKind::System => println!("{}", message.content),
        MessageKind::Error => eprintln!("{}", message.content),
        MessageKind::Ai => {
            println!("{}", message.content);
            if message.has_provenance() {
                println!("\nSQL Queries Used:");
                for (i, sql) in message.sql_queries.iter().enumerate() {
                    println!("  {}. {}", i + 1, sql);
                }
            }
            if let Some(model) = &message.model_name {
                println!("\nModel: {}", model);
            }
        }
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
