//! QuietSignal - mood journaling backend
//!
//! A CLI over a SQLite journal store. Entries are written paragraph by
//! paragraph and every write re-scores the whole entry with a
//! length- and recency-weighted blend of per-paragraph sentiment.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, storage, classifier, not found, etc.)
//!   2 - Authentication or authorization failure

mod analysis;
mod auth;
mod classifier;
mod cli;
mod config;
mod error;
mod journal;
mod models;
mod report;
mod store;

use analysis::{Aggregator, WeightingParams};
use anyhow::{Context, Result};
use auth::{Authenticator, Registration};
use classifier::Classifier;
use cli::{AdminCommand, Args, Command, EntryCommand, JournalCommand, OutputFormat};
use config::Config;
use error::AppError;
use journal::JournalService;
use models::User;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use store::Store;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    init_logging(&args)?;

    debug!("QuietSignal v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args.command);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Startup failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .quietsignal.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!(
        "✅ Created {} with default settings.",
        config::DEFAULT_CONFIG_FILE
    );
    println!("   Set auth.secret_key before registering users.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load configuration, run the command and print its result.
/// Returns the process exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let format = config.general.format;

    match execute(&args, &config, format).await {
        Ok(output) => {
            print!("{}", output);
            if format == OutputFormat::Json {
                println!();
            }
            Ok(0)
        }
        Err(e) => Ok(report_failure(format, &e)),
    }
}

/// Print a failure in the selected format and pick the exit code.
fn report_failure(format: OutputFormat, err: &anyhow::Error) -> i32 {
    let app_error = err.downcast_ref::<AppError>();
    let status = app_error.map(AppError::status_code).unwrap_or(500);
    let auth_failure = app_error.is_some_and(|e| e.is_auth_failure());

    if auth_failure {
        warn!("{:#}", err);
    } else {
        error!("{:#}", err);
    }

    match format {
        OutputFormat::Json => println!("{}", report::generate_json_error(status, &format!("{:#}", err))),
        OutputFormat::Text => eprintln!("\n❌ Error: {:#}", err),
    }

    if auth_failure {
        2
    } else {
        1
    }
}

/// Render a successful result as text or as a JSON envelope.
fn render<T: Serialize>(
    format: OutputFormat,
    code: u16,
    message: &str,
    data: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<String> {
    match format {
        OutputFormat::Json => report::generate_json_response(code, message, data),
        OutputFormat::Text => Ok(text(data)),
    }
}

async fn execute(args: &Args, config: &Config, format: OutputFormat) -> Result<String> {
    let session_file = &config.general.session_file;

    // Commands that need neither the database nor a model.
    match &args.command {
        Command::Logout => {
            if session_file.exists() {
                std::fs::remove_file(session_file).with_context(|| {
                    format!("Failed to remove session file {}", session_file.display())
                })?;
            }
            return render(format, 200, "Logged out", &(), |_| "👋 Logged out.\n".to_string());
        }
        Command::Analyze { text } => {
            let classifier = ready_classifier(config).await?;
            let analysis = analysis::analyze_text(classifier.as_ref(), text)
                .await
                .map_err(AppError::from)?;
            return render(format, 200, "Analysis complete", &analysis, |a| {
                report::generate_analysis_text(a)
            });
        }
        _ => {}
    }

    let mut store = open_store(config)?;
    let authenticator = Authenticator::new(&config.auth);
    authenticator.ensure_admin(&mut store, &config.admin)?;

    match &args.command {
        Command::Register {
            name,
            username,
            email,
            password,
        } => {
            let session = authenticator.register(
                &mut store,
                &Registration {
                    name,
                    username,
                    email: email.as_deref(),
                    password: password.as_str(),
                },
            )?;
            return render(
                format,
                201,
                "User registered successfully",
                &session.user,
                |u| {
                    format!(
                        "✅ Registered @{} with journal \"{} Journal\".\n   Run `quietsignal login` to start writing.\n",
                        u.username, u.username
                    )
                },
            );
        }
        Command::Login { username, password } => {
            let session = authenticator.authenticate(&store, username, password.as_str())?;
            write_session(session_file, &session.token).with_context(|| {
                format!("Failed to write session file {}", session_file.display())
            })?;
            info!("Session saved to {}", session_file.display());

            let data = serde_json::json!({
                "access_token": session.token,
                "user": session.user,
            });
            return render(format, 200, "Login successful", &data, |_| {
                format!("✅ Logged in as @{}\n", session.user.username)
            });
        }
        _ => {}
    }

    let token = args.token.clone().or_else(|| read_session(session_file));
    let user = authenticator.current_user(&store, token.as_deref())?;
    debug!(user_id = user.id, "Authenticated as {}", user.username);

    if let Command::Whoami = args.command {
        return render(format, 200, "Fetched user", &user, report::generate_user_text);
    }

    let needs_model = matches!(
        args.command,
        Command::Entry(EntryCommand::Append { .. })
            | Command::Entry(EntryCommand::AppendBatch { .. })
            | Command::Admin(AdminCommand::Recompute)
    );
    let classifier: Box<dyn Classifier> = if needs_model {
        ready_classifier(config).await?
    } else {
        classifier::build_classifier(&config.classifier).map_err(AppError::from)?
    };

    let aggregator = Aggregator::new(WeightingParams::from(&config.aggregation));
    debug!("Weighting: {:?}", aggregator.params());
    let mut service = JournalService::new(store, classifier, aggregator);

    run_journal_command(&mut service, &user, args, format).await
}

async fn run_journal_command(
    service: &mut JournalService,
    user: &User,
    args: &Args,
    format: OutputFormat,
) -> Result<String> {
    match &args.command {
        Command::Journal(JournalCommand::Create { title }) => {
            let journal = service.create_journal(user, title)?;
            render(format, 201, "Journal created", &journal, |j| {
                format!("✅ Created {}", report::generate_journal_line(j))
            })
        }
        Command::Journal(JournalCommand::Mine) => {
            let journal = service.default_journal(user)?;
            render(format, 200, "Fetched journal", &journal, |j| {
                report::generate_journal_line(j)
            })
        }
        Command::Journal(JournalCommand::List) => {
            let journals = service.list_journals(user)?;
            render(format, 200, "Fetched journals", &journals, |j| {
                report::generate_journal_list_text(j)
            })
        }
        Command::Entry(EntryCommand::Create { journal }) => {
            let entry = service.create_entry(user, *journal)?;
            render(format, 201, "Entry created", &entry, report::generate_entry_text)
        }
        Command::Entry(EntryCommand::Append {
            journal,
            entry,
            paragraph,
        }) => {
            let entry = service
                .append_paragraph(user, *journal, *entry, paragraph.clone())
                .await?;
            render(format, 200, "Paragraph appended", &entry, report::generate_entry_text)
        }
        Command::Entry(EntryCommand::AppendBatch {
            journal,
            entry,
            paragraphs,
        }) => {
            let entry = service
                .append_batch(user, *journal, *entry, paragraphs)
                .await?;
            render(format, 200, "Paragraphs appended", &entry, report::generate_entry_text)
        }
        Command::Entry(EntryCommand::Show { journal, entry }) => {
            let entry = service.get_entry(user, *journal, *entry)?;
            render(format, 200, "Fetched entry", &entry, report::generate_entry_text)
        }
        Command::Entry(EntryCommand::List { journal }) => {
            let entries = service.list_entries(user, *journal)?;
            render(format, 200, "Fetched entries", &entries, |e| {
                report::generate_entry_list_text(e)
            })
        }
        Command::Admin(AdminCommand::Recompute) => {
            let show_progress = !args.quiet && format == OutputFormat::Text;
            let summary = service.recompute_all(user, show_progress).await?;
            render(format, 200, "Entries recalculated", &summary, report::generate_recompute_text)
        }
        Command::InitConfig
        | Command::Register { .. }
        | Command::Login { .. }
        | Command::Logout
        | Command::Whoami
        | Command::Analyze { .. } => {
            unreachable!("handled before the journal service is built")
        }
    }
}

/// Build the configured classifier and make sure it can serve requests.
async fn ready_classifier(config: &Config) -> Result<Box<dyn Classifier>> {
    let classifier = classifier::build_classifier(&config.classifier).map_err(AppError::from)?;
    info!("Using {} classifier", classifier.name());
    classifier.check_ready().await.map_err(AppError::from)?;
    Ok(classifier)
}

fn open_store(config: &Config) -> Result<Store> {
    let path = &config.storage.database_path;
    Store::open(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Save the session token readable by the owner only.
fn write_session(path: &Path, token: &str) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        // Mode applies only on creation; tighten a file left by an older login.
        if path.exists() {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
    }
    let mut file = options.open(path)?;
    file.write_all(token.as_bytes())
}

fn read_session(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(token) => Some(token.trim().to_string()),
        Err(e) => {
            debug!("No session at {}: {}", path.display(), e);
            None
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default()? {
        Some(config) => {
            debug!("Loaded default config from {}", config::DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
