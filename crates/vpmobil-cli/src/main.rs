//! vpmobil - class timetables from Stundenplan24 on the command line.

/// Application configuration (TOML).
mod config;

use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

use crate::config::{AppConfig, SchoolConfig, resolve_config_path};
use vpmobil_api::stundenplan24::{
    ClassTimetableView, DEFAULT_TIMEOUT, Lesson, Stundenplan24Client, TimetableDocument,
    parse_plan_date,
};

/// Environment variable holding the password.
const PASSWORD_ENV: &str = "VPMOBIL_PASSWORD";

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List the classes in a day's plan.
    Classes(PlanArgs),
    /// Show the lessons of one class.
    Lessons(LessonsArgs),
    /// List the off-days (holidays) announced in a day's plan.
    OffDays(PlanArgs),
    /// Show the notices of a day's plan.
    Info(PlanArgs),
    /// Manage the configuration file.
    Config(ConfigCommand),
}

/// Which plan to fetch and how to log in.
#[derive(clap::Args)]
struct PlanArgs {
    /// Plan date, "YYYY-MM-DD" (default: today).
    #[arg(long)]
    date: Option<String>,

    /// School number. Falls back to `[school].code` in config.toml.
    #[arg(long)]
    school: Option<u32>,

    /// Login name. Falls back to `[school].username` in config.toml.
    #[arg(long)]
    username: Option<String>,

    /// Password. Falls back to the `VPMOBIL_PASSWORD` environment variable.
    #[arg(long)]
    password: Option<String>,
}

/// Arguments for the `lessons` subcommand.
#[derive(clap::Args)]
struct LessonsArgs {
    /// Plan selection and login.
    #[command(flatten)]
    plan: PlanArgs,

    /// Class code, case-insensitive (e.g. "7a").
    #[arg(long, required = true)]
    class: String,

    /// Only lessons in this period (e.g. "3").
    #[arg(long)]
    period: Option<String>,

    /// Only lessons whose subject contains this text (case-insensitive).
    #[arg(long)]
    subject: Option<String>,

    /// Only lessons that differ from the regular plan.
    #[arg(long)]
    changed: bool,

    /// Print the lessons as JSON on stdout.
    #[arg(long)]
    json: bool,
}

/// Arguments for the `config` subcommand.
#[derive(clap::Args)]
struct ConfigCommand {
    /// Config subcommand to run.
    #[command(subcommand)]
    command: ConfigSubcommands,
}

/// Available config subcommands.
#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Write school settings to config.toml.
    Init(ConfigInitArgs),
    /// Show the current configuration.
    Show,
}

/// Arguments for the `config init` subcommand.
#[derive(clap::Args)]
struct ConfigInitArgs {
    /// School number.
    #[arg(long, required = true)]
    school: u32,

    /// Login name.
    #[arg(long, required = true)]
    username: String,

    /// Service root override.
    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

/// Resolved connection settings (CLI flags over config over defaults).
struct Connection {
    school_code: u32,
    username: String,
    password: String,
    base_url: Option<Url>,
    timeout: Duration,
}

/// Resolves the plan date; defaults to today.
fn resolve_date(date: Option<&str>) -> Result<NaiveDate> {
    date.map_or_else(|| Ok(Local::now().date_naive()), parse_plan_date)
        .context("invalid --date")
}

/// Merges CLI flags, config file and environment into connection settings.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or the school number,
/// username, or password is not given anywhere.
fn resolve_connection(args: &PlanArgs, dir: Option<&PathBuf>) -> Result<Connection> {
    let config_path = resolve_config_path(dir).context("failed to resolve config path")?;
    let config = AppConfig::load(&config_path).context("failed to load config")?;
    config
        .school
        .validate()
        .with_context(|| format!("invalid settings in {}", config_path.display()))?;

    let school_code = args
        .school
        .or(config.school.code)
        .context("school number is required (--school or [school].code in config.toml)")?;
    let username = args
        .username
        .clone()
        .or_else(|| config.school.username.clone())
        .context("username is required (--username or [school].username in config.toml)")?;
    let password = args
        .password
        .clone()
        .or_else(|| std::env::var(PASSWORD_ENV).ok())
        .with_context(|| format!("password is required (--password or {PASSWORD_ENV})"))?;

    Ok(Connection {
        school_code,
        username,
        password,
        base_url: config.school.base_url()?,
        timeout: config.school.timeout().unwrap_or(DEFAULT_TIMEOUT),
    })
}

/// Builds a `Stundenplan24Client` for the resolved connection.
///
/// # Errors
///
/// Returns an error if the client fails to build.
fn build_client(connection: &Connection) -> Result<Stundenplan24Client> {
    let mut builder = Stundenplan24Client::builder()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .timeout(connection.timeout);
    if let Some(url) = &connection.base_url {
        builder = builder.base_url(url.clone());
    }
    builder.build().context("failed to build Stundenplan24 client")
}

/// Fetches and normalizes the plan selected by `args`.
///
/// # Errors
///
/// Returns an error if the arguments are invalid or the fetch fails.
#[instrument(skip_all)]
async fn fetch_document(args: &PlanArgs, dir: Option<&PathBuf>) -> Result<TimetableDocument> {
    let date = resolve_date(args.date.as_deref())?;
    let connection = resolve_connection(args, dir)?;
    let client = build_client(&connection)?;

    tracing::info!(
        "Fetching plan for school {} on {}",
        connection.school_code,
        date.format("%Y-%m-%d")
    );
    client
        .fetch_timetable(
            date,
            connection.school_code,
            &connection.username,
            &connection.password,
        )
        .await
        .context("failed to fetch timetable")
}

/// Writes `value` as pretty JSON to stdout.
fn write_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("failed to write JSON")?;
    writeln!(stdout).context("failed to write to stdout")?;
    Ok(())
}

/// Runs the `classes` subcommand.
///
/// # Errors
///
/// Returns an error if the plan cannot be fetched.
#[instrument(skip_all)]
async fn run_classes(args: &PlanArgs, dir: Option<&PathBuf>) -> Result<()> {
    let document = fetch_document(args, dir).await?;

    tracing::info!("Class\tLessons");
    for entry in document.classes() {
        tracing::info!("{}\t{}", entry.code, entry.lessons.len());
    }
    tracing::info!("Total: {} classes", document.classes().len());

    Ok(())
}

/// Applies the `lessons` filters to a class view, keeping source order.
fn select_lessons<'a>(view: ClassTimetableView<'a>, args: &LessonsArgs) -> Vec<&'a Lesson> {
    let mut lessons = args.period.as_deref().map_or_else(
        || view.all_lessons().iter().collect(),
        |period| view.lessons_for_period(period),
    );
    if let Some(subject) = args.subject.as_deref() {
        let matching = view.lessons_for_subject(subject);
        lessons.retain(|lesson| matching.iter().any(|m| std::ptr::eq(*m, *lesson)));
    }
    if args.changed {
        lessons.retain(|lesson| lesson.has_changes());
    }
    lessons
}

/// Marks a field that differs from the regular plan.
fn marked(value: &str, changed: bool) -> String {
    let value = if value.is_empty() { "-" } else { value };
    if changed {
        format!("{value}*")
    } else {
        String::from(value)
    }
}

/// Runs the `lessons` subcommand.
///
/// # Errors
///
/// Returns an error if the plan cannot be fetched or the class does not exist.
#[instrument(skip_all)]
async fn run_lessons(args: &LessonsArgs, dir: Option<&PathBuf>) -> Result<()> {
    let document = fetch_document(&args.plan, dir).await?;
    let view = document
        .lookup(&args.class)
        .with_context(|| format!("available classes: {}", document.class_codes().join(", ")))?;

    let lessons = select_lessons(view, args);

    if args.json {
        return write_json(&lessons);
    }

    tracing::info!("Class {}", view.code());
    tracing::info!("St\tBeginn\tEnde\tFach\t\tLehrer\tRaum\tInfo");
    for lesson in &lessons {
        tracing::info!(
            "{}\t{}\t{}\t{}\t\t{}\t{}\t{}",
            lesson.period,
            lesson.start_time,
            lesson.end_time,
            marked(&lesson.subject, lesson.subject_changed),
            marked(&lesson.teacher, lesson.teacher_changed),
            marked(&lesson.room, lesson.room_changed),
            lesson.note,
        );
    }
    tracing::info!("Total: {} lessons", lessons.len());

    Ok(())
}

/// Runs the `off-days` subcommand.
///
/// # Errors
///
/// Returns an error if the plan cannot be fetched.
#[instrument(skip_all)]
async fn run_off_days(args: &PlanArgs, dir: Option<&PathBuf>) -> Result<()> {
    let document = fetch_document(args, dir).await?;

    if document.off_days().is_empty() {
        tracing::info!("No off-days listed in this plan.");
        return Ok(());
    }
    for day in document.off_days() {
        tracing::info!("{}", day.format("%Y-%m-%d (%a)"));
    }
    tracing::info!("Total: {} off-days", document.off_days().len());

    Ok(())
}

/// Runs the `info` subcommand.
///
/// # Errors
///
/// Returns an error if the plan cannot be fetched.
#[instrument(skip_all)]
async fn run_info(args: &PlanArgs, dir: Option<&PathBuf>) -> Result<()> {
    let document = fetch_document(args, dir).await?;

    match document.extra_info() {
        Some(info) => {
            for line in info.lines() {
                tracing::info!("{line}");
            }
        }
        None => tracing::info!("No notices in this plan."),
    }

    Ok(())
}

/// Runs the `config init` subcommand.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or saved.
#[instrument(skip_all)]
fn run_config_init(args: &ConfigInitArgs, dir: Option<&PathBuf>) -> Result<()> {
    let config_path = resolve_config_path(dir).context("failed to resolve config path")?;
    let mut config = AppConfig::load(&config_path).unwrap_or_default();

    config.school = SchoolConfig {
        code: Some(args.school),
        username: Some(args.username.clone()),
        base_url: args.base_url.clone(),
        timeout_secs: args.timeout_secs,
    };
    config.school.validate()?;
    config.save(&config_path).context("failed to save config")?;

    tracing::info!("Saved school settings to {}", config_path.display());
    Ok(())
}

/// Runs the `config show` subcommand.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded.
#[instrument(skip_all)]
fn run_config_show(dir: Option<&PathBuf>) -> Result<()> {
    let config_path = resolve_config_path(dir).context("failed to resolve config path")?;
    let config = AppConfig::load(&config_path).context("failed to load config")?;

    tracing::info!("Config file: {}", config_path.display());
    tracing::info!(
        "School: {}",
        config
            .school
            .code
            .map_or_else(|| String::from("-"), |c| c.to_string())
    );
    tracing::info!(
        "Username: {}",
        config.school.username.as_deref().unwrap_or("-")
    );
    tracing::info!(
        "Base URL: {}",
        config.school.base_url.as_deref().unwrap_or("(default)")
    );
    tracing::info!(
        "Timeout: {}s",
        config
            .school
            .timeout()
            .unwrap_or(DEFAULT_TIMEOUT)
            .as_secs()
    );

    Ok(())
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Classes(args) => run_classes(&args, cli.dir.as_ref()).await,
        Commands::Lessons(args) => run_lessons(&args, cli.dir.as_ref()).await,
        Commands::OffDays(args) => run_off_days(&args, cli.dir.as_ref()).await,
        Commands::Info(args) => run_info(&args, cli.dir.as_ref()).await,
        Commands::Config(cmd) => match cmd.command {
            ConfigSubcommands::Init(args) => run_config_init(&args, cli.dir.as_ref()),
            ConfigSubcommands::Show => run_config_show(cli.dir.as_ref()),
        },
    }
}
