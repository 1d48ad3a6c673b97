use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use job_tracker::api::{run_api, ApiState};
use job_tracker::client::{
    Action, Board, DragEvent, DropHandler, DropOutcome, HttpRemote, MutationCoordinator,
    PageWindow, TrackerRemote, ViewMode,
};
use job_tracker::config::{ClientConfig, ServerConfig};
use job_tracker::shutdown::install_shutdown_handler;
use job_tracker::tracker::{
    ApplicationId, ApplicationPatch, ApplicationStatus, NewApplication, OwnerId, Pagination,
    TrackedApplication,
};

#[derive(Parser, Debug)]
#[command(name = "job-tracker")]
#[command(version)]
#[command(about = "Track job applications through Applied, Interview, Offer and Rejected")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the tracker API server
    Server(ServerArgs),

    /// Work with your applications on a running server
    App {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: AppCommands,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Port to listen on
    #[arg(long, default_value = "5001")]
    port: u16,

    /// Interface to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Largest page size a list request may ask for
    #[arg(long, default_value = "100")]
    max_page_limit: u32,

    /// Maximum number of applications held across all users
    #[arg(long, default_value = "10000")]
    capacity: usize,
}

// =============================================================================
// Client Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Server address
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:5001")]
    addr: String,

    /// User id sent to the server as the request owner
    #[arg(long, short = 'u')]
    user: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// App Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum AppCommands {
    /// List applications, one page at a time
    List {
        /// Only show this status (Applied, Interview, Offer, Rejected)
        #[arg(long, short)]
        status: Option<ApplicationStatus>,

        /// Case-insensitive match on company or role
        #[arg(long, short = 'q')]
        search: Option<String>,

        #[arg(long, default_value = "1")]
        page: u32,

        /// Applications per page
        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// Show every application grouped by status
    Board {
        /// Case-insensitive match on company or role
        #[arg(long, short = 'q')]
        search: Option<String>,
    },
    /// Show a single application
    Show { id: String },
    /// Track a new application
    Add {
        #[arg(long)]
        company: String,

        #[arg(long)]
        role: String,

        #[arg(long)]
        status: Option<ApplicationStatus>,

        /// Date applied (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Change fields of an application
    Edit {
        id: String,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        status: Option<ApplicationStatus>,

        #[arg(long)]
        date: Option<String>,
    },
    /// Move an application to another board column
    Move {
        id: String,

        /// Target column (Applied, Interview, Offer, Rejected)
        column: String,
    },
    /// Delete an application
    Delete { id: String },
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListOutput<'a> {
    applications: Vec<&'a TrackedApplication>,
    pagination: Pagination,
}

#[derive(Serialize)]
struct BoardColumnOutput<'a> {
    status: ApplicationStatus,
    count: usize,
    applications: Vec<&'a TrackedApplication>,
}

#[derive(Serialize)]
struct MoveOutput {
    moved: bool,
    application: Option<TrackedApplication>,
}

#[derive(Serialize)]
struct DeleteOutput {
    id: String,
    deleted: bool,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn print_application_table(applications: &[&TrackedApplication]) {
    println!(
        "{:<38} {:<20} {:<20} {:<10} APPLIED",
        "ID", "COMPANY", "ROLE", "STATUS"
    );
    println!("{}", "-".repeat(100));
    for app in applications {
        println!(
            "{:<38} {:<20} {:<20} {:<10} {}",
            app.id,
            truncate(&app.company_name, 20),
            truncate(&app.role, 20),
            app.status,
            app.applied_date
        );
    }
}

fn print_application(app: &TrackedApplication) {
    println!("ID:         {}", app.id);
    println!("Company:    {}", app.company_name);
    println!("Role:       {}", app.role);
    println!("Status:     {}", app.status);
    println!("Applied:    {}", app.applied_date);
    println!("Created:    {}", app.created_at.to_rfc3339());
    println!("Updated:    {}", app.updated_at.to_rfc3339());
}

fn client_config(args: &ClientArgs) -> ClientConfig {
    ClientConfig::new(args.addr.clone(), OwnerId::new(args.user.trim()))
}

/// Coordinator with the owner's full collection loaded, as the board holds it.
async fn loaded_coordinator(
    args: &ClientArgs,
) -> Result<MutationCoordinator<HttpRemote>, Box<dyn std::error::Error>> {
    let config = client_config(args);
    let coordinator = MutationCoordinator::new(HttpRemote::new(&config)?, &config);
    coordinator.refresh().await?;
    Ok(coordinator)
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let listen_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let config = ServerConfig::new(listen_addr)
        .with_max_page_limit(args.max_page_limit)
        .with_capacity(args.capacity);

    tracing::info!(
        listen_addr = %config.listen_addr,
        default_limit = config.page_limits.default_limit,
        max_limit = config.page_limits.max_limit,
        capacity = config.max_applications,
        "Starting job tracker"
    );

    let shutdown = install_shutdown_handler();
    run_api(config.listen_addr, ApiState::new(&config), shutdown).await?;

    Ok(())
}

// =============================================================================
// App Command Handlers
// =============================================================================

async fn handle_list(
    args: &ClientArgs,
    status: Option<ApplicationStatus>,
    search: Option<String>,
    page: u32,
    limit: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = client_config(args).with_page_limit(limit);
    let coordinator = MutationCoordinator::new(HttpRemote::new(&config)?, &config);

    coordinator.dispatch(Action::SetViewMode(ViewMode::List)).await;
    coordinator.dispatch(Action::SetStatusFilter(status)).await;
    coordinator
        .dispatch(Action::SetSearchFilter(search.unwrap_or_default()))
        .await;
    coordinator.dispatch(Action::SetPage(page)).await;
    coordinator.refresh().await?;

    let state = coordinator.snapshot().await;
    let visible = state.list_view();

    match args.output {
        OutputFormat::Json => {
            let output = ListOutput {
                applications: visible,
                pagination: state.pagination,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            if visible.is_empty() {
                println!("No applications found.");
                return Ok(());
            }
            print_application_table(&visible);
            println!();
            match PageWindow::new(&state.pagination) {
                Some(window) => {
                    println!(
                        "Showing {}-{} of {} applications",
                        window.first_item, window.last_item, window.total
                    );
                    let pages: Vec<String> = window
                        .pages
                        .iter()
                        .map(|&p| {
                            if p == u64::from(state.pagination.page) {
                                format!("[{}]", p)
                            } else {
                                p.to_string()
                            }
                        })
                        .collect();
                    println!("Pages: {}", pages.join(" "));
                }
                None => println!("Showing {} applications", visible.len()),
            }
        }
    }
    Ok(())
}

async fn handle_board(
    args: &ClientArgs,
    search: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let coordinator = loaded_coordinator(args).await?;
    if let Some(search) = search {
        coordinator.dispatch(Action::SetSearchFilter(search)).await;
    }

    let state = coordinator.snapshot().await;
    let board = Board::build(&state);

    match args.output {
        OutputFormat::Json => {
            let output: Vec<BoardColumnOutput> = board
                .columns
                .iter()
                .map(|column| BoardColumnOutput {
                    status: column.status,
                    count: column.applications.len(),
                    applications: column.applications.clone(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            let counts = state.status_counts();
            println!("Applications: {}", counts.total());
            for (status, count) in counts.iter() {
                println!("  {:<10} {}", status, count);
            }
            for column in &board.columns {
                println!();
                println!("{} ({})", column.status, column.applications.len());
                println!("{}", "=".repeat(40));
                for app in &column.applications {
                    println!(
                        "  {:<20} {:<20} {}",
                        truncate(&app.company_name, 20),
                        truncate(&app.role, 20),
                        app.id
                    );
                }
            }
        }
    }
    Ok(())
}

async fn handle_show(args: &ClientArgs, id: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = client_config(args);
    let remote = HttpRemote::new(&config)?;
    let app = remote.fetch(&ApplicationId::from(id)).await?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&app)?),
        OutputFormat::Table => print_application(&app),
    }
    Ok(())
}

async fn handle_add(
    args: &ClientArgs,
    company: String,
    role: String,
    status: Option<ApplicationStatus>,
    date: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = client_config(args);
    let coordinator = MutationCoordinator::new(HttpRemote::new(&config)?, &config);

    let date = date.unwrap_or_else(|| chrono::Utc::now().date_naive().to_string());
    let mut payload = NewApplication::new(company, role, date);
    if let Some(status) = status {
        payload = payload.with_status(status);
    }

    let created = coordinator.create(payload).await?;
    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&created)?),
        OutputFormat::Table => {
            println!("Application added successfully!");
            println!("ID: {}", created.id);
        }
    }
    Ok(())
}

async fn handle_edit(
    args: &ClientArgs,
    id: String,
    patch: ApplicationPatch,
) -> Result<(), Box<dyn std::error::Error>> {
    if patch.is_empty() {
        return Err(
            "Nothing to change: pass at least one of --company, --role, --status, --date".into(),
        );
    }
    let coordinator = loaded_coordinator(args).await?;
    let updated = coordinator.update(&ApplicationId::from(id), patch).await?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&updated)?),
        OutputFormat::Table => {
            println!("Application updated successfully!");
            print_application(&updated);
        }
    }
    Ok(())
}

async fn handle_move(
    args: &ClientArgs,
    id: String,
    column: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let coordinator = loaded_coordinator(args).await?;
    let outcome = coordinator
        .on_drop(DragEvent::new(ApplicationId::from(id), column))
        .await?;

    match args.output {
        OutputFormat::Json => {
            let output = match outcome {
                DropOutcome::Moved(app) => MoveOutput {
                    moved: true,
                    application: Some(app),
                },
                DropOutcome::Ignored => MoveOutput {
                    moved: false,
                    application: None,
                },
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => match outcome {
            DropOutcome::Moved(app) => println!("Moved {} to {}", app.id, app.status),
            DropOutcome::Ignored => println!("Nothing to move."),
        },
    }
    Ok(())
}

async fn handle_delete(args: &ClientArgs, id: String) -> Result<(), Box<dyn std::error::Error>> {
    let coordinator = loaded_coordinator(args).await?;
    coordinator.delete(&ApplicationId::from(id.clone())).await?;

    match args.output {
        OutputFormat::Json => {
            let output = DeleteOutput { id, deleted: true };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => println!("Application deleted successfully!"),
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => {
            run_server(server_args).await?;
        }
        Commands::App { client, command } => match command {
            AppCommands::List {
                status,
                search,
                page,
                limit,
            } => {
                handle_list(&client, status, search, page, limit).await?;
            }
            AppCommands::Board { search } => {
                handle_board(&client, search).await?;
            }
            AppCommands::Show { id } => {
                handle_show(&client, id).await?;
            }
            AppCommands::Add {
                company,
                role,
                status,
                date,
            } => {
                handle_add(&client, company, role, status, date).await?;
            }
            AppCommands::Edit {
                id,
                company,
                role,
                status,
                date,
            } => {
                let patch = ApplicationPatch {
                    company_name: company,
                    role,
                    status: status.map(|s| s.to_string()),
                    applied_date: date,
                };
                handle_edit(&client, id, patch).await?;
            }
            AppCommands::Move { id, column } => {
                handle_move(&client, id, column).await?;
            }
            AppCommands::Delete { id } => {
                handle_delete(&client, id).await?;
            }
        },
    }

    Ok(())
}
