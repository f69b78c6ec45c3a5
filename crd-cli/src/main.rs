mod auth;
mod client;
mod config;

use std::path::PathBuf;

use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand};
use ratatui::{
    TerminalOptions, Viewport,
    layout::Constraint,
    style::{Color, Modifier, Style},
    widgets::{Block, Cell, Row, Table},
};

use crd_sdk::datetime::to_editable;
use crd_sdk::export::export_filename;
use crd_sdk::records::ClientRecord;

use client::CrdClient;
use config::resolve_url;

#[derive(Parser)]
#[command(name = "crd", about = "Operator CLI for the Client Reports Dashboard")]
struct Cli {
    /// Base URL of the dashboard service (overrides config)
    #[arg(long, env = "CRD_URL")]
    url: Option<String>,

    /// Enable verbose debug output (can also set RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health
    Health,

    /// Authentication management
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Search client records by first name, last name or phone
    Search {
        /// Search text (omit to load the latest records)
        text: Option<String>,
    },

    /// Update one follow-up field of one record
    Update {
        /// Record identifier
        id: String,
        /// Field column name (e.g. BOP_Date, BOP_Status, Comment)
        field: String,
        /// New value; omit to clear the field
        value: Option<String>,
    },

    /// Show upcoming BOP meetings in a date range
    Upcoming {
        /// Range start (defaults to today)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Range end (defaults to 30 days from today)
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Show the weekly BOP trend for a date range
    Weekly {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Export the upcoming window to an .xlsx file
    Export {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Output path (defaults to the deterministic export name)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Sign in with the admin account
    Login {
        /// Admin email
        email: String,
        /// Admin password (prompted if omitted)
        #[arg(long, env = "CRD_PASSWORD")]
        password: Option<String>,
    },
    /// Sign out and clear stored tokens
    Logout,
    /// Show current authentication status
    Status,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the CLI configuration
    Show,
    /// Set the default service URL
    SetUrl {
        url: String,
    },
}

fn print_banner() {
    let teal = "\x1b[36m";
    let yellow = "\x1b[33m";
    let dim = "\x1b[2m";
    let reset = "\x1b[0m";

    eprintln!(
        r#"
{teal}  ██████╗{yellow}██████╗ {teal}██████╗ {reset}
{teal} ██╔════╝{yellow}██╔══██╗{teal}██╔══██╗{reset}
{teal} ██║     {yellow}██████╔╝{teal}██║  ██║{reset}
{teal} ██║     {yellow}██╔══██╗{teal}██║  ██║{reset}
{teal} ╚██████╗{yellow}██║  ██║{teal}██████╔╝{reset}
{teal}  ╚═════╝{yellow}╚═╝  ╚═╝{teal}╚═════╝ {reset}
{dim}  Client Reports v{version}{reset}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );
}

/// Returns true if this command requires authentication.
fn requires_auth(cmd: &Commands) -> bool {
    !matches!(
        cmd,
        Commands::Health | Commands::Auth { .. } | Commands::Config { .. }
    )
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing: --verbose sets crd=debug, or respect RUST_LOG
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("crd=debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    print_banner();

    let crd_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: could not load config: {e}");
            config::CrdConfig::default()
        }
    };

    let url = cli
        .url
        .clone()
        .unwrap_or_else(|| resolve_url(auth::stored_url().as_deref(), &crd_config));

    let mut client = CrdClient::new(&url);

    // Transparent authentication for protected commands
    if requires_auth(&cli.command) {
        match auth::access_token(&client).await {
            Ok(token) => client.set_token(token),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }

    let result = run_command(cli.command, &mut client, crd_config).await;
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_command(
    command: Commands,
    client: &mut CrdClient,
    mut crd_config: config::CrdConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Health => {
            let resp = client.health().await?;
            println!("Service {} is {}", resp.version, resp.status);
            Ok(())
        }

        Commands::Auth { command } => match command {
            AuthCommands::Login { email, password } => {
                let password = match password {
                    Some(p) => p,
                    None => prompt("Password: ")?,
                };
                auth::login(client.base_url(), &email, &password).await
            }
            AuthCommands::Logout => auth::logout(client).await,
            AuthCommands::Status => {
                auth::status();
                Ok(())
            }
        },

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!(
                    "service_url = {}",
                    crd_config.service_url.as_deref().unwrap_or("(default)")
                );
                println!("config file: {}", config::config_path()?.display());
                Ok(())
            }
            ConfigCommands::SetUrl { url } => {
                crd_config.service_url = Some(url.trim_end_matches('/').to_string());
                config::save_config(&crd_config)?;
                println!("Default service URL saved.");
                Ok(())
            }
        },

        Commands::Search { text } => {
            let resp = client.records(text.as_deref()).await?;
            println!("Loaded {} records (latest first, capped).", resp.total);
            render_record_table(" Records ", &resp.records)
        }

        Commands::Update { id, field, value } => {
            let resp = client.update_field(&id, &field, value.as_deref()).await?;
            match resp.value {
                Some(v) => println!("{} of {} set to {v}", resp.field, resp.id),
                None => println!("{} of {} cleared", resp.field, resp.id),
            }
            Ok(())
        }

        Commands::Upcoming { start, end } => {
            let (start, end) = resolve_range(start, end);
            // Load the latest snapshot before deriving the window,
            // mirroring the dashboard's fetch-then-derive flow
            client.records(None).await?;
            let resp = client.upcoming(start, end).await?;
            println!("{} upcoming between {start} and {end}.", resp.count);
            render_record_table(" Upcoming BOP Meetings ", &resp.records)
        }

        Commands::Weekly { start, end } => {
            let (start, end) = resolve_range(start, end);
            client.records(None).await?;
            let resp = client.weekly(start, end).await?;
            render_weekly_table(&resp.buckets)
        }

        Commands::Export { start, end, out } => {
            let (start, end) = resolve_range(start, end);
            client.records(None).await?;
            let bytes = client.export(start, end).await?;
            let path = out.unwrap_or_else(|| PathBuf::from(export_filename(start, end)));
            std::fs::write(&path, &bytes)?;
            println!("Exported {} bytes to {}", bytes.len(), path.display());
            Ok(())
        }
    }
}

fn prompt(label: &str) -> Result<String, Box<dyn std::error::Error>> {
    use std::io::Write;
    eprint!("{label}");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Default range: today through thirty days out, the dashboard's
/// initial view.
fn resolve_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    let today = Local::now().date_naive();
    let start = start.unwrap_or(today);
    let end = end.unwrap_or_else(|| today.checked_add_days(Days::new(30)).unwrap_or(today));
    (start, end)
}

fn client_name(record: &ClientRecord) -> String {
    let name = format!(
        "{} {}",
        record.first_name.as_deref().unwrap_or(""),
        record.last_name.as_deref().unwrap_or("")
    );
    let name = name.trim().to_string();
    if name.is_empty() { "\u{2014}".into() } else { name }
}

// ── Table rendering ─────────────────────────────────────────────────

fn render_record_table(
    title: &str,
    records: &[ClientRecord],
) -> Result<(), Box<dyn std::error::Error>> {
    let header = Row::new(vec![
        "Client", "Phone", "BOP Date", "BOP Status", "Product", "Follow-up", "ID",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD))
    .bottom_margin(1);

    let rows: Vec<Row> = records
        .iter()
        .map(|record| {
            let bop = to_editable(record.bop_date.as_deref());
            let bop_cell = if bop.is_empty() {
                Cell::from("\u{2014}").style(Style::default().fg(Color::DarkGray))
            } else {
                Cell::from(bop).style(Style::default().fg(Color::Green))
            };
            Row::new(vec![
                Cell::from(client_name(record)),
                Cell::from(record.phone.clone().unwrap_or_default()),
                bop_cell,
                Cell::from(record.bop_status.clone().unwrap_or_default()),
                Cell::from(record.product.clone().unwrap_or_default()),
                Cell::from(to_editable(record.followup_date.as_deref())),
                Cell::from(record.id.clone()).style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(20),    // Client
            Constraint::Length(14), // Phone
            Constraint::Length(17), // BOP Date
            Constraint::Length(12), // BOP Status
            Constraint::Length(14), // Product
            Constraint::Length(17), // Follow-up
            Constraint::Length(36), // ID
        ],
    )
    .header(header)
    .column_spacing(2)
    .block(
        Block::bordered()
            .title(title.to_string())
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    // +4 = top border + header + header bottom_margin + bottom border
    let height = records.len() as u16 + 4;
    let mut terminal = ratatui::init_with_options(TerminalOptions {
        viewport: Viewport::Inline(height),
    });
    terminal.draw(|frame| frame.render_widget(table, frame.area()))?;
    ratatui::restore();
    println!();

    Ok(())
}

fn render_weekly_table(
    buckets: &[crd_sdk::weekly::WeekBucket],
) -> Result<(), Box<dyn std::error::Error>> {
    if buckets.is_empty() {
        println!("No meetings in the selected range.");
        return Ok(());
    }

    let header = Row::new(vec!["Week of", "Meetings", ""])
        .style(Style::default().add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let rows: Vec<Row> = buckets
        .iter()
        .map(|bucket| {
            let bar = "█".repeat(bucket.count.min(40) as usize);
            Row::new(vec![
                Cell::from(bucket.week_start.to_string()),
                Cell::from(bucket.count.to_string()),
                Cell::from(bar).style(Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(10), // Week of
            Constraint::Length(8),  // Meetings
            Constraint::Min(10),    // Bar
        ],
    )
    .header(header)
    .column_spacing(2)
    .block(
        Block::bordered()
            .title(" Weekly BOP Trend ")
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    let height = buckets.len() as u16 + 4;
    let mut terminal = ratatui::init_with_options(TerminalOptions {
        viewport: Viewport::Inline(height),
    });
    terminal.draw(|frame| frame.render_widget(table, frame.area()))?;
    ratatui::restore();
    println!();

    Ok(())
}
