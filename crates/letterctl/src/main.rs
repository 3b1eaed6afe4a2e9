mod config;

use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Parser, Subcommand};
use config::{Config, Context};
use letters_client::register::{
    format_date, format_time, is_number_reassigned, restore_blocked, search, sort_for_display,
};
use letters_client::{
    ClientConfig, FileSessionStore, Letter, LettersClient, SessionListener, SessionStore,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "letterctl")]
#[command(version, about = "Letters register command line client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Letters API URL (overrides the current context)
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Per-request timeout in seconds (overrides LETTERS_HTTP_TIMEOUT)
    #[arg(long, global = true, value_name = "SECONDS")]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Api(ApiCommand),
    /// Manage server contexts
    Context {
        #[command(subcommand)]
        command: ContextCommand,
    },
}

#[derive(Subcommand)]
enum ApiCommand {
    /// Log in and store the session
    /// Examples:
    ///     letterctl login
    ///     letterctl login --username name.surname
    #[command(verbatim_doc_comment)]
    Login {
        /// Username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Request an account; credentials are emailed to the address
    Signup {
        email: String,
    },
    /// Request a password reset link
    ResetPassword {
        email: String,
    },
    /// List registered letters, newest number first
    /// Examples:
    ///     letterctl list
    ///     letterctl list --search acme
    ///     letterctl list --search 05/03/2024 --json
    #[command(verbatim_doc_comment)]
    List {
        /// Filter by number, subject, addressee, or dd/mm/yyyy date
        #[arg(short, long)]
        search: Option<String>,

        /// Emit only the JSON response
        #[arg(short, long)]
        json: bool,
    },
    /// Show one letter
    Show {
        /// Letter ID
        id: i64,
    },
    /// Register a new letter; the server assigns its number
    /// Example:
    ///     letterctl register --subject "Policy renewal" --addressee "ACME Ltd"
    #[command(verbatim_doc_comment)]
    Register {
        #[arg(long)]
        subject: String,

        #[arg(long)]
        addressee: String,

        /// Emit only the JSON response
        #[arg(short, long)]
        json: bool,
    },
    /// Cancel a letter
    Cancel {
        /// Letter ID
        id: i64,
    },
    /// Restore a cancelled letter whose number has not been re-assigned
    Restore {
        /// Letter ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum ContextCommand {
    /// Add a new context
    /// Examples:
    ///     letterctl context add local --server-url=http://localhost:8000
    ///     letterctl context add prod --server-url=https://letters.example.com --set-current
    #[command(verbatim_doc_comment)]
    Add {
        /// Context name
        name: String,
        /// Server URL (e.g., http://localhost:8000)
        #[arg(long)]
        server_url: String,
        /// Set as current context
        #[arg(long)]
        set_current: bool,
    },
    /// List all configured contexts
    List,
    /// Switch to a different context (logs out of the previous server)
    Use {
        /// Context name to switch to
        name: String,
    },
    /// Delete a context
    Delete {
        /// Context name to delete
        name: String,
    },
}

/// Prints a notice when the client tears down an unrecoverable session.
struct TerminalListener;

impl SessionListener for TerminalListener {
    fn on_session_expired(&self) {
        eprintln!("Your session has expired. Please log in again with 'letterctl login'.");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,letters_client=info,letterctl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command {
        Commands::Context { command } => handle_context_command(&mut config, command),
        Commands::Api(command) => {
            let client_config = resolve_client_config(
                ClientConfig::from_env_unvalidated(),
                cli.server_url.as_deref(),
                cli.timeout,
                &config,
            )?;
            let client = build_client(&client_config)?;
            run(&client, command).await
        }
    }
}

/// Layer the flag and current context over `base`, then validate once.
fn resolve_client_config(
    base: ClientConfig,
    server_url: Option<&str>,
    timeout: Option<u64>,
    config: &Config,
) -> Result<ClientConfig> {
    let mut client_config = base;
    if let Some(url) = server_url {
        client_config = client_config.with_base_url(url);
    } else if let Some((_, ctx)) = config.get_current_context() {
        client_config = client_config.with_base_url(&ctx.server_url);
    }
    if let Some(secs) = timeout {
        client_config = client_config.with_timeout(Duration::from_secs(secs));
    }
    client_config.validate()?;
    Ok(client_config)
}

fn build_client(client_config: &ClientConfig) -> Result<LettersClient> {
    let session_path = config::session_path()?;
    let store: Arc<dyn SessionStore> = Arc::new(
        FileSessionStore::open(&session_path)
            .with_context(|| format!("Failed to open session at {}", session_path.display()))?,
    );
    let client = LettersClient::with_listener(client_config, store, Arc::new(TerminalListener))?;

    tracing::debug!(server_url = %client.base_url(), "Client configured");
    Ok(client)
}

async fn run(client: &LettersClient, command: ApiCommand) -> Result<()> {
    match command {
        ApiCommand::Login { username } => login(client, username).await?,
        ApiCommand::Logout => {
            client.logout()?;
            println!("Logged out.");
        }
        ApiCommand::Whoami => match client.session().username() {
            Some(username) => println!("{} ({})", username, client.base_url()),
            None => {
                println!("Not logged in.");
                std::process::exit(1);
            }
        },
        ApiCommand::Signup { email } => {
            client.request_signup(&email).await?;
            println!("Credentials sent to email {}", email);
        }
        ApiCommand::ResetPassword { email } => {
            let message = client.request_password_reset(&email).await?;
            println!("{}", message);
        }
        ApiCommand::List { search: term, json } => {
            require_login(client)?;
            list_letters(client, term.as_deref(), json).await?;
        }
        ApiCommand::Show { id } => {
            require_login(client)?;
            let letters = client.list_letters().await?;
            let letter = find_letter(&letters, id)?;
            print_details(letter, &letters);
        }
        ApiCommand::Register {
            subject,
            addressee,
            json,
        } => {
            require_login(client)?;
            let letter = client.create_letter(&subject, &addressee).await?;
            if json {
                println!("{}", serde_json::to_string(&letter)?);
            } else {
                println!(
                    "Registered No. {} dated {} - {}",
                    letter.number,
                    format_date(&letter),
                    letter.addressee
                );
            }
        }
        ApiCommand::Cancel { id } => {
            require_login(client)?;
            client
                .cancel_letter(id)
                .await
                .context("Failed to cancel letter")?;
            println!("Letter {} cancelled.", id);
        }
        ApiCommand::Restore { id } => {
            require_login(client)?;
            restore_letter(client, id).await?;
        }
    }

    Ok(())
}

fn require_login(client: &LettersClient) -> Result<()> {
    if !client.session().is_authenticated() {
        bail!("Not logged in. Run 'letterctl login' first.");
    }
    Ok(())
}

async fn login(client: &LettersClient, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => prompt("Username: ")?,
    };
    if username.is_empty() {
        bail!("Username is required");
    }
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;

    let session = client.login(&username, &password).await?;
    println!(
        "Welcome, {}!",
        session.username().unwrap_or(username.as_str())
    );
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

async fn list_letters(client: &LettersClient, term: Option<&str>, json_only: bool) -> Result<()> {
    let mut letters = client.list_letters().await?;
    sort_for_display(&mut letters);
    let shown = search(&letters, term.unwrap_or(""));

    if json_only {
        println!("{}", serde_json::to_string(&shown)?);
        return Ok(());
    }

    if shown.is_empty() {
        println!("No letters found.");
        return Ok(());
    }

    println!(
        "  {:<6} {:<6} {:<10} {:<8} {:<24} {:<14} {}",
        "ID", "NO.", "DATE", "TIME", "ADDRESSEE", "BY", "SUBJECT"
    );
    for letter in shown {
        let mark = if letter.is_cancelled { "x" } else { " " };
        println!(
            "{} {:<6} {:<6} {:<10} {:<8} {:<24} {:<14} {}",
            mark,
            letter.id,
            letter.number,
            format_date(letter),
            format_time(letter),
            letter.addressee,
            letter.registered_by_username,
            letter.subject
        );
    }
    Ok(())
}

fn find_letter(letters: &[Letter], id: i64) -> Result<&Letter> {
    letters
        .iter()
        .find(|l| l.id == id)
        .with_context(|| format!("Letter {} not found", id))
}

fn print_details(letter: &Letter, letters: &[Letter]) {
    println!("Letter Details");
    println!("No. {}", letter.number);
    println!("  Addressee:     {}", letter.addressee);
    println!("  Subject:       {}", letter.subject);
    println!("  Registered by: {}", letter.registered_by_username);
    println!(
        "  Registered on: {} at {}",
        format_date(letter),
        format_time(letter)
    );
    if letter.is_cancelled {
        println!("This letter is CANCELLED.");
        if is_number_reassigned(letter, letters) {
            println!("Number Re-assigned: it cannot be restored.");
        }
    }
}

async fn restore_letter(client: &LettersClient, id: i64) -> Result<()> {
    let letters = client.list_letters().await?;
    let letter = find_letter(&letters, id)?;

    if !letter.is_cancelled {
        bail!("Letter No. {} is not cancelled", letter.number);
    }
    if restore_blocked(letter, &letters) {
        bail!(
            "Number Re-assigned: No. {} is in use by another active letter",
            letter.number
        );
    }

    client
        .restore_letter(id)
        .await
        .context("Could not restore letter")?;
    println!("Letter No. {} restored.", letter.number);
    Ok(())
}

fn handle_context_command(config: &mut Config, command: ContextCommand) -> Result<()> {
    match command {
        ContextCommand::Add {
            name,
            server_url,
            set_current,
        } => {
            ClientConfig::new(&server_url).validate()?;
            config
                .contexts
                .insert(name.clone(), Context::new(server_url));
            if set_current || config.current_context.is_none() {
                config.current_context = Some(name.clone());
            }
            config.save()?;
            println!("Context '{}' added.", name);
            if config.current_context.as_ref() == Some(&name) {
                println!("Context '{}' is now the current context.", name);
            }
        }
        ContextCommand::List => {
            println!("  {:<15} {:<40}", "NAME", "SERVER URL");
            for (name, ctx) in &config.contexts {
                let current_mark = if config.current_context.as_ref() == Some(name) {
                    "*"
                } else {
                    " "
                };
                println!("{} {:<15} {:<40}", current_mark, name, ctx.server_url);
            }
        }
        ContextCommand::Use { name } => {
            let Some(ctx) = config.contexts.get(&name) else {
                bail!("Context '{}' not found.", name);
            };
            let server_url = ctx.server_url.clone();
            config.current_context = Some(name.clone());
            config.save()?;

            // Tokens are only valid for the server that issued them.
            let store = FileSessionStore::open(config::session_path()?)?;
            store.clear()?;
            println!("Switched to context '{}' ({}).", name, server_url);
        }
        ContextCommand::Delete { name } => {
            if config.contexts.remove(&name).is_none() {
                bail!("Context '{}' not found.", name);
            }
            if config.current_context.as_ref() == Some(&name) {
                config.current_context = None;
            }
            config.save()?;
            println!("Context '{}' deleted.", name);
        }
    }
    Ok(())
}
