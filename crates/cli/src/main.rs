use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use msgboard_auth::{AuthError, AuthFlowController, AuthService, CredentialStore, HttpAuthService, Session};
use msgboard_cli::{AppConfig, CallbackServer, Command, commands::HELP, format_message};
use msgboard_gateway::{DataGateway, RemoteStore, RestStore};
use msgboard_messages::{BoardError, MessageBoard, MessageVisibility, ensure_profile, profile_directory, schema};

#[derive(Parser)]
#[command(name = "msgboard")]
#[command(about = "Sign in with an OAuth provider and post to a shared message board", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and start the interactive board (default)
    Chat,
    /// Print the SQL tables and row-level policies for a deployment
    Schema {
        /// Who may read messages: `all` signed-in users or `own` author only
        #[arg(long, default_value = "all")]
        visibility: MessageVisibility,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    msgboard_observability::init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Schema { visibility } => {
            print!("{}", schema::deployment_sql(visibility));
            Ok(())
        }
        Commands::Chat => chat().await,
    }
}

async fn chat() -> Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;
    tracing::info!(?config, "configuration loaded");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("building HTTP client")?;

    let credentials = Arc::new(CredentialStore::new());
    let auth = HttpAuthService::new(&config.supabase_url, &config.anon_key).with_client(http.clone());
    let mut flow = AuthFlowController::new(config.provider_config(), auth, credentials.clone());
    let store = RestStore::new(&config.supabase_url, &config.anon_key).with_client(http);
    let board = MessageBoard::new(DataGateway::new(store, credentials.clone()));

    sign_in(&mut flow, &board, &config).await?;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        match Command::parse(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Unknown(cmd) => println!("unknown command '/{cmd}' (try /help)"),
            Command::Post(text) => match board.post(&text).await {
                Ok(message) => println!("posted {}", message.id),
                Err(err) => report(&err),
            },
            Command::List => list(&board).await,
            Command::Refresh => match flow.refresh().await {
                Ok(session) => println!("session renewed until {}", session.expires_at),
                Err(err) => println!("refresh failed: {err}"),
            },
            Command::WhoAmI => match credentials.current() {
                Some(session) => println!(
                    "{} ({}), token valid until {}",
                    session.subject_id,
                    session.email.as_deref().unwrap_or("no email"),
                    session.expires_at
                ),
                None => println!("not signed in"),
            },
            Command::Logout => {
                if flow.sign_out().await {
                    println!("signed out");
                } else {
                    println!("not signed in");
                }
            }
            Command::Login => {
                if let Err(err) = sign_in(&mut flow, &board, &config).await {
                    println!("sign-in failed: {err:#}");
                }
            }
        }
    }

    Ok(())
}

/// Run one browser round trip and bootstrap the profile.
async fn sign_in<A, S>(
    flow: &mut AuthFlowController<A>,
    board: &MessageBoard<S>,
    config: &AppConfig,
) -> Result<Arc<Session>>
where
    A: AuthService,
    S: RemoteStore,
{
    let server = CallbackServer::bind(config.redirect_port)
        .await
        .with_context(|| format!("binding callback listener on port {}", config.redirect_port))?;

    let request = flow.begin();
    println!("Open this URL in your browser to sign in:\n\n  {}\n", request.url);

    let session = match server.wait(config.callback_timeout).await {
        Some(params) => flow.complete(params).await?,
        None => {
            flow.abandon(AuthError::Timeout);
            return Err(AuthError::Timeout.into());
        }
    };

    let profile = ensure_profile(board.gateway(), &session)
        .await
        .context("creating profile")?;
    println!(
        "Signed in as @{}",
        profile.username.as_deref().unwrap_or(session.subject_id.as_str())
    );
    Ok(session)
}

async fn list<S: RemoteStore>(board: &MessageBoard<S>) {
    let messages = match board.list().await {
        Ok(messages) => messages,
        Err(err) => return report(&err),
    };
    if messages.is_empty() {
        println!("(no messages visible)");
        return;
    }

    let profiles = profile_directory(board.gateway()).await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "profiles unavailable; showing author ids");
        Default::default()
    });
    for message in &messages {
        println!("{}", format_message(message, &profiles));
    }
}

fn report(err: &BoardError) {
    if err.is_access_denied() {
        println!("{err} (session expired or signed out? try /refresh or /login)");
    } else {
        println!("{err}");
    }
}
