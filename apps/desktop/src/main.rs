use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, prepare_session_file},
    AssetHandle, ContentGateway, GatewayError, HttpContentGateway, PostQuery, QueryCatalog,
    RemoteQuery, SubmissionError, UploadForm, UploadTransaction, DEFAULT_LATEST_LIMIT,
};
use shared::domain::{AssetKind, PostRecord, SessionToken, UserId};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Share short videos with generated-art prompts")]
struct Cli {
    /// Overrides the platform endpoint from settings.
    #[arg(long)]
    endpoint: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        username: String,
    },
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Whoami,
    SignOut,
    /// Every post, unordered.
    Feed,
    Latest {
        #[arg(long, default_value_t = DEFAULT_LATEST_LIMIT)]
        limit: u32,
    },
    /// Posts created by the signed-in user.
    Mine,
    Search {
        query: String,
    },
    Upload {
        #[arg(long)]
        title: String,
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        thumbnail: PathBuf,
        #[arg(long)]
        video: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(endpoint) = cli.endpoint {
        settings.endpoint = endpoint;
    }
    let session_file = prepare_session_file(&settings)?;
    let gateway = Arc::new(HttpContentGateway::new(settings)?);
    gateway.set_session(read_session(&session_file)).await;
    let catalog = QueryCatalog::new(gateway.clone());

    match cli.command {
        Command::SignUp {
            email,
            password,
            username,
        } => {
            let token = gateway
                .create_account(&email, &password, &username)
                .await
                .map_err(describe_gateway_error)?;
            write_session(&session_file, &token)?;
            println!("signed up as {username} (account {})", token.account_id);
        }
        Command::SignIn { email, password } => {
            let token = gateway
                .create_session(&email, &password)
                .await
                .map_err(describe_gateway_error)?;
            write_session(&session_file, &token)?;
            println!("signed in (account {})", token.account_id);
        }
        Command::Whoami => {
            let account = gateway
                .current_account()
                .await
                .map_err(describe_gateway_error)?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Command::SignOut => {
            if let Err(err) = gateway.delete_session().await {
                warn!(error = %err, "desktop: platform did not close the session");
            }
            if session_file.exists() {
                fs::remove_file(&session_file).with_context(|| {
                    format!("failed to remove session file '{}'", session_file.display())
                })?;
            }
            println!("signed out");
        }
        Command::Feed => print_posts(catalog.all()).await?,
        Command::Latest { limit } => print_posts(catalog.latest(limit)).await?,
        Command::Mine => {
            let owner = signed_in_owner(gateway.as_ref()).await?;
            print_posts(catalog.by_owner(&owner)).await?;
        }
        Command::Search { query } => print_posts(catalog.search(&query)).await?,
        Command::Upload {
            title,
            prompt,
            thumbnail,
            video,
        } => {
            let owner_id = signed_in_owner(gateway.as_ref()).await?;
            let mut form = UploadForm {
                title,
                prompt,
                thumbnail: Some(checked_asset(thumbnail, AssetKind::Image)?),
                video: Some(checked_asset(video, AssetKind::Video)?),
                owner_id,
            };
            let transaction = UploadTransaction::new(gateway.clone());
            let result = transaction.submit(&form).await;
            form.reset();
            match result {
                Ok(post) => {
                    info!(post_id = %post.id, "desktop: post published");
                    println!("{}", serde_json::to_string_pretty(&post)?);
                }
                Err(err) => return Err(describe_submission_error(err)),
            }
        }
    }

    Ok(())
}

async fn print_posts(query: PostQuery) -> Result<()> {
    let name = query.name();
    let posts = RemoteQuery::new(query);
    let state = posts.settled().await;
    if let Some(err) = state.error {
        return Err(anyhow!("{name} query failed: {}", describe_gateway_error(err)));
    }
    let posts: Vec<PostRecord> = state.value.unwrap_or_default();
    println!("{}", serde_json::to_string_pretty(&posts)?);
    Ok(())
}

async fn signed_in_owner(gateway: &dyn ContentGateway) -> Result<UserId> {
    let account = gateway
        .current_account()
        .await
        .map_err(describe_gateway_error)?;
    account
        .owner_id()
        .cloned()
        .ok_or_else(|| anyhow!("account {} has no profile", account.account_id))
}

fn checked_asset(path: PathBuf, kind: AssetKind) -> Result<AssetHandle> {
    let asset = AssetHandle::for_kind(&path, kind);
    if !kind.accepts(&asset.mime_type) {
        bail!(
            "{} is {}; {} uploads accept {}",
            path.display(),
            asset.mime_type,
            kind.as_str(),
            kind.accepted_mime_types().join(", ")
        );
    }
    Ok(asset)
}

fn read_session(path: &Path) -> Option<SessionToken> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(token) => Some(token),
        Err(err) => {
            warn!(error = %err, path = %path.display(), "desktop: ignoring unreadable session file");
            None
        }
    }
}

fn write_session(path: &Path, token: &SessionToken) -> Result<()> {
    let raw = serde_json::to_string_pretty(token)?;
    fs::write(path, raw)
        .with_context(|| format!("failed to write session file '{}'", path.display()))
}

fn describe_gateway_error(err: GatewayError) -> anyhow::Error {
    match err {
        GatewayError::Auth(message) => {
            anyhow!("not signed in or credentials rejected: {message}")
        }
        other => anyhow::Error::new(other),
    }
}

fn describe_submission_error(err: SubmissionError) -> anyhow::Error {
    let orphans = err.may_leave_orphans();
    let err = anyhow::Error::new(err);
    if orphans {
        err.context("publishing failed; uploaded files may remain in storage")
    } else {
        err.context("publishing failed")
    }
}
