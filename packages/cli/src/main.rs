mod config;
mod render;

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use client::{ClientError, ClientState, LocalStore, Session, TrackerEvent};
use tracing::{debug, info};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "codeverse", version, about = "CodeVerse judge client")]
struct Cli {
    /// Config file (without extension).
    #[arg(long, global = true, env = "CODEVERSE_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save the session issued by the platform's login.
    Login {
        #[arg(long, env = "CODEVERSE_TOKEN")]
        token: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        user_id: i64,
    },
    /// Forget the saved session.
    Logout,
    /// Show a submission's result.
    Submission {
        id: String,
        /// Follow the submission until judging finishes.
        #[arg(long, short)]
        watch: bool,
    },
    /// List ongoing and upcoming contests.
    Contests,
    /// Register for a contest by id or title and make it current.
    Enter { contest: String },
    /// Show the problems of the current contest.
    Problems,
    /// Show contest standings.
    Leaderboard {
        /// Contest title. Default: the current contest.
        title: Option<String>,
        #[arg(long, short)]
        watch: bool,
    },
    /// Estimate time and space complexity of a source file.
    Analyze { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let store = LocalStore::new(config.store_path());
    debug!(store = %store.path().display(), "Using session store");

    let state = ClientState::new(config.client(), Some(store.clone()))
        .context("Failed to initialize client")?;

    match cli.command {
        Command::Login {
            token,
            username,
            user_id,
        } => {
            let session = Session::new(token).with_user(user_id, username);
            store
                .save_session(&session)
                .await
                .context("Failed to save session")?;
            info!(user_id, "Session saved");
        }
        Command::Logout => {
            store
                .save_session(&Session::anonymous())
                .await
                .context("Failed to clear session")?;
        }
        Command::Submission { id, watch } => {
            let session = load_session(&store).await?;
            show_submission(&state, &id, &session, watch).await?;
        }
        Command::Contests => {
            let contests = state
                .contests
                .list_contests()
                .await
                .map_err(explain)
                .context("Failed to load contests")?;
            print!("{}", render::contests(&contests));
        }
        Command::Enter { contest } => {
            let session = load_session(&store).await?;
            let contests = state
                .contests
                .list_contests()
                .await
                .map_err(explain)
                .context("Failed to load contests")?;
            let Some(selected) = contests
                .iter()
                .find(|c| c.contest_id == contest || c.title == contest)
            else {
                bail!("No contest named {contest}");
            };
            let snapshot = state
                .contests
                .register(&session, selected)
                .await
                .map_err(explain)?;
            print!("{}", render::snapshot(&snapshot));
        }
        Command::Problems => {
            let session = load_session(&store).await?;
            let Some(snapshot) = store.current_contest().await? else {
                bail!("No contest entered yet; run `codeverse enter <contest>` first");
            };
            let problems = state
                .contests
                .load_problems(&session, &snapshot)
                .await
                .map_err(explain)?;
            println!("{}", snapshot.contest_name);
            print!("{}", render::problems(&problems));
        }
        Command::Leaderboard { title, watch } => {
            let title = match title {
                Some(title) => title,
                None => match store.current_contest().await? {
                    Some(snapshot) => snapshot.contest_name,
                    None => bail!("Pass a contest title or enter a contest first"),
                },
            };
            let session = store.session().await?;
            show_leaderboard(&state, &title, session.username.as_deref(), watch).await?;
        }
        Command::Analyze { file } => {
            let code = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            match state.complexity.analyze(&code).await {
                Some(report) => print!("{}", render::complexity(&report)),
                None => println!("Complexity analysis is not available right now"),
            }
        }
    }

    Ok(())
}

async fn load_session(store: &LocalStore) -> anyhow::Result<Session> {
    let session = store.session().await.context("Failed to read session")?;
    if !session.is_authenticated() {
        bail!("Please log in first (`codeverse login`)");
    }
    Ok(session)
}

/// User-facing wording for errors that need an action.
fn explain(err: ClientError) -> anyhow::Error {
    match err {
        ClientError::AuthRequired => anyhow::anyhow!("Session expired. Please log in again."),
        other => anyhow::Error::new(other),
    }
}

async fn show_submission(
    state: &ClientState,
    id: &str,
    session: &Session,
    watch: bool,
) -> anyhow::Result<()> {
    let mut tracker = state.submission_tracker();
    let view = tracker.load(id, session).await.map_err(explain)?;
    print!("{}", render::submission(view));
    if !watch || view.status.is_final() {
        return Ok(());
    }

    loop {
        let next = tokio::select! {
            _ = tokio::signal::ctrl_c() => None,
            event = tracker.next_event() => Some(event),
        };
        let Some(event) = next else {
            tracker.close();
            return Ok(());
        };
        match event {
            Some(TrackerEvent::Updated(view)) => {
                println!(
                    "[{}] {}/{} passed{}",
                    view.status,
                    view.test_cases_passed,
                    view.total_test_cases,
                    view.message.map(|m| format!(" - {m}")).unwrap_or_default()
                );
            }
            Some(TrackerEvent::Notice(notice)) => eprintln!("{notice}"),
            Some(TrackerEvent::Finished(view)) => {
                print!("\n{}", render::submission(&view));
                return Ok(());
            }
            None => return Ok(()),
        }
    }
}

async fn show_leaderboard(
    state: &ClientState,
    title: &str,
    username: Option<&str>,
    watch: bool,
) -> anyhow::Result<()> {
    let mut tracker = state.leaderboard_tracker();
    let view = tracker.load(title).await.map_err(explain)?;
    print!("{}", render::leaderboard(view, username));
    if !watch {
        tracker.close();
        return Ok(());
    }

    loop {
        let next = tokio::select! {
            _ = tokio::signal::ctrl_c() => None,
            event = tracker.next_event() => Some(event),
        };
        let Some(event) = next else {
            tracker.close();
            return Ok(());
        };
        match event {
            Some(TrackerEvent::Updated(view)) | Some(TrackerEvent::Finished(view)) => {
                print!("\n{}", render::leaderboard(&view, username));
            }
            Some(TrackerEvent::Notice(notice)) => eprintln!("{notice}"),
            None => return Ok(()),
        }
    }
}
