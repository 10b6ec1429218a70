use std::{future::Future, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    load_settings, AgentEndpoint, ControllerEvent, ControllerState, HttpAgentEndpoint,
    QueryController, SessionHandle, SessionProvider, SubmitOutcome,
};
use shared::domain::{Session, SessionState, UserIdentity, DEFAULT_AGENT_ID};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod render;

const QUIT_COMMAND: &str = ":quit";

#[derive(Parser, Debug)]
#[command(name = "maps-agent", about = "Ask the location agent a question")]
struct Args {
    /// Agent service base URL; overrides API_URL and agent_client.toml.
    #[arg(long)]
    api_url: Option<String>,
    /// Bearer token of the signed-in user; falls back to AGENT_TOKEN.
    #[arg(long)]
    token: Option<String>,
    /// Email or id of the signed-in user.
    #[arg(long, default_value = "local")]
    user: String,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Print the final state as JSON instead of text.
    #[arg(long)]
    json: bool,
    /// Query to run once. Without it, queries are read from stdin.
    query: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = args.api_url.clone() {
        settings.api_base_url = Some(url);
    }
    if let Some(secs) = args.timeout_secs.filter(|secs| *secs > 0) {
        settings.request_timeout_secs = secs;
    }

    let endpoint = HttpAgentEndpoint::from_settings(&settings, DEFAULT_AGENT_ID)
        .context("invalid agent client configuration")?
        .map(|endpoint| Arc::new(endpoint) as Arc<dyn AgentEndpoint>);
    if endpoint.is_none() {
        info!("no API URL configured; queries will be rejected");
    }

    let session = SessionHandle::new(session_from_args(&args));
    let controller = QueryController::new(Arc::new(session.clone()), endpoint);

    if args.query.is_empty() {
        run_interactive(&controller, &session).await?;
        return Ok(ExitCode::SUCCESS);
    }

    controller.set_query(args.query.join(" ")).await;
    controller.submit().await;
    let state = controller.state().await;
    print_state(&state, &session.current(), args.json)?;

    Ok(if state.error.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn session_from_args(args: &Args) -> SessionState {
    let token = args
        .token
        .clone()
        .or_else(|| std::env::var("AGENT_TOKEN").ok())
        .filter(|token| !token.trim().is_empty());

    let Some(token) = token else {
        return SessionState::Unauthenticated;
    };

    let user = if args.user.contains('@') {
        UserIdentity::Email(args.user.clone())
    } else {
        UserIdentity::Id(args.user.clone())
    };
    SessionState::Authenticated(Session::new(user, token))
}

fn print_state(state: &ControllerState, session: &SessionState, json: bool) -> Result<()> {
    if json {
        let body = serde_json::json!({
            "query": state.query,
            "result": state.result,
            "error": state.error,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        for line in render::render(state, session) {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_interactive(controller: &QueryController, session: &SessionHandle) -> Result<()> {
    tokio::spawn(watch_progress(controller.subscribe(), || {
        eprintln!("{}", render::SEARCHING)
    }));

    print_state(&controller.state().await, &session.current(), false)?;

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let exit = query_loop(
        controller,
        session,
        BufReader::new(tokio::io::stdin()),
        shutdown,
    )
    .await?;
    if let LoopExit::Interrupted(pending) = exit {
        // The controller is closed, so a late reply is discarded.
        debug!(finished = pending.is_finished(), "leaving in-flight query behind");
    }
    Ok(())
}

/// Calls `on_start` for every submission that begins, until the controller
/// goes away. Falling behind skips events but keeps watching.
async fn watch_progress(
    mut events: broadcast::Receiver<ControllerEvent>,
    mut on_start: impl FnMut(),
) {
    loop {
        match events.recv().await {
            Ok(ControllerEvent::SubmissionStarted { .. }) => on_start(),
            Ok(ControllerEvent::SubmissionFinished { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "progress printer fell behind controller events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

enum LoopExit {
    Finished,
    Interrupted(JoinHandle<SubmitOutcome>),
}

/// Reads one query per line until EOF, `:quit`, or `shutdown` resolves.
/// `shutdown` is polled while waiting for input and while a query is in
/// flight; either way the controller is closed before returning.
async fn query_loop<R>(
    controller: &QueryController,
    session: &SessionHandle,
    reader: R,
    shutdown: impl Future<Output = ()>,
) -> Result<LoopExit>
where
    R: AsyncBufRead + Unpin,
{
    tokio::pin!(shutdown);
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read query from stdin")?,
            _ = &mut shutdown => None,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        if line.trim() == QUIT_COMMAND {
            break;
        }

        controller.set_query(line).await;
        let mut pending = controller.spawn_submit();
        tokio::select! {
            joined = &mut pending => {
                joined.context("query task failed")?;
            }
            _ = &mut shutdown => {
                info!("interrupted while a query was in flight");
                controller.close().await;
                return Ok(LoopExit::Interrupted(pending));
            }
        }
        print_state(&controller.state().await, &session.current(), false)?;
        controller.set_query("").await;
    }

    controller.close().await;
    Ok(LoopExit::Finished)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
