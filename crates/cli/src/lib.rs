// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tally: console front-end for the tally sync engine.
//!
//! Wires the engine to a WebSocket push channel and an HTTP pull
//! fallback, then reads line commands from stdin:
//!
//! - [`console`] - command parsing and help text
//! - [`display`] - rendering of topic views
//! - [`http`] - the HTTP [`PullSource`](tally_sync::PullSource)

mod cli;
pub mod colors;
pub mod console;
pub mod display;
pub mod error;
pub mod http;

use std::io::Write;
use std::sync::Arc;

use tally_core::SessionEvent;
use tally_sync::{Config, SyncEngine, SyncHandle, TransportFactory, WebSocketTransport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use cli::Cli;
pub use console::ConsoleCommand;
pub use error::{Error, Result};
pub use http::HttpPullSource;

/// Whether the input loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Executes console commands against a running engine.
pub struct Console {
    handle: SyncHandle,
    session: mpsc::Sender<SessionEvent>,
    color: bool,
}

impl Console {
    pub fn new(handle: SyncHandle, session: mpsc::Sender<SessionEvent>, color: bool) -> Self {
        Console {
            handle,
            session,
            color,
        }
    }

    pub async fn execute(&self, command: ConsoleCommand, out: &mut impl Write) -> Result<Flow> {
        match command {
            ConsoleCommand::Login(user) => self.signal(SessionEvent::logged_in(user)).await?,
            ConsoleCommand::Logout => self.signal(SessionEvent::LoggedOut).await?,
            ConsoleCommand::Refresh { topic, params } => {
                let view = self
                    .handle
                    .topic(&topic)
                    .ok_or_else(|| Error::UnknownTopic(topic.clone()))?;
                view.refresh(params);
            }
            ConsoleCommand::Show(Some(topic)) => self.show(&topic, out)?,
            ConsoleCommand::Show(None) => {
                for topic in self.handle.topics() {
                    self.show(topic, out)?;
                }
            }
            ConsoleCommand::Status => {
                let user = self.handle.user();
                let status =
                    display::status(&self.handle.connection_status(), user.as_ref(), self.color);
                writeln!(out, "{status}")?;
            }
            ConsoleCommand::Help => {
                writeln!(out, "{}", colors::examples(console::HELP, self.color))?;
            }
            ConsoleCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn show(&self, topic: &str, out: &mut impl Write) -> Result<()> {
        let view = self
            .handle
            .topic(topic)
            .ok_or_else(|| Error::UnknownTopic(topic.to_string()))?;
        writeln!(out, "{}", display::topic(topic, &view.get(), self.color))?;
        Ok(())
    }

    async fn signal(&self, event: SessionEvent) -> Result<()> {
        self.session
            .send(event)
            .await
            .map_err(|_| Error::Sync(tally_sync::Error::EngineStopped))
    }
}

/// Run the console until `quit` or end of input.
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    tracing::info!(
        push = %config.push.url,
        pull = %config.pull.base_url,
        topics = config.topics.len(),
        "starting"
    );

    let color = colors::should_colorize();
    let pull = Arc::new(HttpPullSource::new(&config.pull)?);
    let factory: TransportFactory<WebSocketTransport> = Arc::new(WebSocketTransport::new);
    let (session_tx, session_rx) = mpsc::channel(16);
    let (handle, engine) = SyncEngine::spawn(config, factory, pull, session_rx)?;

    let watchers = if cli.watch {
        spawn_watchers(&handle, color)
    } else {
        Vec::new()
    };

    let console = Console::new(handle, session_tx, color);
    if let Some(user) = cli.user {
        console.execute(ConsoleCommand::Login(user), &mut std::io::stdout()).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match console::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        match console.execute(command, &mut std::io::stdout()).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e @ Error::Sync(tally_sync::Error::EngineStopped)) => return Err(e),
            Err(e) => eprintln!("error: {e}"),
        }
    }

    // Closing the session channel stops the engine.
    drop(console);
    if let Err(e) = engine.await {
        tracing::error!(error = %e, "sync engine task failed");
    }
    for watcher in watchers {
        watcher.abort();
    }
    Ok(())
}

/// Print every published state change of every topic.
fn spawn_watchers(handle: &SyncHandle, color: bool) -> Vec<JoinHandle<()>> {
    handle
        .topics()
        .filter_map(|name| handle.topic(name))
        .map(|mut view| {
            tokio::spawn(async move {
                while let Ok(state) = view.changed().await {
                    println!("{}", display::topic(view.name(), &state, color));
                }
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
