//! Streaming chat on the terminal
//!
//! Replies are printed by a [`SessionStore`](streamchat_application::SessionStore)
//! listener as deltas arrive; the loop itself only submits input and reports
//! errors and metrics.

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use streamchat_application::{ChatController, StopStreamUseCase, SubmitOutcome};
use streamchat_domain::{ChatMetrics, ChatParams, SessionState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Prints the growing reply of the session it listens to.
#[derive(Debug, Default)]
pub struct ReplyPrinter {
    printed: usize,
}

impl ReplyPrinter {
    /// The part of the current reply not yet printed.
    pub fn pending<'a>(&mut self, state: &'a SessionState) -> Option<&'a str> {
        if !state.is_streaming {
            self.printed = 0;
            return None;
        }
        let content = state.current_stream_content.as_str();
        if content.len() < self.printed {
            self.printed = 0;
        }
        let fresh = content.get(self.printed..).filter(|s| !s.is_empty())?;
        self.printed = content.len();
        Some(fresh)
    }

    fn print(&mut self, state: &SessionState) {
        if let Some(text) = self.pending(state) {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        }
    }
}

/// Terminal front end over a [`ChatController`].
pub struct ChatSession {
    controller: ChatController,
    params: ChatParams,
    show_metrics: bool,
}

impl ChatSession {
    pub fn new(mut controller: ChatController, params: ChatParams) -> Self {
        let mut printer = ReplyPrinter::default();
        controller
            .store_mut()
            .subscribe(move |state: &Arc<SessionState>| printer.print(state));
        Self {
            controller,
            params,
            show_metrics: true,
        }
    }

    pub fn with_metrics(mut self, show: bool) -> Self {
        self.show_metrics = show;
        self
    }

    pub async fn load_history(&mut self) -> usize {
        self.controller.load_history().await
    }

    /// Send one prompt and print the reply. Ctrl-C stops the reply.
    pub async fn ask(&mut self, prompt: &str) -> Result<SubmitOutcome> {
        let interrupt = spawn_interrupt_handler(self.controller.stop_handle(), None);
        let result = self.turn(prompt).await;
        interrupt.abort();
        result
    }

    /// Read prompts from stdin until EOF, `/quit` or Ctrl-C while idle.
    pub async fn run_interactive(&mut self) -> Result<()> {
        let shutdown = CancellationToken::new();
        let interrupt =
            spawn_interrupt_handler(self.controller.stop_handle(), Some(shutdown.clone()));

        self.print_welcome();
        let mut lines = spawn_stdin_reader();

        loop {
            eprint!(">>> ");
            let line = tokio::select! {
                _ = shutdown.cancelled() => break,
                line = lines.recv() => line,
            };
            let Some(line) = line.transpose()? else {
                break;
            };
            let line = line.trim();

            if line.is_empty() {
                continue;
            }
            if line.starts_with('/') {
                if self.handle_command(line).await {
                    break;
                }
                continue;
            }

            if let Err(e) = self.turn(line).await {
                eprintln!("error: {:#}", e);
                self.controller.clear_error();
            }
        }

        interrupt.abort();
        eprintln!();
        Ok(())
    }

    async fn turn(&mut self, prompt: &str) -> Result<SubmitOutcome> {
        let outcome = self.controller.submit(prompt, self.params.clone()).await?;
        println!();
        if outcome.cancelled {
            eprintln!("[stopped]");
        }
        if self.show_metrics {
            eprintln!("{}", format_metrics(&outcome.metrics));
        }
        Ok(outcome)
    }

    /// Returns `true` when the session should end.
    async fn handle_command(&mut self, line: &str) -> bool {
        match line {
            "/quit" | "/exit" | "/q" => return true,
            "/clear" => match self.controller.clear_history().await {
                Ok(()) => eprintln!("History cleared."),
                Err(e) => eprintln!("error: {}", e),
            },
            "/history" => {
                let state = self.controller.state();
                for message in &state.messages {
                    println!("{}", format_message_line(message));
                }
            }
            "/params" => eprintln!(
                "model={} temperature={} max_tokens={}",
                self.params.model, self.params.temperature, self.params.max_tokens
            ),
            "/help" => print_help(),
            other => eprintln!("Unknown command: {} (try /help)", other),
        }
        false
    }

    fn print_welcome(&self) {
        eprintln!("streamchat ({})", self.params.model);
        eprintln!("Type /help for commands, Ctrl-C stops a reply, Ctrl-D exits.");
    }
}

fn print_help() {
    eprintln!("/history  show this session's messages");
    eprintln!("/clear    delete saved history and start over");
    eprintln!("/params   show request parameters");
    eprintln!("/quit     leave");
}

/// Lines of stdin, read on a plain thread so a pending read never holds up
/// runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Ctrl-C stops the active stream; with nothing to stop it cancels
/// `shutdown` (if given).
fn spawn_interrupt_handler(
    stop: StopStreamUseCase,
    shutdown: Option<CancellationToken>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl-C: {}", e);
                return;
            }
            if stop.is_active() {
                stop.execute();
                continue;
            }
            match &shutdown {
                Some(shutdown) => {
                    debug!("Interrupt while idle, shutting down");
                    shutdown.cancel();
                    return;
                }
                None => std::process::exit(130),
            }
        }
    })
}

pub fn format_metrics(metrics: &ChatMetrics) -> String {
    let mut parts = Vec::new();
    if let Some(tokens) = metrics.token_count {
        parts.push(format!("{} tokens", tokens));
    }
    if let Some(latency) = metrics.latency_ms {
        parts.push(format!("first token {} ms", latency));
    }
    if let Some(rate) = metrics.tokens_per_second {
        parts.push(format!("{:.1} tok/s", rate));
    }
    if parts.is_empty() {
        "[no output]".to_string()
    } else {
        format!("[{}]", parts.join(", "))
    }
}

pub fn format_message_line(message: &streamchat_domain::ChatMessage) -> String {
    let local = message.timestamp.with_timezone(&chrono::Local);
    format!(
        "{} {:>9}: {}",
        local.format("%Y-%m-%d %H:%M:%S"),
        message.role.as_str(),
        message.content
    )
}
