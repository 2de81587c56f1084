use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};

use crate::settings::ConfirmationMapping;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAnswer {
    Input(String),
    TimedOut,
    /// The operator input stream ended.
    Closed,
}

/// Bounded-wait operator annotation.
///
/// Lines arrive on a channel so the wait can be raced against cancellation
/// and tested without a terminal.
pub struct ConfirmationPrompt {
    lines: Mutex<mpsc::Receiver<String>>,
}

impl ConfirmationPrompt {
    pub fn new(lines: mpsc::Receiver<String>) -> Self {
        Self {
            lines: Mutex::new(lines),
        }
    }

    /// Prompt backed by a background task reading stdin line by line.
    pub fn from_stdin() -> Self {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        log::warn!("stdin read failed; confirmations will use defaults: {err}");
                        break;
                    }
                }
            }
        });
        Self::new(rx)
    }

    /// Ask `mapping.question` and turn the answer into a comment.
    ///
    /// `default` is used on timeout or when no input can ever arrive.
    pub async fn ask(
        &self,
        mapping: &ConfirmationMapping,
        default: &str,
        timeout: Duration,
    ) -> String {
        println!("{} ({}s)", mapping.question, timeout.as_secs());

        match self.wait_for_answer(timeout).await {
            PromptAnswer::Input(line) if !line.trim().is_empty() => mapping.on_input.clone(),
            PromptAnswer::Input(_) => mapping.on_empty.clone(),
            PromptAnswer::TimedOut => {
                log::info!("no confirmation within {}s; using '{default}'", timeout.as_secs());
                default.to_string()
            }
            PromptAnswer::Closed => {
                log::warn!("operator input closed; using '{default}'");
                default.to_string()
            }
        }
    }

    pub async fn wait_for_answer(&self, timeout: Duration) -> PromptAnswer {
        let mut lines = self.lines.lock().await;

        // Anything typed before the question was asked belongs to nobody.
        while let Ok(stale) = lines.try_recv() {
            log::debug!("discarding stale operator input {stale:?}");
        }

        match tokio::time::timeout(timeout, lines.recv()).await {
            Ok(Some(line)) => PromptAnswer::Input(line),
            Ok(None) => PromptAnswer::Closed,
            Err(_) => PromptAnswer::TimedOut,
        }
    }
}
