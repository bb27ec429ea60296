use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;

use jugo_lib::remote::{SocketClient, SocketMessage, SocketState};

use crate::app::App;
use crate::OutputFormat;

fn describe(message: &SocketMessage) -> String {
    match message {
        SocketMessage::AutosaveAck { success: true, chapter_id, words, .. } => match chapter_id {
            Some(id) => format!("autosave ok: chapter {} ({} words)", id, words),
            None => format!("autosave ok ({} words)", words),
        },
        SocketMessage::AutosaveAck { error, .. } => {
            format!("autosave failed: {}", error.as_deref().unwrap_or("unknown error"))
        }
        SocketMessage::AiProgress { task_id, progress, message } => match message {
            Some(m) => format!("task {}: {}% {}", task_id, progress, m),
            None => format!("task {}: {}%", task_id, progress),
        },
        SocketMessage::Error { message, error } => format!(
            "error: {}",
            message.as_deref().or(error.as_deref()).unwrap_or("unknown")
        ),
        SocketMessage::Autosave { chapter_id, .. } => format!("autosave request for chapter {}", chapter_id),
        SocketMessage::Ping => "ping".to_string(),
        SocketMessage::Pong => "pong".to_string(),
    }
}

pub async fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let socket = SocketClient::connect(&app.config.socket, app.config.remote.token.as_deref())
        .context("Failed to open realtime connection")?;
    let mut messages = socket.subscribe();
    let mut state = socket.watch_state();

    loop {
        tokio::select! {
            message = messages.recv() => match message {
                Ok(SocketMessage::Pong) => {}
                Ok(message) => match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string(&message)?),
                    OutputFormat::Plain => println!("{}", describe(&message)),
                },
                Err(RecvError::Lagged(n)) => eprintln!("(skipped {} messages)", n),
                Err(RecvError::Closed) => break,
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                eprintln!("[{:?}]", current);
                if matches!(current, SocketState::GaveUp | SocketState::Closed) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    socket.close().await;
    Ok(())
}
