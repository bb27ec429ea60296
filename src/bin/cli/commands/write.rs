//! Interactive writing session.
//!
//! Each input line is appended to the unit as a paragraph. The editor
//! autosaves on the configured interval; `:w` saves now, `:q` saves and
//! quits, `:q!` quits and drops unsaved text.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use jugo_lib::content::text::paragraphs_to_html;
use jugo_lib::content::{Id, WorkUnit};
use jugo_lib::editor::start_autosave;

use crate::app::{App, Editor};
use crate::render::terminal::{self, paint, Color};

enum Input {
    Text(String),
    Save,
    Sync,
    Status,
    Undo,
    Quit { save: bool },
    Help,
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        ":w" => Input::Save,
        ":sync" => Input::Sync,
        ":status" => Input::Status,
        ":u" => Input::Undo,
        ":q" | ":wq" => Input::Quit { save: true },
        ":q!" => Input::Quit { save: false },
        ":help" | ":h" => Input::Help,
        _ => Input::Text(line.to_string()),
    }
}

/// Drop the last `<p>` paragraph
fn without_last_paragraph(content: &str) -> String {
    match content.rfind("<p>") {
        Some(start) => content[..start].to_string(),
        None => String::new(),
    }
}

pub async fn run<U: WorkUnit>(app: &App, work: &str, key: &str, use_color: bool) -> Result<()> {
    let editor: Editor<U> = app.editor();
    let work_id = Id::from(work);
    let summary = app.find_unit(&editor, &work_id, key).await?;
    let unit = editor
        .load_unit(&work_id, summary.id())
        .await
        .with_context(|| format!("Failed to load {} {}", U::LABEL, summary.id()))?
        .context("Load was superseded")?;

    println!("{}", paint(&unit.heading(), Color::BOLD, use_color));
    let body = terminal::render_content(unit.content(), 80);
    if !body.is_empty() {
        println!("{}", body);
    }
    println!(
        "{}",
        paint(
            "Type to append paragraphs. :w save, :u undo, :status, :q save and quit, :q! discard",
            Color::DIM,
            use_color
        )
    );

    let mut content = unit.content().to_string();
    let mut notices = editor.notices();
    let autosave = start_autosave(editor.clone(), app.config.editor.autosave_interval())?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let save_on_exit = loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    // EOF behaves like :q
                    break true;
                };
                match parse_input(&line) {
                    Input::Text(text) => {
                        if text.trim().is_empty() {
                            continue;
                        }
                        content.push_str(&paragraphs_to_html(&text));
                        editor.mutate_content(content.clone())?;
                    }
                    Input::Undo => {
                        content = without_last_paragraph(&content);
                        editor.mutate_content(content.clone())?;
                    }
                    Input::Save => {
                        // Errors arrive as notices
                        let _ = editor.save().await;
                    }
                    Input::Sync => autosave.save_now(),
                    Input::Status => {
                        let status = editor.status();
                        let length = status
                            .current
                            .as_ref()
                            .map(|u| u.measure_label())
                            .unwrap_or_default();
                        println!("{} {}", length, terminal::render_status(&status));
                    }
                    Input::Help => {
                        println!(":w save  :sync background save  :u undo last paragraph  :status  :q save and quit  :q! quit without saving");
                    }
                    Input::Quit { save } => {
                        if !save && editor.has_unsaved_changes() {
                            println!("{}", paint("Discarded unsaved changes.", Color::YELLOW, use_color));
                        }
                        break save;
                    }
                }
            }
            notice = notices.recv() => match notice {
                Ok(notice) => println!("{}", terminal::render_notice(&notice, use_color)),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break true,
            },
        }
    };

    // A tick still running finishes before the final save starts
    autosave.stop().await;
    if save_on_exit {
        save_before_exit(&editor).await;
    }
    Ok(())
}

async fn save_before_exit<U: WorkUnit>(editor: &Editor<U>) {
    if !editor.has_unsaved_changes() {
        return;
    }
    match editor.flush().await {
        Ok(true) => println!("Saved."),
        Ok(false) => eprintln!("Unsaved changes were not saved: the {} was closed.", U::LABEL),
        Err(e) => eprintln!("Could not save before exit: {}", e),
    }
}
