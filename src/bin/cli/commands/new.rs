use anyhow::{Context, Result};

use jugo_lib::content::text::paragraphs_to_html;
use jugo_lib::content::{Id, WorkUnit};

use crate::app::App;
use crate::OutputFormat;

pub async fn run<U: WorkUnit>(
    app: &App,
    work: &str,
    title: &str,
    content: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let editor = app.editor::<U>();
    let work_id = Id::from(work);
    let content = content.filter(|text| !text.trim().is_empty());

    let mut unit = editor
        .create_unit(&work_id, title, content.is_some())
        .await
        .with_context(|| format!("Failed to create {} in work {}", U::LABEL, work_id))?;

    if let Some(text) = content {
        editor.mutate_content(paragraphs_to_html(&text))?;
        editor.save().await.context("Created, but saving the initial text failed")?;
        if let Some(current) = editor.current_unit() {
            unit = current;
        }
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&unit)?);
        }
        OutputFormat::Plain => {
            println!("Created {} \"{}\" in work {}", U::LABEL, unit.heading(), work_id);
            println!("  Position: {}", unit.ordinal());
            println!("  Length: {}", unit.measure_label());
            println!("  ID: {}", unit.id());
        }
    }

    Ok(())
}
