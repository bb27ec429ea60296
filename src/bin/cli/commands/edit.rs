use anyhow::{bail, Context, Result};

use jugo_lib::content::text::paragraphs_to_html;
use jugo_lib::content::{Id, UnitPatch, UnitStatus, WorkUnit};

use crate::app::App;
use crate::{OutputFormat, StatusArg};

pub async fn run<U: WorkUnit>(
    app: &App,
    work: &str,
    key: &str,
    title: Option<String>,
    status: Option<StatusArg>,
    content: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    if title.is_none() && status.is_none() && content.is_none() {
        bail!("Nothing to change. Pass --title, --status or --content.");
    }

    let editor = app.editor::<U>();
    let work_id = Id::from(work);
    let mut unit = app.find_unit(&editor, &work_id, key).await?;
    let unit_id = unit.id().clone();

    if title.is_some() || status.is_some() {
        let patch = UnitPatch {
            title,
            status: status.map(|s| match s {
                StatusArg::Draft => UnitStatus::Draft,
                StatusArg::Writing => UnitStatus::Writing,
                StatusArg::Completed => UnitStatus::Completed,
            }),
            ..UnitPatch::default()
        };
        unit = editor
            .update_unit(&work_id, &unit_id, &patch)
            .await
            .with_context(|| format!("Failed to update {} {}", U::LABEL, unit_id))?;
    }

    if let Some(text) = content {
        editor
            .load_unit(&work_id, &unit_id)
            .await
            .with_context(|| format!("Failed to load {} {}", U::LABEL, unit_id))?;
        editor.mutate_content(paragraphs_to_html(&text))?;
        editor.save().await.context("Failed to save content")?;
        if let Some(current) = editor.current_unit() {
            unit = current;
        }
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&unit)?);
        }
        OutputFormat::Plain => {
            println!("Updated {} \"{}\"", U::LABEL, unit.heading());
            println!("  Status: {}", unit.status());
            println!("  Length: {}", unit.measure_label());
        }
    }

    Ok(())
}
