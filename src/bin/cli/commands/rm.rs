use anyhow::{bail, Context, Result};

use jugo_lib::content::{Id, WorkUnit};

use crate::app::App;
use crate::OutputFormat;

pub async fn run<U: WorkUnit>(app: &App, work: &str, key: &str, yes: bool, format: &OutputFormat) -> Result<()> {
    let editor = app.editor::<U>();
    let work_id = Id::from(work);
    let unit = app.find_unit(&editor, &work_id, key).await?;

    if !yes {
        bail!(
            "This deletes {} \"{}\" permanently. Re-run with --yes to confirm.",
            U::LABEL,
            unit.heading()
        );
    }

    editor
        .delete_unit(&work_id, unit.id())
        .await
        .with_context(|| format!("Failed to delete {} {}", U::LABEL, unit.id()))?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "deleted": unit.id(), "workId": work_id });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Deleted {} \"{}\"", U::LABEL, unit.heading());
        }
    }

    Ok(())
}
