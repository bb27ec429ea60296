use anyhow::{Context, Result};

use jugo_lib::content::{Id, WorkUnit};

use crate::app::App;
use crate::OutputFormat;

pub async fn run<U: WorkUnit>(app: &App, work: &str, ids: &[String], format: &OutputFormat) -> Result<()> {
    let editor = app.editor::<U>();
    let work_id = Id::from(work);
    let ids: Vec<Id> = ids.iter().map(|id| Id::from(id.as_str())).collect();

    let units = editor
        .reorder(&work_id, &ids)
        .await
        .with_context(|| format!("Failed to reorder {}s of work {}", U::LABEL, work_id))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&units)?);
        }
        OutputFormat::Plain => {
            println!("New order:");
            for unit in &units {
                println!("  {:>3}. {}", unit.ordinal(), unit.heading());
            }
        }
    }

    Ok(())
}
