use anyhow::{Context, Result};

use jugo_lib::content::{Id, WorkUnit};

use crate::app::App;
use crate::render::terminal::{self, paint, Color};
use crate::OutputFormat;

pub async fn run<U: WorkUnit>(
    app: &App,
    work: &str,
    key: &str,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let editor = app.editor::<U>();
    let work_id = Id::from(work);
    let summary = app.find_unit(&editor, &work_id, key).await?;

    // List entries may omit content; fetch the full unit
    let unit = editor
        .load_unit(&work_id, summary.id())
        .await
        .with_context(|| format!("Failed to load {} {}", U::LABEL, summary.id()))?
        .unwrap_or(summary);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&unit)?);
        }
        OutputFormat::Plain => {
            println!("{}", paint(&unit.heading(), Color::BOLD, use_color));
            let meta = format!(
                "{} {} \u{00b7} {} \u{00b7} {} \u{00b7} updated {}",
                U::LABEL,
                unit.ordinal(),
                unit.measure_label(),
                unit.status(),
                unit.updated_at().format("%Y-%m-%d %H:%M")
            );
            println!("{}", paint(&meta, Color::DIM, use_color));

            let body = terminal::render_content(unit.content(), 80);
            if !body.is_empty() {
                println!();
                println!("{}", body);
            }
        }
    }

    Ok(())
}
