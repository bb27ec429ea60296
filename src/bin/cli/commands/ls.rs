use anyhow::{Context, Result};

use jugo_lib::content::text::truncate;
use jugo_lib::content::{Id, UnitStatus, WorkUnit};

use crate::app::App;
use crate::render::terminal::{paint, rule, Color};
use crate::OutputFormat;

pub async fn run<U: WorkUnit>(app: &App, work: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let editor = app.editor::<U>();
    let work_id = Id::from(work);
    let units = editor
        .list_units(&work_id)
        .await
        .with_context(|| format!("Failed to list {}s of work {}", U::LABEL, work_id))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&units)?);
        }
        OutputFormat::Plain => {
            if units.is_empty() {
                println!("No {}s yet.", U::LABEL);
                return Ok(());
            }

            let heading_width = units
                .iter()
                .map(|u| u.heading().chars().count())
                .max()
                .unwrap_or(7)
                .clamp(7, 48);

            println!(
                "{:>3} {:>6} {:<head_w$} {:>12} {:<9} {}",
                "#", "ID", "Heading", "Length", "Status", "Updated",
                head_w = heading_width
            );
            println!(
                "{} {} {} {} {} {}",
                rule(3),
                rule(6),
                rule(heading_width),
                rule(12),
                rule(9),
                rule(10)
            );

            for unit in &units {
                let status = unit.status().to_string();
                let status = format!("{:<9}", status);
                let status = match unit.status() {
                    UnitStatus::Completed => paint(&status, Color::GREEN, use_color),
                    _ => status,
                };
                println!(
                    "{:>3} {:>6} {:<head_w$} {:>12} {} {}",
                    unit.ordinal(),
                    unit.id(),
                    truncate(&unit.heading(), heading_width),
                    unit.measure_label(),
                    status,
                    unit.updated_at().format("%Y-%m-%d"),
                    head_w = heading_width
                );
            }

            println!("\n{} {}s total", units.len(), U::LABEL);
        }
    }

    Ok(())
}
