use anyhow::{Context, Result};

use jugo_lib::content::text::{format_number, truncate};
use jugo_lib::content::{WorkQuery, WorkType};

use crate::app::App;
use crate::render::terminal::rule;
use crate::{OutputFormat, WorkKind};

pub async fn run(
    app: &App,
    kind: Option<WorkKind>,
    search: Option<String>,
    page: u32,
    limit: u32,
    format: &OutputFormat,
) -> Result<()> {
    let work_type = match kind {
        Some(WorkKind::Novel) => "novel",
        Some(WorkKind::Screenplay) => "screenplay",
        None => "all",
    };
    let query = WorkQuery {
        work_type: work_type.to_string(),
        page,
        limit,
        search,
        ..WorkQuery::default()
    };

    let list = app.client.list_works(&query).await.context("Failed to list works")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        OutputFormat::Plain => {
            if list.works.is_empty() {
                println!("No works found.");
                return Ok(());
            }

            let title_width = list
                .works
                .iter()
                .map(|w| w.title.chars().count())
                .max()
                .unwrap_or(5)
                .clamp(5, 40);

            println!(
                "{:>6} {:<title_w$} {:<10} {:<9} {:>10} {}",
                "ID", "Title", "Type", "Status", "Words", "Updated",
                title_w = title_width
            );
            println!(
                "{} {} {} {} {} {}",
                rule(6),
                rule(title_width),
                rule(10),
                rule(9),
                rule(10),
                rule(10)
            );

            for work in &list.works {
                let kind = match work.work_type {
                    WorkType::Novel => "novel",
                    WorkType::Screenplay => "screenplay",
                };
                let status = format!("{:?}", work.status).to_lowercase();
                println!(
                    "{:>6} {:<title_w$} {:<10} {:<9} {:>10} {}",
                    work.work_id,
                    truncate(&work.title, title_width),
                    kind,
                    status,
                    format_number(u64::from(work.words)),
                    work.updated_at.format("%Y-%m-%d"),
                    title_w = title_width
                );
            }

            let p = &list.pagination;
            println!("\nPage {} of {} ({} works total)", p.page, p.total_pages.max(1), p.total);
        }
    }

    Ok(())
}
