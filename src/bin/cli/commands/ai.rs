use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use jugo_lib::content::text::strip_html;
use jugo_lib::content::{Id, WorkType};
use jugo_lib::remote::ai::{
    ContinueRequest, ExpandRequest, NovelToScreenplayRequest, OutlineRequest, PolishRequest,
    RewriteRequest, ScreenplayToNovelRequest,
};
use jugo_lib::remote::{AiOperation, AiOperationKind, TaskState};

use crate::app::App;
use crate::{OutputFormat, WorkKind};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Args, Debug, Clone)]
pub struct AiArgs {
    /// continue, polish, expand, rewrite, outline, novel-to-screenplay, screenplay-to-novel
    pub operation: String,
    pub work: String,
    /// Source text for polish, expand and rewrite; preceding text for continue ("-" reads stdin)
    #[arg(long)]
    pub content: Option<String>,
    /// Target length for continue and expand
    #[arg(long)]
    pub length: Option<u32>,
    #[arg(long)]
    pub style: Option<String>,
    #[arg(long)]
    pub tone: Option<String>,
    #[arg(long)]
    pub focus: Option<String>,
    /// Outline topic
    #[arg(long)]
    pub topic: Option<String>,
    #[arg(long)]
    pub genre: Option<String>,
    /// Chapter count for outline and screenplay-to-novel
    #[arg(long)]
    pub chapters: Option<u32>,
    /// Scene count for novel-to-screenplay
    #[arg(long)]
    pub scene_count: Option<u32>,
    /// Target screenplay duration in minutes
    #[arg(long)]
    pub duration: Option<u32>,
    #[arg(long)]
    pub words_per_chapter: Option<u32>,
    /// Work type sent with continue
    #[arg(long = "type", default_value = "novel")]
    pub kind: WorkKind,
    /// Wait for the task to finish and print its result
    #[arg(long)]
    pub wait: bool,
    /// Seconds to wait with --wait
    #[arg(long, default_value = "300")]
    pub timeout: u64,
}

fn build_operation(kind: AiOperationKind, args: &AiArgs, content: Option<String>) -> Result<AiOperation> {
    let work_id = Id::from(args.work.as_str());
    let text = || content.clone().context("This operation needs --content");

    let operation = match kind {
        AiOperationKind::Continue => AiOperation::Continue(ContinueRequest {
            work_id,
            work_type: match args.kind {
                WorkKind::Novel => WorkType::Novel,
                WorkKind::Screenplay => WorkType::Screenplay,
            },
            context: text()?,
            length: args.length.unwrap_or(500),
            style: args.style.clone(),
        }),
        AiOperationKind::Polish => AiOperation::Polish(PolishRequest {
            work_id,
            content: text()?,
            style: args.style.clone(),
        }),
        AiOperationKind::Expand => AiOperation::Expand(ExpandRequest {
            work_id,
            content: text()?,
            length: args.length.unwrap_or(1000),
            focus: args.focus.clone(),
        }),
        AiOperationKind::Rewrite => AiOperation::Rewrite(RewriteRequest {
            work_id,
            content: text()?,
            style: args.style.clone(),
            tone: args.tone.clone(),
        }),
        AiOperationKind::Outline => AiOperation::Outline(OutlineRequest {
            work_id,
            topic: args.topic.clone().context("outline needs --topic")?,
            genre: args.genre.clone().context("outline needs --genre")?,
            num_chapters: args.chapters.unwrap_or(10),
            style: args.style.clone(),
        }),
        AiOperationKind::NovelToScreenplay => AiOperation::NovelToScreenplay(NovelToScreenplayRequest {
            work_id,
            target_duration: args.duration,
            num_scenes: args.scene_count,
        }),
        AiOperationKind::ScreenplayToNovel => AiOperation::ScreenplayToNovel(ScreenplayToNovelRequest {
            work_id,
            num_chapters: args.chapters,
            word_per_chapter: args.words_per_chapter,
        }),
    };
    Ok(operation)
}

pub async fn run(app: &App, args: AiArgs, content: Option<String>, format: &OutputFormat) -> Result<()> {
    let kind: AiOperationKind = args.operation.parse()?;
    let operation = build_operation(kind, &args, content)?;

    let task = app
        .client
        .submit_ai(&operation)
        .await
        .with_context(|| format!("Failed to submit {}", kind))?;

    if !args.wait {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&task)?),
            OutputFormat::Plain => {
                println!("Submitted {} as task {}", kind, task.task_id);
                if let Some(secs) = task.estimated_time {
                    println!("  Estimated time: {}s", secs);
                }
            }
        }
        return Ok(());
    }

    let status = app
        .client
        .wait_for_task(&task.task_id, POLL_INTERVAL, Duration::from_secs(args.timeout))
        .await
        .with_context(|| format!("Task {} did not finish", task.task_id))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Plain => match status.status {
            TaskState::Completed => println!("{}", strip_html(status.result.as_deref().unwrap_or(""))),
            _ => bail!(
                "Task {} failed: {}",
                status.task_id,
                status.error.as_deref().unwrap_or("no reason given")
            ),
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: AiArgs,
    }

    fn args(argv: &[&str]) -> AiArgs {
        let mut full = vec!["ai"];
        full.extend_from_slice(argv);
        Wrapper::parse_from(full).args
    }

    #[test]
    fn test_build_polish_requires_content() {
        let a = args(&["polish", "3"]);
        assert!(build_operation(AiOperationKind::Polish, &a, None).is_err());
        let op = build_operation(AiOperationKind::Polish, &a, Some("text".into())).unwrap();
        assert_eq!(op.kind(), AiOperationKind::Polish);
    }

    #[test]
    fn test_build_outline_uses_flags() {
        let a = args(&["outline", "3", "--topic", "A lighthouse keeper", "--genre", "mystery", "--chapters", "12"]);
        match build_operation(AiOperationKind::Outline, &a, None).unwrap() {
            AiOperation::Outline(req) => {
                assert_eq!(req.num_chapters, 12);
                assert_eq!(req.genre, "mystery");
            }
            other => panic!("unexpected operation: {:?}", other),
        }
    }
}
