mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jugo_lib::content::{Chapter, Scene};

#[derive(Parser)]
#[command(name = "jugo-cli", about = "Write novels and screenplays from the terminal", version)]
struct Cli {
    /// Config file (default: ~/.config/jugo/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API token, overrides config and JUGO_TOKEN
    #[arg(long, global = true)]
    token: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum WorkKind {
    Novel,
    Screenplay,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum StatusArg {
    Draft,
    Writing,
    Completed,
}

#[derive(Subcommand)]
enum Command {
    /// List works
    Works {
        /// Only novels or only screenplays
        #[arg(long = "type")]
        kind: Option<WorkKind>,
        /// Title search
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// List the chapters (or scenes) of a work
    Ls {
        work: String,
        /// Operate on screenplay scenes instead of chapters
        #[arg(long)]
        scenes: bool,
    },

    /// Print a chapter or scene
    Show {
        work: String,
        /// Id or title (case-insensitive prefix match)
        unit: String,
        #[arg(long)]
        scenes: bool,
    },

    /// Append a new chapter or scene
    New {
        work: String,
        /// Chapter title, or scene location
        title: String,
        /// Initial text (use "-" to read from stdin)
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        scenes: bool,
    },

    /// Change title, status or content
    Edit {
        work: String,
        unit: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<StatusArg>,
        /// Replacement text (use "-" to read from stdin)
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        scenes: bool,
    },

    /// Interactive writing session with autosave
    Write {
        work: String,
        unit: String,
        #[arg(long)]
        scenes: bool,
    },

    /// Reorder: list every id in the new order
    Mv {
        work: String,
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
        #[arg(long)]
        scenes: bool,
    },

    /// Delete a chapter or scene
    Rm {
        work: String,
        unit: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
        #[arg(long)]
        scenes: bool,
    },

    /// Run an AI writing operation
    Ai(commands::ai::AiArgs),

    /// Manage screenplay characters
    Characters(commands::characters::CharactersArgs),

    /// Print realtime messages until interrupted
    Listen,
}

/// Call a command generic over the unit type chosen by `--scenes`
macro_rules! per_unit {
    ($scenes:expr, $($cmd:ident)::+ ( $($arg:expr),* $(,)? )) => {
        if $scenes {
            $($cmd)::+::<Scene>($($arg),*).await
        } else {
            $($cmd)::+::<Chapter>($($arg),*).await
        }
    };
}

/// Resolve "-" as stdin, or read piped stdin when no value was given
fn resolve_content(content: Option<String>) -> Option<String> {
    match content.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).ok();
            Some(buf)
        }
        Some(_) => content,
        None => {
            if !std::io::stdin().is_terminal() {
                let mut buf = String::new();
                std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).ok();
                if buf.is_empty() { None } else { Some(buf) }
            } else {
                None
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::new(cli.config.as_deref(), cli.token.clone())?;
    let format = &cli.format;

    match cli.command {
        Command::Works { kind, search, page, limit } => {
            commands::works::run(&app, kind, search, page, limit, format).await?;
        }
        Command::Ls { work, scenes } => {
            per_unit!(scenes, commands::ls::run(&app, &work, format, use_color))?;
        }
        Command::Show { work, unit, scenes } => {
            per_unit!(scenes, commands::show::run(&app, &work, &unit, format, use_color))?;
        }
        Command::New { work, title, content, scenes } => {
            let content = resolve_content(content);
            per_unit!(scenes, commands::new::run(&app, &work, &title, content, format))?;
        }
        Command::Edit { work, unit, title, status, content, scenes } => {
            let content = resolve_content(content);
            per_unit!(
                scenes,
                commands::edit::run(&app, &work, &unit, title, status, content, format)
            )?;
        }
        Command::Write { work, unit, scenes } => {
            per_unit!(scenes, commands::write::run(&app, &work, &unit, use_color))?;
        }
        Command::Mv { work, ids, scenes } => {
            per_unit!(scenes, commands::mv::run(&app, &work, &ids, format))?;
        }
        Command::Rm { work, unit, yes, scenes } => {
            per_unit!(scenes, commands::rm::run(&app, &work, &unit, yes, format))?;
        }
        Command::Ai(args) => {
            let content = resolve_content(args.content.clone());
            commands::ai::run(&app, args, content, format).await?;
        }
        Command::Characters(args) => {
            commands::characters::run(&app, args, format).await?;
        }
        Command::Listen => {
            commands::listen::run(&app, format).await?;
        }
    }

    Ok(())
}
