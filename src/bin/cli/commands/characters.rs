use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use jugo_lib::content::text::truncate;
use jugo_lib::content::{Character, CharacterInput, Id};

use crate::app::App;
use crate::render::terminal::rule;
use crate::OutputFormat;

#[derive(Args, Debug, Clone)]
pub struct CharactersArgs {
    /// Screenplay work id
    pub work: String,
    #[command(subcommand)]
    pub action: CharacterAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CharacterAction {
    /// List the characters of a screenplay
    Ls,
    /// Add a character
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Repeat for several traits
        #[arg(long = "trait")]
        traits: Vec<String>,
    },
    /// Change name, description or traits
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Replaces every trait; repeat for several
        #[arg(long = "trait")]
        traits: Vec<String>,
    },
    /// Delete a character
    Rm {
        id: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

fn print_character(character: &Character, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(character)?),
        OutputFormat::Plain => {
            println!("{} (id {})", character.name, character.character_id);
            if !character.description.is_empty() {
                println!("  {}", character.description);
            }
            if !character.traits.is_empty() {
                println!("  Traits: {}", character.traits.join(", "));
            }
        }
    }
    Ok(())
}

pub async fn run(app: &App, args: CharactersArgs, format: &OutputFormat) -> Result<()> {
    let work_id = Id::from(args.work.as_str());

    match args.action {
        CharacterAction::Ls => {
            let characters = app
                .client
                .list_characters(&work_id)
                .await
                .with_context(|| format!("Failed to list characters of work {}", work_id))?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&characters)?),
                OutputFormat::Plain => {
                    if characters.is_empty() {
                        println!("No characters yet.");
                        return Ok(());
                    }
                    println!("{:>6} {:<20} {:>6} {}", "ID", "Name", "Scenes", "Traits");
                    println!("{} {} {} {}", rule(6), rule(20), rule(6), rule(20));
                    for c in &characters {
                        println!(
                            "{:>6} {:<20} {:>6} {}",
                            c.character_id,
                            truncate(&c.name, 20),
                            c.appearance_count,
                            c.traits.join(", ")
                        );
                    }
                }
            }
        }
        CharacterAction::Add { name, description, traits } => {
            let input = CharacterInput {
                name: Some(name),
                description,
                traits: (!traits.is_empty()).then_some(traits),
                ..CharacterInput::default()
            };
            let character = app
                .client
                .create_character(&work_id, &input)
                .await
                .context("Failed to add character")?;
            print_character(&character, format)?;
        }
        CharacterAction::Edit { id, name, description, traits } => {
            let input = CharacterInput {
                name,
                description,
                traits: (!traits.is_empty()).then_some(traits),
                ..CharacterInput::default()
            };
            if input.name.is_none() && input.description.is_none() && input.traits.is_none() {
                bail!("Nothing to change. Pass --name, --description or --trait.");
            }
            let character = app
                .client
                .update_character(&work_id, &Id::from(id.as_str()), &input)
                .await
                .with_context(|| format!("Failed to update character {}", id))?;
            print_character(&character, format)?;
        }
        CharacterAction::Rm { id, yes } => {
            if !yes {
                bail!("This deletes character {} permanently. Re-run with --yes to confirm.", id);
            }
            app.client
                .delete_character(&work_id, &Id::from(id.as_str()))
                .await
                .with_context(|| format!("Failed to delete character {}", id))?;
            match format {
                OutputFormat::Json => {
                    let output = serde_json::json!({ "deleted": id, "workId": work_id });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Plain => println!("Deleted character {}", id),
            }
        }
    }

    Ok(())
}
