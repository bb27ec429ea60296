use std::path::Path;

use anyhow::{bail, Context, Result};

use jugo_lib::config::AppConfig;
use jugo_lib::content::{Id, WorkUnit};
use jugo_lib::editor::EditorController;
use jugo_lib::remote::{RemoteClient, RestUnits};

pub type Editor<U> = EditorController<RestUnits<U>>;

/// Shared state for CLI commands
pub struct App {
    pub config: AppConfig,
    pub client: RemoteClient,
}

impl App {
    pub fn new(config_path: Option<&Path>, token: Option<String>) -> Result<Self> {
        let mut config = AppConfig::resolve(config_path).context("Failed to load configuration")?;
        if let Some(token) = token {
            config.remote.token = Some(token);
        }

        let client = RemoteClient::new(&config.remote).context("Failed to create HTTP client")?;
        log::debug!("CLI: using {}", client.base_url());

        Ok(Self { config, client })
    }

    /// A fresh editor controller for one unit type
    pub fn editor<U: WorkUnit>(&self) -> Editor<U> {
        EditorController::new(RestUnits::new(self.client.clone()))
    }

    /// Find a unit by id, then by heading (case-insensitive, exact before prefix)
    pub async fn find_unit<U: WorkUnit>(&self, editor: &Editor<U>, work_id: &Id, key: &str) -> Result<U> {
        let units = editor
            .list_units(work_id)
            .await
            .with_context(|| format!("Failed to list {}s of work {}", U::LABEL, work_id))?;

        if let Some(unit) = units.iter().find(|u| u.id().as_str() == key) {
            return Ok(unit.clone());
        }

        let key_lower = key.to_lowercase();
        if let Some(unit) = units.iter().find(|u| u.heading().to_lowercase() == key_lower) {
            return Ok(unit.clone());
        }

        let matches: Vec<&U> = units
            .iter()
            .filter(|u| u.heading().to_lowercase().starts_with(&key_lower))
            .collect();

        let listing = |list: &[&U]| {
            list.iter()
                .map(|u| format!("  {:>3}  {}", u.id(), u.heading()))
                .collect::<Vec<_>>()
                .join("\n")
        };

        match matches.len() {
            0 => bail!(
                "No {} matching '{}'. Available:\n{}",
                U::LABEL,
                key,
                listing(&units.iter().collect::<Vec<_>>())
            ),
            1 => Ok(matches[0].clone()),
            _ => bail!("Ambiguous {} '{}'. Matches:\n{}", U::LABEL, key, listing(&matches)),
        }
    }
}
