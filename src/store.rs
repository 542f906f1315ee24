use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::Event;

/// On-disk document: a single `events` key holding every known event in
/// first-seen order. Loaded and saved wholesale.
#[derive(Serialize, Deserialize, Default)]
struct StoreFile {
    events: Vec<Event>,
}

/// Loads the store. A missing or malformed file yields an empty store; a
/// scrape run always proceeds from whatever state can be recovered.
pub fn load(path: &Path) -> Vec<Event> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => {
            info!(
                "{} not found, starting with an empty event list",
                path.display()
            );
            return Vec::new();
        }
    };
    match serde_json::from_str::<StoreFile>(&contents) {
        Ok(file) => {
            info!("loaded {} events from {}", file.events.len(), path.display());
            file.events
        }
        Err(err) => {
            warn!("could not parse {}: {err}; starting fresh", path.display());
            Vec::new()
        }
    }
}

pub fn save(path: &Path, events: &[Event]) -> Result<()> {
    let file = StoreFile {
        events: events.to_vec(),
    };
    let contents = serde_json::to_string_pretty(&file).context("store serialization")?;
    fs::write(path, contents).with_context(|| format!("unable to write {}", path.display()))?;
    info!("saved {} events to {}", events.len(), path.display());
    Ok(())
}
