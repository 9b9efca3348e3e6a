//! Reading pane maps, raw pane captures and completion lists from disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use pw_core::{Completion, Settings, coalesce};

/// Pane id → words, as handed to a refresh.
pub type PaneMap = BTreeMap<String, Vec<String>>;

/// Load settings from `path`, or defaults when there is none.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    Settings::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
}

/// Parse `ID=PATH` as given to `--capture`.
pub fn parse_capture(arg: &str) -> std::result::Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((id, path)) if !id.is_empty() && !path.is_empty() => {
            Ok((id.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected ID=PATH, got '{arg}'")),
    }
}

/// Merge a JSON pane map and tokenized captures. A capture replaces the map
/// entry for the same pane.
pub fn load_panes(
    panes: Option<&Path>,
    captures: &[(String, PathBuf)],
    unifying_chars: &str,
) -> Result<PaneMap> {
    let mut map = match panes {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str::<PaneMap>(&content)
                .with_context(|| format!("{} is not a pane map", path.display()))?
        }
        None => PaneMap::new(),
    };

    for (pane_id, path) in captures {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read capture {}", path.display()))?;
        let words = coalesce(&text, unifying_chars);
        tracing::debug!("pane {pane_id}: {} words from {}", words.len(), path.display());
        map.insert(pane_id.clone(), words);
    }

    if map.is_empty() {
        bail!("no panes given: use --panes and/or --capture");
    }
    Ok(map)
}

pub fn load_completions(path: &Path) -> Result<Vec<Completion>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a list of completions", path.display()))
}
