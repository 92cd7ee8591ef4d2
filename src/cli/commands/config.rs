//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

/// Run the config command.
///
/// `config_path` is the file given with `--config`, if any.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: Option<PathBuf>) -> Result<()> {
    let config_path = config_path.unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let updated = set_value(&settings, key, value)?;
            updated.save_to(&config_path)?;
            Output::success(&format!("Set {} = {} in {}", key, value, config_path.display()));
        }

        ConfigAction::Edit => {
            // Create default config if it doesn't exist
            if !config_path.exists() {
                settings.save_to(&config_path)?;
                Output::info(&format!("Created default config at {:?}", config_path));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());

            Output::info(&format!("Opening config in {}...", editor));

            let status = std::process::Command::new(&editor)
                .arg(&config_path)
                .status();

            match status {
                Ok(s) if s.success() => {
                    Output::success("Config saved.");
                }
                Ok(_) => {
                    Output::warning("Editor exited with non-zero status.");
                }
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", config_path));
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Apply a dotted `key = value` assignment, parsing `value` like the current value.
fn set_value(settings: &Settings, key: &str, value: &str) -> Result<Settings> {
    let (section, field) = key
        .rsplit_once('.')
        .ok_or_else(|| anyhow!("Key must look like 'section.field', got '{}'", key))?;

    let mut root = toml::Value::try_from(settings)?;
    let mut table = root
        .as_table_mut()
        .ok_or_else(|| anyhow!("Configuration is not a table"))?;
    for part in section.split('.') {
        table = table
            .get_mut(part)
            .and_then(|v| v.as_table_mut())
            .ok_or_else(|| anyhow!("Unknown configuration section '{}'", section))?;
    }

    let parsed = match table.get(field) {
        Some(toml::Value::Integer(_)) => toml::Value::Integer(value.parse()?),
        Some(toml::Value::Float(_)) => toml::Value::Float(value.parse()?),
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(value.parse()?),
        Some(toml::Value::Array(_)) => toml::Value::Array(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_string()))
                .collect(),
        ),
        _ => toml::Value::String(value.to_string()),
    };
    table.insert(field.to_string(), parsed);

    let updated: Settings = root.try_into()?;
    updated.validate()?;

    // Unknown fields are dropped on deserialize; make sure this one stuck.
    let check = toml::Value::try_from(&updated)?;
    let stored = key
        .split('.')
        .try_fold(&check, |v, part| v.get(part));
    if stored.is_none() {
        bail!("Unknown configuration key '{}'", key);
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Metric;

    #[test]
    fn test_set_typed_values() {
        let settings = Settings::default();

        let updated = set_value(&settings, "rag.top_k", "5").unwrap();
        assert_eq!(updated.rag.top_k, 5);

        let updated = set_value(&updated, "rag.condense_question", "false").unwrap();
        assert!(!updated.rag.condense_question);

        let updated = set_value(&updated, "index.metric", "l2").unwrap();
        assert_eq!(updated.index.metric, Metric::L2);

        let updated = set_value(&updated, "documents.paths", "a.pdf, policies/").unwrap();
        assert_eq!(updated.documents.paths, vec!["a.pdf", "policies/"]);

        let updated = set_value(&updated, "prompts.custom_dir", "~/prompts").unwrap();
        assert_eq!(updated.prompts.custom_dir.as_deref(), Some("~/prompts"));
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let settings = Settings::default();
        assert!(set_value(&settings, "rag.top_k", "many").is_err());
        assert!(set_value(&settings, "rag.no_such_field", "1").is_err());
        assert!(set_value(&settings, "nope.field", "1").is_err());
        assert!(set_value(&settings, "toplevel", "1").is_err());
        assert!(set_value(&settings, "chunking.overlap", "5000").is_err());
    }
}
