//! Loading and repairing the settings file.
//!
//! The file is read with `toml` and patched in place with `toml_edit`:
//! unknown sections are dropped, missing sections and keys are filled in
//! with defaults, and whatever the user wrote (values, comments, order)
//! is left as it was. Rewrites go through a temp file and a rename.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

const HEADER: &str = "# Video Enhancer settings\n\
# Missing sections and keys are restored with their defaults on load.\n";

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the location of the enhancer's settings file.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Read the settings, creating the file with defaults when it does not
    /// exist and repairing it on disk when sections or keys are missing or
    /// unknown. A value of the wrong type is an error and leaves the file
    /// untouched.
    pub fn load_or_create(&self) -> ConfigResult<Settings> {
        let content = match fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let settings = Settings::default();
                let mut doc = DocumentMut::new();
                fill_defaults(&mut doc, &settings)?;
                self.atomic_write(&format!("{}{}", HEADER, doc))?;
                tracing::info!("Created {} with defaults", self.config_path.display());
                return Ok(settings);
            }
            Err(e) => return Err(e.into()),
        };

        // Missing fields pick up their serde defaults here.
        let settings: Settings = toml::from_str(&content)?;

        let mut doc: DocumentMut = content.parse()?;
        let dropped = drop_unknown_sections(&mut doc);
        for name in &dropped {
            tracing::warn!(
                "Dropping unknown section [{}] from {}",
                name,
                self.config_path.display()
            );
        }
        let filled = fill_defaults(&mut doc, &settings)?;

        if !dropped.is_empty() || filled {
            tracing::info!("Rewriting {} with defaults filled in", self.config_path.display());
            self.atomic_write(&doc.to_string())?;
        }
        Ok(settings)
    }

    /// Write content to the config file via a temp file and rename.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = temp_path(&self.config_path);
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.config_path)
    }
}

fn temp_path(config_path: &Path) -> PathBuf {
    config_path.with_extension("toml.tmp")
}

/// Remove top-level entries that are not a settings section.
fn drop_unknown_sections(doc: &mut DocumentMut) -> Vec<String> {
    let unknown: Vec<String> = doc
        .iter()
        .map(|(name, _)| name.to_string())
        .filter(|name| ConfigSection::from_table_name(name).is_none())
        .collect();

    for name in &unknown {
        doc.remove(name);
    }
    unknown
}

/// Add every section and key of `settings` that `doc` lacks.
///
/// New sections get their comment and go after the existing ones.
/// Returns whether anything was added.
fn fill_defaults(doc: &mut DocumentMut, settings: &Settings) -> ConfigResult<bool> {
    let defaults: DocumentMut = toml::to_string(settings)?.parse()?;
    let mut changed = false;

    for section in ConfigSection::ALL {
        let name = section.table_name();
        let Some(wanted) = defaults.get(name).and_then(|item| item.as_table()) else {
            continue;
        };

        if let Some(existing) = doc.get_mut(name).and_then(|item| item.as_table_like_mut()) {
            for (key, value) in wanted.iter() {
                if !existing.contains_key(key) {
                    existing.insert(key, value.clone());
                    changed = true;
                }
            }
            continue;
        }

        let mut table = wanted.clone();
        table.set_position(None);
        table
            .decor_mut()
            .set_prefix(format!("\n# {}\n", section.comment()));
        doc.insert(name, Item::Table(table));
        changed = true;
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_commented_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("enhancer.toml");

        let settings = ConfigManager::new(&config_path).load_or_create().unwrap();
        assert_eq!(settings.pipeline.crf, 18);

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.starts_with("# Video Enhancer settings"));
        assert!(content.contains("# Stage parameters\n[pipeline]"));
        assert!(content.contains("extract_fps = 30"));
        assert!(!temp_path(&config_path).exists());

        let reloaded = ConfigManager::new(&config_path).load_or_create().unwrap();
        assert_eq!(reloaded.pipeline.extract_fps, 30);
        assert_eq!(fs::read_to_string(&config_path).unwrap(), content);
    }

    #[test]
    fn fills_gaps_and_keeps_user_text() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("enhancer.toml");
        fs::write(
            &config_path,
            "# render box\n[tools]\nbin_dir = \"/opt/ncnn\" # ncnn builds\n\n[pipeline]\ncrf = 22\n",
        )
        .unwrap();

        let settings = ConfigManager::new(&config_path).load_or_create().unwrap();
        assert_eq!(settings.tools.bin_dir, "/opt/ncnn");
        assert_eq!(settings.pipeline.crf, 22);
        assert_eq!(settings.pipeline.extract_fps, 30);

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("# render box"));
        assert!(content.contains("bin_dir = \"/opt/ncnn\" # ncnn builds"));
        assert!(content.contains("crf = 22"));
        assert!(content.contains("extract_fps = 30"));
        assert!(content.contains("# Logging configuration\n[logging]"));
        assert!(content.find("[tools]").unwrap() < content.find("[paths]").unwrap());
    }

    #[test]
    fn inline_section_gets_missing_keys() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("enhancer.toml");
        fs::write(&config_path, "logging = { compact = false }\n").unwrap();

        let settings = ConfigManager::new(&config_path).load_or_create().unwrap();
        assert!(!settings.logging.compact);

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("compact = false"));
        assert!(content.contains("error_tail = 20"));
    }

    #[test]
    fn unknown_sections_are_dropped() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("enhancer.toml");
        fs::write(&config_path, "[habits]\nstreak = 3\n\n[pipeline]\ncrf = 20\n").unwrap();

        let settings = ConfigManager::new(&config_path).load_or_create().unwrap();
        assert_eq!(settings.pipeline.crf, 20);

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(!content.contains("[habits]"));
        assert!(content.contains("crf = 20"));
    }

    #[test]
    fn bad_value_leaves_file_alone() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("enhancer.toml");
        let original = "[pipeline]\ncrf = \"high\"\n";
        fs::write(&config_path, original).unwrap();

        let err = ConfigManager::new(&config_path).load_or_create().unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert_eq!(fs::read_to_string(&config_path).unwrap(), original);
    }
}
