use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::BackendKind;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DocsiftConfig {
    pub database: Option<String>,
    pub backend: Option<BackendKind>,
    pub port: Option<u16>,
    pub model: Option<String>,
}

impl DocsiftConfig {
    /// Apply `DOCSIFT_DATABASE`, `DOCSIFT_BACKEND`, `DOCSIFT_MODEL` and `PORT`
    pub fn with_env_overrides(mut self) -> anyhow::Result<Self> {
        if let Ok(database) = std::env::var("DOCSIFT_DATABASE") {
            self.database = Some(database);
        }
        if let Ok(backend) = std::env::var("DOCSIFT_BACKEND") {
            self.backend = Some(match backend.to_lowercase().as_str() {
                "memory" => BackendKind::Memory,
                "sqlite" => BackendKind::Sqlite,
                other => anyhow::bail!("unknown DOCSIFT_BACKEND '{}' (expected memory or sqlite)", other),
            });
        }
        if let Ok(model) = std::env::var("DOCSIFT_MODEL") {
            self.model = Some(model);
        }
        if let Ok(port) = std::env::var("PORT") {
            self.port = Some(port.parse()?);
        }
        Ok(self)
    }

    pub fn backend(&self) -> BackendKind {
        self.backend.unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Configured database path, or the default under `base`
    pub fn database_path_in(&self, base: &Path) -> PathBuf {
        self.database
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| default_database_path_in(base))
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("docsift.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".docsift").join("docsift.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<DocsiftConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: DocsiftConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &DocsiftConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn ensure_gitignore(project_root: &Path) -> anyhow::Result<()> {
    let gitignore_path = project_root.join(".gitignore");
    let entry = ".docsift/";

    let mut content = if gitignore_path.exists() {
        std::fs::read_to_string(&gitignore_path)?
    } else {
        String::new()
    };
    if content.lines().any(|line| line.trim() == entry) {
        return Ok(());
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(entry);
    content.push('\n');
    std::fs::write(&gitignore_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("docsift.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docsift.toml");
        let config = DocsiftConfig {
            database: Some("data/docs.db".to_string()),
            backend: Some(BackendKind::Memory),
            port: Some(9000),
            model: None,
        };

        write_config(&path, &config, false).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), Some(config.clone()));
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("backend = \"memory\""));
    }

    #[test]
    fn test_defaults() {
        let config = DocsiftConfig::default();
        assert_eq!(config.backend(), BackendKind::Sqlite);
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(
            config.database_path_in(Path::new("/srv")),
            PathBuf::from("/srv/.docsift/docsift.db")
        );
    }

    #[test]
    fn test_ensure_gitignore_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target").unwrap();

        ensure_gitignore(dir.path()).unwrap();
        ensure_gitignore(dir.path()).unwrap();

        let contents = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(contents, "target\n.docsift/\n");
    }

    #[test]
    fn test_ensure_db_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("docsift.db");
        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }
}
