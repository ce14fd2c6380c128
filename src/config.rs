use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Cross-file expansion stops after this many include hops.
pub const DEFAULT_MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of include hops followed from the origin file
    pub max_depth: usize,
    /// Workspace folders; empty means the current directory
    pub workspace: Vec<PathBuf>,
    /// Convert CRLF to LF in file content read from disk
    pub normalize_line_endings: bool,
    /// Keep grammar trees that contain error nodes instead of failing the file
    pub tolerate_syntax_errors: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            workspace: Vec::new(),
            normalize_line_endings: true,
            tolerate_syntax_errors: false,
        }
    }
}

impl ResolverConfig {
    /// Workspace folders to resolve against, falling back to the current directory.
    pub fn workspace_folders(&self) -> Vec<PathBuf> {
        if !self.workspace.is_empty() {
            return self.workspace.clone();
        }
        std::env::current_dir().into_iter().collect()
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("codectx.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ResolverConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ResolverConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = load_config(Some(&dir.path().join("codectx.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codectx.toml");
        std::fs::write(&path, "max_depth = 5\nworkspace = [\"/srv/app\"]\n").unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.workspace, vec![PathBuf::from("/srv/app")]);
        assert!(config.normalize_line_endings);
        assert!(!config.tolerate_syntax_errors);
        assert_eq!(config.workspace_folders(), vec![PathBuf::from("/srv/app")]);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codectx.toml");
        std::fs::write(&path, "max_depth = \"deep\"\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = ResolverConfig {
            max_depth: 1,
            tolerate_syntax_errors: true,
            ..ResolverConfig::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: ResolverConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
