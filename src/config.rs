//! User configuration (`config.toml` in the gridcalc config dir).

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// `tracing` filter directive, e.g. `"gridcalc_engine=debug"`.
    pub log_filter: Option<String>,
    /// Rhai function files loaded before any given with `--functions`.
    #[serde(default)]
    pub functions: Vec<PathBuf>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub mode: Option<OutputMode>,
}

/// What to dump once all commands have run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Values,
    Texts,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "values" => Ok(OutputMode::Values),
            "texts" => Ok(OutputMode::Texts),
            other => Err(format!("Unknown output mode '{}' (expected values or texts)", other)),
        }
    }
}

pub(crate) fn config_dir() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "gridcalc")?;
    Some(proj.config_dir().to_path_buf())
}

fn user_config_path() -> Option<PathBuf> {
    let mut path = config_dir()?;
    path.push("config.toml");
    Some(path)
}

/// Load the config file, falling back to defaults.
///
/// `explicit` overrides the per-user location; a missing explicit file is
/// reported, a missing per-user file is not. Returns any warnings.
pub fn load_config(explicit: Option<&Path>) -> (Config, Vec<String>) {
    let mut warnings = Vec::new();
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match user_config_path() {
            Some(path) if path.exists() => path,
            _ => return (Config::default(), warnings),
        },
    };

    let config = match std::fs::metadata(&path) {
        Ok(meta) if meta.len() > MAX_CONFIG_FILE_BYTES => {
            warnings.push(format!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            ));
            None
        }
        Ok(_) => match std::fs::read_to_string(&path) {
            Ok(content) => match parse_config(&content) {
                Ok(config) => Some(config),
                Err(err) => {
                    warnings.push(format!("Failed to parse {}: {}", path.display(), err));
                    None
                }
            },
            Err(err) => {
                warnings.push(format!("Failed to read {}: {}", path.display(), err));
                None
            }
        },
        Err(err) => {
            warnings.push(format!(
                "Failed to read metadata for {}: {}",
                path.display(),
                err
            ));
            None
        }
    };

    (config.unwrap_or_default(), warnings)
}

fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            log_filter = "gridcalc_engine=debug"
            functions = ["/tmp/extra.rhai"]

            [output]
            mode = "texts"
            "#,
        )
        .unwrap();
        assert_eq!(config.log_filter.as_deref(), Some("gridcalc_engine=debug"));
        assert_eq!(config.functions, vec![PathBuf::from("/tmp/extra.rhai")]);
        assert_eq!(config.output.mode, Some(OutputMode::Texts));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert!(config.log_filter.is_none());
        assert!(config.functions.is_empty());
        assert!(config.output.mode.is_none());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(parse_config("colour = true").is_err());
        assert!(parse_config("[output]\nmode = \"pretty\"").is_err());
    }

    #[test]
    fn test_missing_explicit_file_warns() {
        let (config, warnings) = load_config(Some(Path::new("/definitely/not/here.toml")));
        assert!(config.functions.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_output_mode_from_str() {
        assert_eq!("values".parse::<OutputMode>(), Ok(OutputMode::Values));
        assert!("json".parse::<OutputMode>().is_err());
    }
}
