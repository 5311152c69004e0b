//! CLI Command Implementations

pub mod distribute;
pub mod replay;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use votesplit_core::EngineConfig;

/// Load the engine config from `path`, or from `VOTESPLIT_*` variables when no file is given.
pub fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            let config: EngineConfig = serde_json::from_str(&content)
                .with_context(|| format!("invalid config {}", path.display()))?;
            config.validate()?;
            config
        }
        None => EngineConfig::from_env().context("invalid VOTESPLIT_* environment")?,
    };
    Ok(config)
}

/// Parse a decimal token amount.
pub fn parse_u128_dec(s: &str) -> Result<u128> {
    s.trim().parse::<u128>().context("invalid u128 decimal")
}

/// `human` or `json`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => bail!("unknown output format '{other}' (expected human or json)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_amounts() {
        assert_eq!(parse_u128_dec(" 1000 ").unwrap(), 1_000);
        assert!(parse_u128_dec("-1").is_err());
        assert!(parse_u128_dec("0x10").is_err());
    }

    #[test]
    fn output_format_rejects_unknown() {
        assert_eq!(OutputFormat::parse("json").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::parse("yaml").is_err());
    }

    #[test]
    fn config_file_is_validated() {
        let dir = std::env::temp_dir().join(format!("votesplit-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let good = dir.join("good.json");
        std::fs::write(&good, r#"{"denominator": 100}"#).unwrap();
        let config = load_config(Some(good)).unwrap();
        assert_eq!(config.denominator, 100);
        assert_eq!(config.max_partial_delegations, 32);

        let bad = dir.join("bad.json");
        std::fs::write(&bad, r#"{"denominator": 0}"#).unwrap();
        assert!(load_config(Some(bad)).is_err());

        let unknown = dir.join("unknown.json");
        std::fs::write(&unknown, r#"{"denominatr": 100}"#).unwrap();
        assert!(load_config(Some(unknown)).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }
}
