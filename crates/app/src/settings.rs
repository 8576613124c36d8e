use config::{Config, ConfigError, Environment, File};
use slotbot_core::config::AppConfig;
use std::path::Path;

/// 环境变量前缀，例如 `SLOTBOT__TELEGRAM__BOT_TOKEN`
const ENV_PREFIX: &str = "SLOTBOT";
const ENV_SEPARATOR: &str = "__";

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 以 `AppConfig::default()` 为底。
/// 2. 叠加可选的配置文件 (不存在时忽略)。
/// 3. 叠加 `SLOTBOT__` 前缀的环境变量，优先级最高。
///
/// # Arguments
/// * `file` - 配置文件路径 (不含扩展名时按 `config` crate 规则探测格式)。
pub fn load(file: &Path) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(Config::try_from(&AppConfig::default())?)
        .add_source(File::from(file).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.limiter.rate_per_second, 30.0);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_file_overrides_only_given_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[telegram]\nbot_token = \"123:abc\"\n\n[limiter]\nrate_per_second = 5.0\n",
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.telegram.poll_timeout_secs, 60);
        assert_eq!(config.limiter.rate_per_second, 5.0);
        assert_eq!(config.limiter.burst, 1);
        assert_eq!(config.database.data_dir, "data");
    }
}
