use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub limiter: LimiterConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
    // getUpdates 长轮询超时 (秒)
    pub poll_timeout_secs: u64,
    // 拉取失败后的重试间隔 (秒)
    pub retry_delay_secs: u64,
}

/// 出站限流配置，默认值对应 Telegram 的群发上限 30 msg/s。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub rate_per_second: f64,
    pub burst: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub data_dir: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(), // must be provided via config file or SLOTBOT__TELEGRAM__BOT_TOKEN
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 60,
            retry_delay_secs: 5,
        }
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            rate_per_second: 30.0,
            burst: 1,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}
