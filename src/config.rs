use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 自定义 brew 路径，为空时自动检测
    pub brew_path: Option<String>,
    /// 搜索防抖时间
    pub search_debounce_ms: u64,
    /// 详情加载动画最少显示时间，避免一闪而过
    pub min_loading_visible_ms: u64,
    pub toast_ms: u64,
    /// 是否发送系统通知
    pub notifications: bool,
    /// 操作日志最多保留条数
    pub log_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            brew_path: None,
            search_debounce_ms: 600,
            min_loading_visible_ms: 500,
            toast_ms: 3000,
            notifications: true,
            log_limit: 500,
        }
    }
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}

impl Config {
    pub fn config_path() -> PathBuf {
        home_dir().join(".config/lian-brew/config.toml")
    }

    /// 日志文件位置（TUI 占用终端，日志只能写文件）
    pub fn log_path() -> PathBuf {
        home_dir().join(".cache/lian-brew/lian-brew.log")
    }

    pub fn load_or_default() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// 规范化后的自定义路径
    pub fn custom_brew_path(&self) -> Option<&str> {
        self.brew_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_config_path() -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("lian_brew_config_test_{suffix}"))
            .join("config.toml")
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from(&temp_config_path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.search_debounce_ms, 600);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str("brew_path = \"/opt/homebrew/bin/brew\"\n").unwrap();
        assert_eq!(config.custom_brew_path(), Some("/opt/homebrew/bin/brew"));
        assert_eq!(config.toast_ms, 3000);
        assert!(config.notifications);
    }

    #[test]
    fn save_then_load_keeps_brew_path() {
        let path = temp_config_path();
        let config = Config {
            brew_path: Some("/usr/local/bin/brew".to_string()),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.brew_path.as_deref(), Some("/usr/local/bin/brew"));
        fs::remove_dir_all(path.parent().unwrap()).expect("cleanup");
    }

    #[test]
    fn blank_brew_path_is_not_custom() {
        let config = Config {
            brew_path: Some("   ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.custom_brew_path(), None);
    }
}
