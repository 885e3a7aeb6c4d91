use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logwatch::{EngineConfig, DEFAULT_FILE_PATTERN};

/// ユーザーのローカルデータディレクトリ配下のTeamsログ位置
const TEAMS_LOG_SUBDIR: &str = "Packages/MSTeams_8wekyb3d8bbwe/LocalCache/Microsoft/MSTeams/Logs";

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// MSTeams_*.log を含むディレクトリ
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 対象ログファイル名のglob
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    /// 起動後、最初のスナップショットを出すまでの待機秒数
    #[serde(default = "default_throttle_secs")]
    pub throttle_secs: u64,
    /// 変更通知が来ない場合のポーリング間隔（ミリ秒）
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// 購読者ごとのイベントバッファ数
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// ログレベル
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// 現在のユーザーの標準Teamsログディレクトリ
pub fn default_log_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.data_local_dir().to_path_buf())
        .unwrap_or_else(std::env::temp_dir)
        .join(TEAMS_LOG_SUBDIR)
}

fn default_file_pattern() -> String {
    DEFAULT_FILE_PATTERN.to_string()
}

fn default_throttle_secs() -> u64 {
    2
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_event_buffer() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            file_pattern: default_file_pattern(),
            throttle_secs: default_throttle_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            event_buffer: default_event_buffer(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み（存在しない場合はデフォルトを作成して保存）
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            if let Err(e) = config.save_to(&config_path) {
                tracing::warn!("Failed to save default config: {}", e);
            }
            Ok(config)
        }
    }

    /// 指定パスから読み込み
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// 設定ファイルパス（~/.config/teams-presence/config.toml）
    pub fn config_path() -> Result<PathBuf> {
        let base_dirs = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))?;
        Ok(base_dirs.home_dir().join(".config/teams-presence/config.toml"))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// エンジン設定に変換
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            log_dir: self.log_dir.clone(),
            file_pattern: self.file_pattern.clone(),
            throttle: Duration::from_secs(self.throttle_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            event_buffer: self.event_buffer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.log_dir.ends_with("Microsoft/MSTeams/Logs"));
        assert_eq!(config.file_pattern, "MSTeams_*.log");
        assert_eq!(config.throttle_secs, 2);
        assert_eq!(config.poll_interval_ms, 100);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_dir = \"/recorded/logs\"\nthrottle_secs = 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.log_dir, PathBuf::from("/recorded/logs"));
        assert_eq!(config.throttle_secs, 5);
        assert_eq!(config.file_pattern, "MSTeams_*.log");
        assert_eq!(config.event_buffer, 64);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let config = Config {
            poll_interval_ms: 250,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_engine_config_conversion() {
        let config = Config {
            throttle_secs: 3,
            poll_interval_ms: 50,
            ..Default::default()
        };
        let engine = config.engine_config();
        assert_eq!(engine.throttle, Duration::from_secs(3));
        assert_eq!(engine.poll_interval, Duration::from_millis(50));
        assert_eq!(engine.file_pattern, "MSTeams_*.log");
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "throttle_secs = \"soon\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
