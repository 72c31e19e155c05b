//! 配置文件管理
//!
//! 负责加载和解析 TOML 格式的配置文件，并与命令行参数合并出最终的执行选项。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::ShiftArgs;
use crate::error::{AppError, Result};
use crate::shifter::{TimeOffsetPolicy, WriteMode};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "exifshift.toml";

/// 写入方式（配置文件中的写法）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModeSetting {
    /// 复制到目标文件夹
    #[default]
    Copy,
    /// 原地修改
    InPlace,
}

/// 应用程序配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// 默认写入方式
    #[serde(default)]
    pub mode: ModeSetting,

    /// 复制模式下的目标文件夹
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// 写入后把文件修改时间设为新的拍摄时间
    #[serde(default)]
    pub sync_file_time: bool,

    /// 默认的手动天数，未设置时使用自动策略
    #[serde(default)]
    pub manual_days: Option<u32>,
}

/// 默认目标文件夹
fn default_output_dir() -> PathBuf {
    PathBuf::from("./shifted")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: ModeSetting::default(),
            output_dir: default_output_dir(),
            sync_file_time: false,
            manual_days: None,
        }
    }
}

impl Config {
    /// 从 TOML 文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::info!("加载配置文件: {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::config_error(path, format!("无法读取配置文件: {}", e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            AppError::config_error(path, format!("TOML 解析失败: {}", e))
        })?;

        tracing::debug!("配置加载成功: {:?}", config);
        Ok(config)
    }

    /// 加载配置；默认配置文件不存在时使用默认值
    ///
    /// `explicit` 为 true 表示用户通过 `--config` 指定了文件，此时文件必须存在。
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        if !explicit && !path.exists() {
            tracing::debug!("未找到配置文件 {}，使用默认配置", path.display());
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(self) -> Self {
        let mut config = self;

        if let Ok(dir) = std::env::var("EXIFSHIFT_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
            tracing::debug!("从环境变量覆盖目标文件夹: {}", config.output_dir.display());
        }

        if let Ok(value) = std::env::var("EXIFSHIFT_SYNC_FILE_TIME") {
            match value.to_lowercase().as_str() {
                "1" | "true" | "yes" => config.sync_file_time = true,
                "0" | "false" | "no" => config.sync_file_time = false,
                other => tracing::warn!("无效的 EXIFSHIFT_SYNC_FILE_TIME: {}", other),
            }
        }

        config
    }

    /// 与命令行参数合并出最终选项
    pub fn merge_cli(&self, args: &ShiftArgs) -> ShiftOptions {
        let policy = match (&args.days, self.manual_days) {
            (Some(input), _) => TimeOffsetPolicy::manual_from_input(input),
            (None, Some(days)) => TimeOffsetPolicy::Manual { days },
            (None, None) => TimeOffsetPolicy::Automatic,
        };

        let mode = if args.in_place {
            WriteMode::InPlace
        } else if let Some(dest) = &args.dest {
            WriteMode::CopyToFolder(dest.clone())
        } else {
            match self.mode {
                ModeSetting::InPlace => WriteMode::InPlace,
                ModeSetting::Copy => WriteMode::CopyToFolder(self.output_dir.clone()),
            }
        };

        ShiftOptions {
            policy,
            mode,
            sync_file_time: args.sync_file_time || self.sync_file_time,
        }
    }

    /// 序列化为 TOML 文本（用于 config 子命令展示）
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AppError::config_error(DEFAULT_CONFIG_FILE, format!("TOML 序列化失败: {}", e)))
    }
}

/// 合并后的执行选项
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftOptions {
    pub policy: TimeOffsetPolicy,
    pub mode: WriteMode,
    pub sync_file_time: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config(contents: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("exifshift.toml");
        fs::write(&config_path, contents).unwrap();
        (dir, config_path)
    }

    fn shift_args(argv: &[&str]) -> ShiftArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Apply { args, .. } => args,
            Command::Inspect { args } => args,
            other => panic!("Expected apply/inspect, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_config() {
        let (_dir, path) = create_test_config(
            r#"
mode = "in_place"
output_dir = "/tmp/out"
sync_file_time = true
manual_days = 4
"#,
        );
        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.mode, ModeSetting::InPlace);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(config.sync_file_time);
        assert_eq!(config.manual_days, Some(4));
    }

    #[test]
    fn test_default_values() {
        let (_dir, path) = create_test_config("");
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.mode, ModeSetting::Copy);
        assert_eq!(config.output_dir, PathBuf::from("./shifted"));
    }

    #[test]
    fn test_invalid_mode() {
        let (_dir, path) = create_test_config(r#"mode = "sideways""#);
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_negative_manual_days_rejected() {
        let (_dir, path) = create_test_config("manual_days = -3");
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_load_missing_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exifshift.toml");
        assert_eq!(Config::load(&path, false).unwrap(), Config::default());
        assert!(Config::load(&path, true).is_err());
    }

    #[test]
    fn test_merge_cli_overrides_config() {
        let config = Config {
            mode: ModeSetting::InPlace,
            manual_days: Some(10),
            ..Config::default()
        };

        let args = shift_args(&["exifshift", "apply", "a.jpg", "--days", "3", "--dest", "out"]);
        let options = config.merge_cli(&args);
        assert_eq!(options.policy, TimeOffsetPolicy::Manual { days: 3 });
        assert_eq!(options.mode, WriteMode::CopyToFolder(PathBuf::from("out")));
        assert!(!options.sync_file_time);
    }

    #[test]
    fn test_merge_cli_falls_back_to_config() {
        let config = Config {
            mode: ModeSetting::Copy,
            output_dir: PathBuf::from("/srv/photos"),
            sync_file_time: true,
            manual_days: Some(10),
        };

        let args = shift_args(&["exifshift", "inspect", "a.jpg"]);
        let options = config.merge_cli(&args);
        assert_eq!(options.policy, TimeOffsetPolicy::Manual { days: 10 });
        assert_eq!(
            options.mode,
            WriteMode::CopyToFolder(PathBuf::from("/srv/photos"))
        );
        assert!(options.sync_file_time);

        let options = Config::default().merge_cli(&args);
        assert_eq!(options.policy, TimeOffsetPolicy::Automatic);
    }

    #[test]
    fn test_apply_env_overrides() {
        std::env::set_var("EXIFSHIFT_OUTPUT_DIR", "/env/out");
        std::env::set_var("EXIFSHIFT_SYNC_FILE_TIME", "true");

        let config = Config::default().apply_env_overrides();
        assert_eq!(config.output_dir, PathBuf::from("/env/out"));
        assert!(config.sync_file_time);
        assert_eq!(config.mode, ModeSetting::Copy); // 保持原值

        std::env::remove_var("EXIFSHIFT_OUTPUT_DIR");
        std::env::remove_var("EXIFSHIFT_SYNC_FILE_TIME");
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = Config {
            manual_days: Some(2),
            ..Config::default()
        };
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
