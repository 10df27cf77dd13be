use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "DXF2SVG_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub page: PageConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.page.validate(path)?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `DXF2SVG_CONFIG`，否则寻找 `./config/dxf2svg.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        let cwd = env::current_dir().map_err(|source| ConfigError::Context {
            message: "获取当前工作目录失败".to_string(),
            source,
        })?;
        Self::discover_from(env::var_os(CONFIG_ENV).map(PathBuf::from), &cwd)
    }

    fn discover_from(explicit: Option<PathBuf>, base: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let default_path = base.join("config").join("dxf2svg.toml");
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，`level` 为 tracing 的过滤指令。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 渲染默认值；颜色保持原始字符串，由调用方在加载文档前校验。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "RenderConfig::default_layout")]
    pub layout: String,
    #[serde(default = "RenderConfig::default_background")]
    pub background: String,
    #[serde(default = "RenderConfig::default_line_color")]
    pub line_color: String,
}

impl RenderConfig {
    fn default_layout() -> String {
        "model".to_string()
    }

    fn default_background() -> String {
        "#0b1220".to_string()
    }

    fn default_line_color() -> String {
        "#f8fafc".to_string()
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            layout: Self::default_layout(),
            background: Self::default_background(),
            line_color: Self::default_line_color(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PageConfig {
    #[serde(default = "PageConfig::default_width")]
    pub fallback_width: f64,
    #[serde(default = "PageConfig::default_height")]
    pub fallback_height: f64,
    #[serde(default = "PageConfig::default_min_dimension")]
    pub min_dimension: f64,
}

impl PageConfig {
    fn default_width() -> f64 {
        1920.0
    }

    fn default_height() -> f64 {
        1080.0
    }

    fn default_min_dimension() -> f64 {
        1.0
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let checks = [
            ("page.fallback_width", self.fallback_width, false),
            ("page.fallback_height", self.fallback_height, false),
            ("page.min_dimension", self.min_dimension, true),
        ];
        for (key, value, zero_allowed) in checks {
            let valid = value.is_finite() && (value > 0.0 || (zero_allowed && value == 0.0));
            if !valid {
                return Err(ConfigError::Invalid {
                    path: path.to_path_buf(),
                    message: format!("{key} 的值 {value} 无效"),
                });
            }
        }
        Ok(())
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            fallback_width: Self::default_width(),
            fallback_height: Self::default_height(),
            min_dimension: Self::default_min_dimension(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置文件 {path:?} 无效: {message}")]
    Invalid { path: PathBuf, message: String },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_returned_when_file_missing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = AppConfig::discover_from(None, dir.path()).expect("discover should succeed");
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.render.layout, "model");
        assert_eq!(cfg.render.background, "#0b1220");
        assert_eq!(cfg.render.line_color, "#f8fafc");
        assert_eq!(cfg.page.fallback_width, 1920.0);
        assert_eq!(cfg.page.fallback_height, 1080.0);
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r##"
            [logging]
            level = "debug"

            [render]
            layout = "Sheet A"
            background = "#ffffff"

            [page]
            fallback_width = 297.0
            "##
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.render.layout, "Sheet A");
        assert_eq!(cfg.render.background, "#ffffff");
        assert_eq!(cfg.render.line_color, "#f8fafc");
        assert_eq!(cfg.page.fallback_width, 297.0);
        assert_eq!(cfg.page.fallback_height, 1080.0);
    }

    #[test]
    fn project_directory_file_is_discovered() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::create_dir(dir.path().join("config")).expect("config dir");
        fs::write(
            dir.path().join("config").join("dxf2svg.toml"),
            "[render]\nline_color = \"#000000\"\n",
        )
        .expect("write config");

        let cfg = AppConfig::discover_from(None, dir.path()).expect("discover");
        assert_eq!(cfg.render.line_color, "#000000");
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("nope.toml");
        let err = AppConfig::discover_from(Some(missing.clone()), dir.path())
            .expect_err("missing explicit file");
        match err {
            ConfigError::Io { path, .. } => assert_eq!(path, missing),
            other => panic!("期望 Io 错误，实际 {other:?}"),
        }
    }

    #[test]
    fn malformed_and_invalid_files_are_rejected() {
        let mut broken = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(broken, "[page\nfallback_width = ").unwrap();
        assert!(matches!(
            AppConfig::from_file(broken.path()),
            Err(ConfigError::Parse { .. })
        ));

        let mut negative = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(negative, "[page]\nfallback_height = -5.0").unwrap();
        let err = AppConfig::from_file(negative.path()).expect_err("negative height");
        assert!(err.to_string().contains("page.fallback_height"), "{err}");
    }
}
