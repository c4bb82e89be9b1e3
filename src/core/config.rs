//! 配置管理模块
//!
//! 提供引导配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 720
//! title = "DistBootstrap"
//! resizable = true
//! headless = false
//!
//! [graphics]
//! backend = "d3d12"          # null, d3d11, d3d12, gl, vulkan, metal
//! validation_level = 1       # 省略表示使用后端默认值
//! deferred_contexts = 2
//! min_feature_level = "11_0"
//!
//! [graphics.adapter]
//! index = 0
//! type = "hardware"          # unknown, hardware, software
//! selection = "strict"       # strict, permissive
//!
//! [swapchain]
//! color_format = "rgba8_unorm_srgb"
//! depth_format = "d32_float"
//! buffer_count = 2
//! vsync = true
//! fullscreen = false
//!
//! [logging]
//! level = "info"             # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};
use super::platform::Platform;
use crate::gfx::{
    AdapterType, BackendKind, FeatureLevel, TextureFormat, ValidationLevel, MAX_DEFERRED_CONTEXTS,
};

/// 引导配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 交换链配置
    #[serde(default)]
    pub swapchain: SwapchainConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_resizable")]
    pub resizable: bool,

    /// 无窗口运行（不创建交换链）
    #[serde(default)]
    pub headless: bool,
}

/// 图形配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 首选图形后端，默认取决于平台
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// 验证级别：省略 = 后端默认，0 = 关闭，1 = 标准验证，2 = 额外 GPU 辅助验证
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_level: Option<i32>,

    /// 请求的延迟上下文数量
    #[serde(default)]
    pub deferred_contexts: u32,

    /// 适配器枚举的最低特性级别
    #[serde(default)]
    pub min_feature_level: FeatureLevel,

    #[serde(default)]
    pub adapter: AdapterConfig,
}

/// 适配器选择配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(default)]
    pub index: u32,

    #[serde(default, rename = "type")]
    pub adapter_type: AdapterType,

    #[serde(default)]
    pub selection: AdapterSelection,
}

/// 请求软件适配器但枚举结果中不存在时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterSelection {
    /// 报告 `AdapterOutOfRange`
    #[default]
    Strict,
    /// 保留配置的索引（仍做越界检查）
    Permissive,
}

/// 交换链配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapchainConfig {
    #[serde(default = "default_color_format")]
    pub color_format: TextureFormat,

    #[serde(default = "default_depth_format")]
    pub depth_format: TextureFormat,

    #[serde(default = "default_buffer_count")]
    pub buffer_count: u32,

    #[serde(default = "default_vsync")]
    pub vsync: bool,

    #[serde(default)]
    pub fullscreen: bool,

    /// 全屏时使用的显示模式序号（对应枚举出的显示模式列表）
    #[serde(default)]
    pub display_mode: usize,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    #[serde(default = "default_file_output")]
    pub file_output: bool,

    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_title() -> String { "DistBootstrap".to_string() }
fn default_resizable() -> bool { true }
fn default_backend() -> BackendKind { Platform::current().default_backend() }
fn default_color_format() -> TextureFormat { TextureFormat::Rgba8UnormSrgb }
fn default_depth_format() -> TextureFormat { TextureFormat::D32Float }
fn default_buffer_count() -> u32 { 2 }
fn default_vsync() -> bool { true }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "distbootstrap.log".to_string() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: default_resizable(),
            headless: false,
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            validation_level: None,
            deferred_contexts: 0,
            min_feature_level: FeatureLevel::default(),
            adapter: AdapterConfig::default(),
        }
    }
}

impl Default for SwapchainConfig {
    fn default() -> Self {
        Self {
            color_format: default_color_format(),
            depth_format: default_depth_format(),
            buffer_count: default_buffer_count(),
            vsync: default_vsync(),
            fullscreen: false,
            display_mode: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl GraphicsConfig {
    pub fn validation(&self) -> ValidationLevel {
        ValidationLevel::from(self.validation_level)
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use dist_bootstrap::core::Config;
    ///
    /// let config = Config::from_file("config.toml")?;
    /// # Ok::<(), dist_bootstrap::core::DistBootstrapError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml(&contents)
    }

    /// 从 TOML 文本解析
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或无法解析则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--mode <d3d11|d3d12|gl|vk|mtl|null>`: 选择图形后端
    /// - `--validation <n>`: 设置验证级别
    /// - `--adapter <index|sw>`: 选择适配器（`sw` 表示软件适配器）
    /// - `--deferred <n>`: 延迟上下文数量
    /// - `--width <value>` / `--height <value>`: 窗口尺寸
    /// - `--fullscreen`, `--vsync`, `--no-vsync`, `--headless`
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|idx| args.get(idx + 1))
                .map(String::as_str)
        };

        if let Some(mode) = value_of("--mode") {
            if let Ok(kind) = mode.parse() {
                self.graphics.backend = kind;
            }
        }

        if let Some(level) = value_of("--validation").and_then(|v| v.parse().ok()) {
            self.graphics.validation_level = Some(level);
        }

        if let Some(adapter) = value_of("--adapter") {
            if adapter.eq_ignore_ascii_case("sw") {
                self.graphics.adapter.adapter_type = AdapterType::Software;
            } else if let Ok(index) = adapter.parse() {
                self.graphics.adapter.index = index;
            }
        }

        if let Some(count) = value_of("--deferred").and_then(|v| v.parse().ok()) {
            self.graphics.deferred_contexts = count;
        }

        if let Some(width) = value_of("--width").and_then(|v| v.parse().ok()) {
            self.window.width = width;
        }

        if let Some(height) = value_of("--height").and_then(|v| v.parse().ok()) {
            self.window.height = height;
        }

        if args.iter().any(|a| a == "--fullscreen") {
            self.swapchain.fullscreen = true;
        }
        if args.iter().any(|a| a == "--vsync") {
            self.swapchain.vsync = true;
        }
        if args.iter().any(|a| a == "--no-vsync") {
            self.swapchain.vsync = false;
        }
        if args.iter().any(|a| a == "--headless") {
            self.window.headless = true;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(invalid("window.width/height", "Window dimensions must be greater than 0"));
        }

        if self.graphics.deferred_contexts > MAX_DEFERRED_CONTEXTS {
            return Err(invalid(
                "graphics.deferred_contexts",
                &format!("At most {} deferred contexts are supported", MAX_DEFERRED_CONTEXTS),
            ));
        }

        if self.swapchain.buffer_count == 0 {
            return Err(invalid("swapchain.buffer_count", "At least one back buffer is required"));
        }

        if self.swapchain.color_format.is_depth() {
            return Err(invalid("swapchain.color_format", "Color buffer cannot use a depth format"));
        }

        if self.swapchain.depth_format != TextureFormat::Unknown && !self.swapchain.depth_format.is_depth() {
            return Err(invalid("swapchain.depth_format", "Depth buffer must use a depth format"));
        }

        if self.graphics.min_feature_level.major == 0 {
            return Err(invalid("graphics.min_feature_level", "Feature level must be at least 1_0"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> super::error::DistBootstrapError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
