//! 日志系统模块
//!
//! 基于 `tracing` 提供结构化的日志记录功能。
//!
//! # 特性
//!
//! - 结构化日志：支持键值对（后端、适配器、状态等）
//! - 灵活输出：支持控制台和按天滚动的文件输出
//! - 日志级别：trace, debug, info, warn, error
//!
//! # 使用示例
//!
//! ```no_run
//! use dist_bootstrap::core::config::LogLevel;
//! use dist_bootstrap::core::log;
//!
//! log::init_logger(LogLevel::Info, false, None).unwrap();
//! tracing::info!(backend = "Vulkan", "Bootstrap starting");
//! ```

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use super::config::LogLevel;
use super::error::{DistBootstrapError, Result};

/// 初始化日志系统
///
/// 必须在程序开始时调用一次；重复调用返回 `DistBootstrapError::Log`。
/// 设置了 `RUST_LOG` 环境变量时以环境变量为准。
///
/// # 参数
///
/// * `level` - 日志级别
/// * `file_output` - 是否输出到文件
/// * `log_file_path` - 日志文件路径（可选，默认为 "distbootstrap.log"）
pub fn init_logger(level: LogLevel, file_output: bool, log_file_path: Option<&str>) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(level).into())
        .from_env_lossy();

    let result = if file_output {
        // 解析日志文件路径
        let log_path = log_file_path.unwrap_or("distbootstrap.log");
        let path = Path::new(log_path);
        let directory = path.parent().unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("distbootstrap.log");

        let file_appender = RollingFileAppender::new(Rotation::DAILY, directory, filename);

        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(true);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(false) // 文件不需要 ANSI 颜色
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    };

    result.map_err(|e| DistBootstrapError::Log(e.to_string()))
}

/// 未设置 `RUST_LOG` 时使用的全局级别
fn default_level(level: LogLevel) -> LevelFilter {
    LevelFilter::from_level(level.into())
}

/// 引导流程日志 - Info 级别
#[macro_export]
macro_rules! bootstrap_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "distbootstrap::bootstrap", $($arg)*)
    };
}

/// 引导流程日志 - Warn 级别
#[macro_export]
macro_rules! bootstrap_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "distbootstrap::bootstrap", $($arg)*)
    };
}

/// 引导流程日志 - Debug 级别
#[macro_export]
macro_rules! bootstrap_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "distbootstrap::bootstrap", $($arg)*)
    };
}

/// 日志级别转换
impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
    }

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(LogLevel::Trace), LevelFilter::TRACE);
        assert_eq!(default_level(LogLevel::Warn), LevelFilter::WARN);
    }
}
