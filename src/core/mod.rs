//! 核心功能模块
//!
//! 本模块提供了引导子系统的基础功能：日志系统、配置管理、错误处理和平台信息。
//! 这些模块独立于具体的图形 API。
//!
//! # 模块组织
//!
//! - `log`：日志系统，提供结构化的日志记录功能
//! - `config`：配置管理，支持从配置文件和命令行加载引导设置
//! - `error`：错误处理，定义统一的错误类型
//! - `platform`：平台信息，默认后端与平台约束

pub mod config;
pub mod error;
pub mod log;
pub mod platform;

// 重新导出常用类型，方便使用
pub use config::Config;
pub use error::{DistBootstrapError, GfxResult, GraphicsError, Result};
pub use platform::Platform;
