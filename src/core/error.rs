//! 错误处理模块
//!
//! 定义了引导流程中使用的统一错误类型，使用 `thiserror` 提供友好的错误消息。
//!
//! # 设计原则
//!
//! - 使用 `thiserror` 自动实现 `Error` trait
//! - 为每种错误类型提供清晰的上下文信息（出错的后端、适配器索引等）
//! - 易于模式匹配：编排器依据 `GraphicsError` 的种类决定是否回退

use thiserror::Error;

use crate::gfx::{AdapterType, BackendKind};

/// 引擎统一的 Result 类型
pub type Result<T> = std::result::Result<T, DistBootstrapError>;

/// 图形后端调用使用的 Result 类型
pub type GfxResult<T> = std::result::Result<T, GraphicsError>;

/// 引导子系统的顶层错误类型
#[derive(Debug, Error)]
pub enum DistBootstrapError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 图形 API 错误
    #[error("Graphics error: {0}")]
    Graphics(#[from] GraphicsError),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 日志系统错误
    #[error("Log error: {0}")]
    Log(String),
}

/// 配置相关的错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件未找到
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    /// 配置文件解析失败
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// 配置值无效
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 图形后端引导过程中的错误
///
/// 只有 `BackendUnavailable` 与 `DeviceCreation` 会触发回退，
/// 其余错误原样交还给调用方。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    /// 当前主机上没有该后端可用的工厂（驱动、动态库或编译支持缺失）
    #[error("{kind} backend is unavailable: {reason}")]
    BackendUnavailable { kind: BackendKind, reason: String },

    /// 后端可用，但其可选的加载步骤报告失败
    #[error("{kind} feature negotiation failed: {reason}")]
    FeatureNegotiation { kind: BackendKind, reason: String },

    /// 配置的适配器索引超出枚举结果；`index` 为 `None` 表示没有匹配类型的适配器
    #[error("Adapter {} ({adapter_type:?}) is out of range: {count} adapter(s) enumerated", display_index(.index))]
    AdapterOutOfRange {
        index: Option<u32>,
        adapter_type: AdapterType,
        count: u32,
    },

    /// 设备或执行上下文创建失败
    #[error("{kind} device creation failed: {reason}")]
    DeviceCreation { kind: BackendKind, reason: String },

    /// 设备已存在，但交换链创建失败
    #[error("{kind} surface creation failed: {reason}")]
    SurfaceCreation { kind: BackendKind, reason: String },

    /// 当前平台无法提供所需的原生窗口句柄
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

fn display_index(index: &Option<u32>) -> String {
    match index {
        Some(i) => i.to_string(),
        None => "<none matching>".to_string(),
    }
}

impl GraphicsError {
    /// 该错误是否会让编排器尝试回退后端
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            GraphicsError::BackendUnavailable { .. } | GraphicsError::DeviceCreation { .. }
        )
    }

    pub fn unavailable(kind: BackendKind, reason: impl Into<String>) -> Self {
        GraphicsError::BackendUnavailable { kind, reason: reason.into() }
    }

    pub fn device(kind: BackendKind, reason: impl Into<String>) -> Self {
        GraphicsError::DeviceCreation { kind, reason: reason.into() }
    }

    pub fn surface(kind: BackendKind, reason: impl Into<String>) -> Self {
        GraphicsError::SurfaceCreation { kind, reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_and_device_errors_fall_back() {
        assert!(GraphicsError::unavailable(BackendKind::D3D12, "no dll").triggers_fallback());
        assert!(GraphicsError::device(BackendKind::D3D12, "no adapters").triggers_fallback());
        assert!(!GraphicsError::surface(BackendKind::D3D12, "bad hwnd").triggers_fallback());
        assert!(!GraphicsError::AdapterOutOfRange {
            index: Some(3),
            adapter_type: AdapterType::Unknown,
            count: 1,
        }
        .triggers_fallback());
        assert!(!GraphicsError::FeatureNegotiation {
            kind: BackendKind::D3D12,
            reason: "LoadD3D12".into(),
        }
        .triggers_fallback());
    }

    #[test]
    fn test_error_messages() {
        let err: DistBootstrapError = GraphicsError::AdapterOutOfRange {
            index: None,
            adapter_type: AdapterType::Software,
            count: 2,
        }
        .into();
        let msg = err.to_string();
        assert!(msg.starts_with("Graphics error:"));
        assert!(msg.contains("<none matching>"));
        assert!(msg.contains("2 adapter(s)"));
    }
}
