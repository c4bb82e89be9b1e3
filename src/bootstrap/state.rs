//! 引导状态机
//!
//! ```text
//! Unstarted -> Resolving(k) -> Enumerating(k) -> DeviceBuilding(k) -> SurfaceBuilding(k) -> Ready(k)
//!                                                      |
//!                                                      +-> FallingBack(k') -> Resolving(k')
//! ```
//!
//! 解析失败同样可能进入 `FallingBack`，回退在一次引导中最多发生一次。

use std::fmt;

use crate::gfx::BackendKind;

/// 引导状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Unstarted,
    Resolving(BackendKind),
    Enumerating(BackendKind),
    DeviceBuilding(BackendKind),
    /// 携带即将尝试的后端
    FallingBack(BackendKind),
    SurfaceBuilding(BackendKind),
    Ready(BackendKind),
}

impl BootstrapState {
    /// 状态关联的后端
    pub fn kind(&self) -> Option<BackendKind> {
        match *self {
            BootstrapState::Unstarted => None,
            BootstrapState::Resolving(k)
            | BootstrapState::Enumerating(k)
            | BootstrapState::DeviceBuilding(k)
            | BootstrapState::FallingBack(k)
            | BootstrapState::SurfaceBuilding(k)
            | BootstrapState::Ready(k) => Some(k),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, BootstrapState::Ready(_))
    }

    /// 状态机允许的迁移
    pub fn can_transition_to(&self, next: &BootstrapState) -> bool {
        use BootstrapState::*;
        match (*self, *next) {
            (Unstarted, Resolving(_)) => true,
            (Resolving(a), Enumerating(b)) => a == b,
            (Resolving(a), FallingBack(b)) => a != b,
            (Enumerating(a), DeviceBuilding(b)) => a == b,
            (DeviceBuilding(a), SurfaceBuilding(b)) => a == b,
            (DeviceBuilding(a), FallingBack(b)) => a != b,
            (FallingBack(a), Resolving(b)) => a == b,
            (SurfaceBuilding(a), Ready(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapState::Unstarted => write!(f, "Unstarted"),
            BootstrapState::Resolving(k) => write!(f, "Resolving({})", k),
            BootstrapState::Enumerating(k) => write!(f, "Enumerating({})", k),
            BootstrapState::DeviceBuilding(k) => write!(f, "DeviceBuilding({})", k),
            BootstrapState::FallingBack(k) => write!(f, "FallingBack({})", k),
            BootstrapState::SurfaceBuilding(k) => write!(f, "SurfaceBuilding({})", k),
            BootstrapState::Ready(k) => write!(f, "Ready({})", k),
        }
    }
}

/// 引导过程中记录的非致命情况
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapNotice {
    /// 后端给出的延迟上下文少于请求数量
    DeferredContextsDowngraded {
        kind: BackendKind,
        requested: u32,
        granted: u32,
    },
    /// 首选后端失败，改用回退后端
    FellBack {
        from: BackendKind,
        to: BackendKind,
        reason: String,
    },
    /// 后端没有验证开关，验证级别被忽略
    ValidationIgnored { kind: BackendKind, level: u32 },
    /// 能力提供者不支持 GPU 辅助验证，只开启了标准验证
    GpuValidationUnavailable { kind: BackendKind, level: u32 },
    /// 没有枚举到适配器，由后端选择默认适配器
    NoAdapters { kind: BackendKind },
    /// 请求软件适配器但不存在，保留了配置的索引
    SoftwareAdapterMissing { retained_index: u32 },
    /// 平台要求更多的后台缓冲
    BufferCountRaised { requested: u32, applied: u32 },
    /// 交换链已随设备一起创建
    SurfaceFolded { kind: BackendKind },
}

impl fmt::Display for BootstrapNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapNotice::DeferredContextsDowngraded { kind, requested, granted } => write!(
                f,
                "{} granted {} of {} requested deferred context(s)",
                kind, granted, requested
            ),
            BootstrapNotice::FellBack { from, to, reason } => {
                write!(f, "fell back from {} to {}: {}", from, to, reason)
            }
            BootstrapNotice::ValidationIgnored { kind, level } => {
                write!(f, "{} has no validation toggles, level {} ignored", kind, level)
            }
            BootstrapNotice::GpuValidationUnavailable { kind, level } => write!(
                f,
                "{} provider cannot enable GPU-based validation, level {} runs standard validation only",
                kind, level
            ),
            BootstrapNotice::NoAdapters { kind } => {
                write!(f, "{} enumerated no adapters, using the backend default", kind)
            }
            BootstrapNotice::SoftwareAdapterMissing { retained_index } => write!(
                f,
                "no software adapter found, keeping configured adapter {}",
                retained_index
            ),
            BootstrapNotice::BufferCountRaised { requested, applied } => {
                write!(f, "swapchain buffer count raised from {} to {}", requested, applied)
            }
            BootstrapNotice::SurfaceFolded { kind } => {
                write!(f, "{} created the surface together with the device", kind)
            }
        }
    }
}
