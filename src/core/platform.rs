//! 平台信息
//!
//! 描述当前桌面平台的编译期支持情况：默认后端、哪些后端被编译进来、
//! 以及交换链的平台特定约束。平台以值的形式传入引导流程，
//! 测试可以构造任意平台而不依赖宿主系统。

use serde::{Deserialize, Serialize};

use crate::gfx::BackendKind;

/// 桌面平台族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl Platform {
    /// 编译目标对应的平台
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }

    /// 平台默认的图形后端
    pub fn default_backend(&self) -> BackendKind {
        match self {
            Platform::Windows => BackendKind::D3D12,
            Platform::MacOs => BackendKind::Metal,
            Platform::Linux => BackendKind::Gl,
            Platform::Other => BackendKind::Null,
        }
    }

    /// 该平台是否编译了指定后端的支持
    pub fn supports(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Null => true,
            BackendKind::D3D11 | BackendKind::D3D12 => *self == Platform::Windows,
            BackendKind::Gl => matches!(self, Platform::Windows | Platform::Linux),
            BackendKind::Vulkan => matches!(self, Platform::Windows | Platform::Linux | Platform::MacOs),
            BackendKind::Metal => *self == Platform::MacOs,
        }
    }

    /// 交换链后台缓冲的最小数量
    ///
    /// macOS 全屏模式下少于 3 个缓冲会导致严重的呈现停顿。
    pub fn min_swapchain_buffers(&self) -> Option<u32> {
        match self {
            Platform::MacOs => Some(3),
            _ => None,
        }
    }

    /// OpenGL 后端创建设备时是否必须提供窗口
    pub fn gl_requires_window(&self) -> bool {
        *self != Platform::MacOs
    }
}
