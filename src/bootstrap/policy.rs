//! 后端策略
//!
//! 各后端的初始化协议结构不同：有的要先枚举适配器，有的只能使用一个执行上下文，
//! 有的在创建设备时直接创建交换链，验证开关也各不相同。
//! 这些差异集中在 `BackendPolicy` 中，编排器只按策略行事。

use crate::core::platform::Platform;
use crate::gfx::{
    BackendCreateInfo, BackendKind, D3D11CreateInfo, D3D11DebugFlags, D3D12CreateInfo, ValidationLevel,
    VulkanCreateInfo,
};

/// 后端策略，每个后端种类一个变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendPolicy {
    Null,
    D3D11,
    D3D12,
    Gl,
    Vulkan,
    Metal,
}

impl BackendPolicy {
    pub fn for_kind(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Null => BackendPolicy::Null,
            BackendKind::D3D11 => BackendPolicy::D3D11,
            BackendKind::D3D12 => BackendPolicy::D3D12,
            BackendKind::Gl => BackendPolicy::Gl,
            BackendKind::Vulkan => BackendPolicy::Vulkan,
            BackendKind::Metal => BackendPolicy::Metal,
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            BackendPolicy::Null => BackendKind::Null,
            BackendPolicy::D3D11 => BackendKind::D3D11,
            BackendPolicy::D3D12 => BackendKind::D3D12,
            BackendPolicy::Gl => BackendKind::Gl,
            BackendPolicy::Vulkan => BackendKind::Vulkan,
            BackendPolicy::Metal => BackendKind::Metal,
        }
    }

    /// 创建设备前是否枚举适配器与显示模式
    pub fn enumerates_adapters(&self) -> bool {
        matches!(self, BackendPolicy::Null | BackendPolicy::D3D11 | BackendPolicy::D3D12)
    }

    /// 没有适配器时是否视为设备创建失败
    pub fn requires_adapters(&self) -> bool {
        matches!(self, BackendPolicy::D3D12)
    }

    /// 是否只能使用立即上下文
    pub fn single_context(&self) -> bool {
        matches!(self, BackendPolicy::Gl)
    }

    /// 提供窗口时是否在创建设备的同时创建交换链
    pub fn folds_surface(&self) -> bool {
        matches!(self, BackendPolicy::Gl)
    }

    /// 创建设备是否必须提供窗口
    pub fn requires_window(&self, platform: Platform) -> bool {
        self.folds_surface() && platform.gl_requires_window()
    }

    /// 设备创建失败或后端不可用时的回退后端
    pub fn fallback(&self, platform: Platform) -> Option<BackendKind> {
        match self {
            BackendPolicy::D3D12 if platform.supports(BackendKind::D3D11) => Some(BackendKind::D3D11),
            _ => None,
        }
    }

    /// 是否有验证开关
    pub fn has_validation(&self) -> bool {
        matches!(self, BackendPolicy::D3D11 | BackendPolicy::D3D12 | BackendPolicy::Vulkan)
    }

    /// 把验证级别翻译为后端的创建参数
    ///
    /// 未设置时保持后端默认值；0 关闭所有调试标志；>= 1 开启标准验证；
    /// >= 2 在支持的后端上额外开启 GPU 辅助验证。
    pub fn create_info(&self, validation: ValidationLevel) -> BackendCreateInfo {
        let level = validation.level();
        match self {
            BackendPolicy::D3D11 => {
                let mut info = D3D11CreateInfo::default();
                match level {
                    Some(0) => info.debug_flags = D3D11DebugFlags::empty(),
                    Some(_) => info.debug_flags = D3D11DebugFlags::all(),
                    None => {}
                }
                BackendCreateInfo::D3D11(info)
            }
            BackendPolicy::D3D12 => {
                let mut info = D3D12CreateInfo::default();
                match level {
                    Some(0) => {
                        info.enable_debug_layer = false;
                        info.enable_gpu_based_validation = false;
                    }
                    Some(n) => {
                        info.enable_debug_layer = true;
                        if n >= 2 {
                            info.enable_gpu_based_validation = true;
                        }
                    }
                    None => {}
                }
                BackendCreateInfo::D3D12(info)
            }
            BackendPolicy::Vulkan => {
                let mut info = VulkanCreateInfo::default();
                if let Some(n) = level {
                    info.enable_validation = n >= 1;
                }
                BackendCreateInfo::Vulkan(info)
            }
            BackendPolicy::Null => BackendCreateInfo::Null,
            BackendPolicy::Gl => BackendCreateInfo::Gl,
            BackendPolicy::Metal => BackendCreateInfo::Metal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_round_trips_kind() {
        for kind in BackendKind::ALL {
            assert_eq!(BackendPolicy::for_kind(kind).kind(), kind);
        }
    }

    #[test]
    fn test_only_d3d12_falls_back() {
        assert_eq!(BackendPolicy::D3D12.fallback(Platform::Windows), Some(BackendKind::D3D11));
        assert_eq!(BackendPolicy::D3D12.fallback(Platform::Linux), None);
        for kind in BackendKind::ALL.into_iter().filter(|k| *k != BackendKind::D3D12) {
            assert_eq!(BackendPolicy::for_kind(kind).fallback(Platform::Windows), None);
        }
    }

    #[test]
    fn test_d3d12_validation_levels() {
        let policy = BackendPolicy::D3D12;
        assert_eq!(
            policy.create_info(ValidationLevel::new(2)),
            BackendCreateInfo::D3D12(D3D12CreateInfo {
                enable_debug_layer: true,
                enable_gpu_based_validation: true,
            })
        );
        assert_eq!(
            policy.create_info(ValidationLevel::new(1)),
            BackendCreateInfo::D3D12(D3D12CreateInfo {
                enable_debug_layer: true,
                enable_gpu_based_validation: false,
            })
        );
        assert_eq!(
            policy.create_info(ValidationLevel::new(0)),
            BackendCreateInfo::D3D12(D3D12CreateInfo {
                enable_debug_layer: false,
                enable_gpu_based_validation: false,
            })
        );
        assert_eq!(
            policy.create_info(ValidationLevel::UNSET),
            BackendCreateInfo::D3D12(D3D12CreateInfo::default())
        );
    }

    #[test]
    fn test_d3d11_validation_flags() {
        let on = BackendPolicy::D3D11.create_info(ValidationLevel::new(1));
        assert_eq!(
            on,
            BackendCreateInfo::D3D11(D3D11CreateInfo {
                debug_flags: D3D11DebugFlags::CREATE_DEBUG_DEVICE
                    | D3D11DebugFlags::VERIFY_COMMITTED_SHADER_RESOURCES
                    | D3D11DebugFlags::VERIFY_COMMITTED_RESOURCE_RELEVANCE,
            })
        );
        let off = BackendPolicy::D3D11.create_info(ValidationLevel::new(0));
        assert_eq!(off, BackendCreateInfo::D3D11(D3D11CreateInfo { debug_flags: D3D11DebugFlags::empty() }));
    }

    #[test]
    fn test_vulkan_validation() {
        assert_eq!(
            BackendPolicy::Vulkan.create_info(ValidationLevel::new(3)),
            BackendCreateInfo::Vulkan(VulkanCreateInfo { enable_validation: true })
        );
        assert_eq!(
            BackendPolicy::Vulkan.create_info(ValidationLevel::new(0)),
            BackendCreateInfo::Vulkan(VulkanCreateInfo { enable_validation: false })
        );
    }

    #[test]
    fn test_gl_structure() {
        let gl = BackendPolicy::Gl;
        assert!(gl.single_context());
        assert!(gl.folds_surface());
        assert!(gl.requires_window(Platform::Linux));
        assert!(!gl.requires_window(Platform::MacOs));
        assert!(!gl.enumerates_adapters());
        assert!(!BackendPolicy::Vulkan.single_context());
    }
}
