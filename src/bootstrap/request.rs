//! 引导请求

use crate::core::config::{AdapterSelection, Config};
use crate::gfx::{AdapterType, BackendKind, FeatureLevel, SwapChainDesc, ValidationLevel};

/// 一次引导所需的全部输入，引导开始后不再改变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
    pub backend: BackendKind,
    pub validation: ValidationLevel,
    pub adapter_index: u32,
    pub adapter_type: AdapterType,
    pub adapter_selection: AdapterSelection,
    pub min_feature_level: FeatureLevel,
    pub deferred_contexts: u32,
    pub swapchain: SwapChainDesc,
    pub fullscreen: bool,
    /// 全屏时使用的显示模式（枚举结果中的下标）
    pub display_mode: usize,
}

impl Default for BootstrapRequest {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl BootstrapRequest {
    pub fn from_config(config: &Config) -> Self {
        let graphics = &config.graphics;
        let swapchain = &config.swapchain;
        Self {
            backend: graphics.backend,
            validation: graphics.validation(),
            adapter_index: graphics.adapter.index,
            adapter_type: graphics.adapter.adapter_type,
            adapter_selection: graphics.adapter.selection,
            min_feature_level: graphics.min_feature_level,
            deferred_contexts: graphics.deferred_contexts,
            swapchain: SwapChainDesc {
                width: config.window.width,
                height: config.window.height,
                color_format: swapchain.color_format,
                depth_format: swapchain.depth_format,
                buffer_count: swapchain.buffer_count,
                vsync: swapchain.vsync,
            },
            fullscreen: swapchain.fullscreen,
            display_mode: swapchain.display_mode,
        }
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.graphics.backend = BackendKind::Vulkan;
        config.graphics.validation_level = Some(2);
        config.graphics.adapter.adapter_type = AdapterType::Software;
        config.window.width = 800;
        config.swapchain.buffer_count = 3;

        let request = BootstrapRequest::from_config(&config);
        assert_eq!(request.backend, BackendKind::Vulkan);
        assert_eq!(request.validation, ValidationLevel::new(2));
        assert_eq!(request.adapter_type, AdapterType::Software);
        assert_eq!(request.swapchain.width, 800);
        assert_eq!(request.swapchain.buffer_count, 3);
    }

    #[test]
    fn test_negative_validation_is_unset() {
        let mut config = Config::default();
        config.graphics.validation_level = Some(-1);
        assert!(BootstrapRequest::from_config(&config).validation.is_unset());
    }
}
