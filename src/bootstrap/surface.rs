//! 交换链构建

use crate::core::error::GfxResult;
use crate::core::platform::Platform;
use crate::gfx::{Device, EngineFactory, ExecutionContext, FullScreenModeDesc, NativeWindow, SwapChain, SwapChainDesc};
use crate::{bootstrap_debug, bootstrap_info};

/// 交换链构建器
pub struct SurfaceBuilder<'a> {
    factory: &'a dyn EngineFactory,
}

impl<'a> SurfaceBuilder<'a> {
    pub fn new(factory: &'a dyn EngineFactory) -> Self {
        Self { factory }
    }

    /// 应用平台对交换链的约束，必须在创建之前调用
    pub fn effective_desc(desc: &SwapChainDesc, platform: Platform) -> SwapChainDesc {
        let mut desc = *desc;
        if let Some(min) = platform.min_swapchain_buffers() {
            desc.buffer_count = desc.buffer_count.max(min);
        }
        desc
    }

    /// 为窗口创建交换链
    ///
    /// 没有窗口时什么也不做；`existing` 已存在（设备创建时已一并创建）时直接返回它，
    /// 同一个设备永远只有一个交换链。
    pub fn build(
        &self,
        device: &Device,
        immediate_context: &ExecutionContext,
        existing: Option<SwapChain>,
        desc: &SwapChainDesc,
        fullscreen: &FullScreenModeDesc,
        window: Option<&NativeWindow>,
    ) -> GfxResult<Option<SwapChain>> {
        if existing.is_some() {
            bootstrap_debug!(backend = ?device.kind(), "Swapchain already created with the device");
            return Ok(existing);
        }
        let Some(window) = window else {
            bootstrap_debug!("No window, running headless");
            return Ok(None);
        };

        let swapchain = self
            .factory
            .create_swapchain(device, immediate_context, desc, fullscreen, window)?;
        bootstrap_info!(
            backend = ?device.kind(),
            width = swapchain.desc().width,
            height = swapchain.desc().height,
            buffers = swapchain.desc().buffer_count,
            color = ?swapchain.desc().color_format,
            depth = ?swapchain.desc().depth_format,
            "Swapchain created"
        );
        Ok(Some(swapchain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::testing::{fake_window, Event, Script, ScriptedResolver};
    use crate::gfx::{BackendCreateInfo, BackendKind, EngineCreateInfo, FactoryResolver, FeatureLevel};

    #[test]
    fn test_macos_raises_buffer_count() {
        let desc = SwapChainDesc { buffer_count: 2, ..Default::default() };
        assert_eq!(SurfaceBuilder::effective_desc(&desc, Platform::MacOs).buffer_count, 3);
        assert_eq!(SurfaceBuilder::effective_desc(&desc, Platform::Windows).buffer_count, 2);

        let more = SwapChainDesc { buffer_count: 4, ..Default::default() };
        assert_eq!(SurfaceBuilder::effective_desc(&more, Platform::MacOs).buffer_count, 4);
    }

    #[test]
    fn test_headless_and_existing_are_noops() {
        let mut resolver = ScriptedResolver::new(Script::default());
        let ledger = resolver.ledger();
        let factory = resolver.resolve(BackendKind::Vulkan).unwrap();
        let created = factory
            .create_device_and_contexts(&EngineCreateInfo {
                adapter_id: None,
                min_feature_level: FeatureLevel::default(),
                num_deferred_contexts: 0,
                backend: BackendCreateInfo::default_for(BackendKind::Vulkan),
            })
            .unwrap();
        let builder = SurfaceBuilder::new(factory.as_ref());
        let desc = SwapChainDesc { width: 640, height: 480, ..Default::default() };
        let fullscreen = FullScreenModeDesc::default();

        let none = builder
            .build(&created.device, &created.contexts[0], None, &desc, &fullscreen, None)
            .unwrap();
        assert!(none.is_none());

        let window = fake_window();
        let first = builder
            .build(&created.device, &created.contexts[0], None, &desc, &fullscreen, Some(&window))
            .unwrap();
        assert!(first.is_some());
        let again = builder
            .build(&created.device, &created.contexts[0], first, &desc, &fullscreen, Some(&window))
            .unwrap();
        assert!(again.is_some());

        assert_eq!(ledger.lock().unwrap().count(&Event::CreateSwapChain(BackendKind::Vulkan)), 1);
    }
}
