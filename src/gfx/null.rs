//! 空后端
//!
//! 不访问任何 GPU 的软件后端：只报告一个软件适配器、没有全屏显示模式，
//! 设备、上下文和交换链都是虚拟对象。用于无头运行以及在没有图形驱动的
//! 机器上验证引导流程。

use tracing::debug;

use super::backend::{
    write_enumeration, ContextRole, Device, DeviceAndContexts, EngineCreateInfo, EngineFactory,
    ExecutionContext, SwapChain, MAX_DEFERRED_CONTEXTS,
};
use super::swapchain::{FullScreenModeDesc, SwapChainDesc};
use super::types::{AdapterDescriptor, AdapterType, BackendKind, DisplayModeDescriptor, FeatureLevel, TextureFormat};
use super::window::NativeWindow;
use crate::core::error::{GfxResult, GraphicsError};

/// 虚拟设备
#[derive(Debug)]
pub struct NullDevice {
    pub adapter_name: String,
}

/// 虚拟执行上下文
#[derive(Debug)]
pub struct NullContext;

/// 虚拟交换链
#[derive(Debug)]
pub struct NullSwapChain {
    pub buffer_count: u32,
    pub fullscreen: bool,
}

/// 空后端工厂
#[derive(Debug)]
pub struct NullFactory {
    adapters: Vec<AdapterDescriptor>,
}

impl Default for NullFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl NullFactory {
    pub fn new() -> Self {
        Self {
            adapters: vec![AdapterDescriptor {
                name: "Null Software Adapter".to_string(),
                adapter_type: AdapterType::Software,
                ..Default::default()
            }],
        }
    }
}

impl EngineFactory for NullFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::Null
    }

    fn enumerate_adapters(
        &self,
        _min_feature_level: FeatureLevel,
        count: &mut u32,
        adapters: Option<&mut [AdapterDescriptor]>,
    ) {
        write_enumeration(&self.adapters, count, adapters);
    }

    fn enumerate_display_modes(
        &self,
        _min_feature_level: FeatureLevel,
        _adapter_id: u32,
        _output_id: u32,
        _format: TextureFormat,
        count: &mut u32,
        modes: Option<&mut [DisplayModeDescriptor]>,
    ) {
        write_enumeration::<DisplayModeDescriptor>(&[], count, modes);
    }

    fn create_device_and_contexts(&self, info: &EngineCreateInfo) -> GfxResult<DeviceAndContexts> {
        let adapter_index = info.adapter_id.unwrap_or(0) as usize;
        let adapter = self.adapters.get(adapter_index).cloned().ok_or_else(|| {
            GraphicsError::device(BackendKind::Null, format!("no adapter at index {}", adapter_index))
        })?;

        debug!(
            adapter = %adapter.name,
            deferred = info.num_deferred_contexts,
            "Creating null device"
        );

        let deferred = info.num_deferred_contexts.min(MAX_DEFERRED_CONTEXTS) as usize;
        let mut contexts = Vec::with_capacity(1 + deferred);
        contexts.push(ExecutionContext::immediate(BackendKind::Null, NullContext));
        for i in 0..deferred {
            contexts.push(ExecutionContext::deferred(BackendKind::Null, i + 1, NullContext));
        }

        let device = Device::new(
            BackendKind::Null,
            Some(adapter.clone()),
            NullDevice { adapter_name: adapter.name },
        );
        Ok(DeviceAndContexts { device, contexts })
    }

    fn create_swapchain(
        &self,
        device: &Device,
        immediate_context: &ExecutionContext,
        desc: &SwapChainDesc,
        fullscreen: &FullScreenModeDesc,
        _window: &NativeWindow,
    ) -> GfxResult<SwapChain> {
        if device.native::<NullDevice>().is_none() {
            return Err(GraphicsError::surface(BackendKind::Null, "device was not created by the null backend"));
        }
        if immediate_context.role() != ContextRole::Immediate {
            return Err(GraphicsError::surface(BackendKind::Null, "swapchain requires the immediate context"));
        }

        Ok(SwapChain::new(
            BackendKind::Null,
            *desc,
            NullSwapChain {
                buffer_count: desc.buffer_count,
                fullscreen: fullscreen.fullscreen,
            },
        ))
    }
}
