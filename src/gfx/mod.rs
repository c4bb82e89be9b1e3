//! 图形后端模块
//!
//! 本模块定义了引导流程访问原生图形 API 的统一契约，以及具体的能力提供者：
//! - `null`：始终可用的软件后端，用于无头运行和测试
//! - `wgpu`：基于 wgpu 的 D3D12 / Vulkan / Metal / OpenGL 后端
//! - `dx11`：直接使用 `windows` crate 的 Direct3D 11 后端（仅 Windows）
//!
//! 所有后端都实现了 `EngineFactory` trait，由 `FactoryResolver` 按后端种类解析，
//! 引导流程因此不依赖任何具体的图形 API。

pub mod backend;
#[cfg(target_os = "windows")]
pub mod dx11;
pub mod loader;
pub mod null;
pub mod resolver;
pub mod swapchain;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;
pub mod wgpu;
pub mod window;

pub use backend::{
    BackendCreateInfo, ContextRole, D3D11CreateInfo, D3D11DebugFlags, D3D12CreateInfo, Device,
    DeviceAndContexts, EngineCreateInfo, EngineFactory, ExecutionContext, NativeObject, SwapChain,
    VulkanCreateInfo, MAX_DEFERRED_CONTEXTS,
};
pub use loader::RuntimeLoader;
pub use null::NullFactory;
pub use resolver::{FactoryResolver, SystemResolver};
pub use swapchain::{FullScreenModeDesc, SwapChainDesc};
pub use types::{
    AdapterDescriptor, AdapterType, BackendKind, DisplayModeDescriptor, FeatureLevel, TextureFormat,
    ValidationLevel,
};
pub use window::NativeWindow;
pub use self::wgpu::WgpuFactory;
#[cfg(target_os = "windows")]
pub use dx11::Dx11Factory;
