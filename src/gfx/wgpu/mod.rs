//! wgpu 图形后端实现
//!
//! 本模块基于 wgpu 为 D3D12、Vulkan、Metal 和 OpenGL 提供 `EngineFactory`。
//! wgpu 负责与原生驱动交互，这里只做引导层的类型转换与调用约定适配。
//!
//! # 模块结构
//!
//! - `factory` - WgpuFactory（适配器枚举、设备与表面创建）
//! - `convert` - 引导层类型与 wgpu 类型之间的转换

mod convert;
mod factory;

pub use factory::{WgpuDeferredContext, WgpuDevice, WgpuFactory, WgpuImmediateContext, WgpuSurface};
