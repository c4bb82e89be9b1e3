//! 图形后端工厂的统一契约
//!
//! 本模块定义了所有原生后端（D3D11、D3D12、Vulkan、Metal、OpenGL 等）的
//! 能力提供者必须实现的接口。引导流程只通过 `EngineFactory` 访问原生后端，
//! 从而在不同的图形 API 之间保持一致的初始化过程。
//!
//! # 设计理念
//!
//! - **不透明句柄**：设备、执行上下文、交换链都携带后端私有的原生对象，
//!   引导流程不关心其内部结构
//! - **两次调用枚举**：适配器和显示模式枚举保留原生 API 的
//!   "先取数量、再填充" 的调用形式
//! - **每个后端一套创建参数**：验证标志等差异以强类型表达

use std::any::Any;
use std::fmt;

use bitflags::bitflags;

use super::swapchain::{FullScreenModeDesc, SwapChainDesc};
use super::types::{
    AdapterDescriptor, BackendKind, DisplayModeDescriptor, FeatureLevel, TextureFormat,
};
use super::window::NativeWindow;
use crate::core::error::GfxResult;

/// 后端私有的原生对象
///
/// 任何 `Send + Sync + Debug` 的类型都自动满足，可以通过 `as_any` 向下转换。
pub trait NativeObject: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> NativeObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 逻辑图形设备
#[derive(Debug)]
pub struct Device {
    kind: BackendKind,
    adapter: Option<AdapterDescriptor>,
    native: Box<dyn NativeObject>,
}

impl Device {
    pub fn new(kind: BackendKind, adapter: Option<AdapterDescriptor>, native: impl NativeObject) -> Self {
        Self { kind, adapter, native: Box::new(native) }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// 创建设备时后端实际使用的适配器（后端无法报告时为 `None`）
    pub fn adapter(&self) -> Option<&AdapterDescriptor> {
        self.adapter.as_ref()
    }

    /// 向下转换为后端私有的设备对象
    pub fn native<T: Any>(&self) -> Option<&T> {
        (*self.native).as_any().downcast_ref::<T>()
    }
}

/// 单个设备最多创建的延迟上下文数量
pub const MAX_DEFERRED_CONTEXTS: u32 = 64;

/// 执行上下文的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRole {
    /// 主命令提交流
    Immediate,
    /// 可在其他线程并行录制的命令流
    Deferred,
}

/// 执行上下文
#[derive(Debug)]
pub struct ExecutionContext {
    kind: BackendKind,
    role: ContextRole,
    index: usize,
    native: Box<dyn NativeObject>,
}

impl ExecutionContext {
    pub fn new(kind: BackendKind, role: ContextRole, index: usize, native: impl NativeObject) -> Self {
        Self { kind, role, index, native: Box::new(native) }
    }

    pub fn immediate(kind: BackendKind, native: impl NativeObject) -> Self {
        Self::new(kind, ContextRole::Immediate, 0, native)
    }

    pub fn deferred(kind: BackendKind, index: usize, native: impl NativeObject) -> Self {
        Self::new(kind, ContextRole::Deferred, index, native)
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn role(&self) -> ContextRole {
        self.role
    }

    /// 上下文序号：立即上下文为 0，延迟上下文从 1 开始
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn native<T: Any>(&self) -> Option<&T> {
        (*self.native).as_any().downcast_ref::<T>()
    }
}

/// 交换链（呈现表面）
#[derive(Debug)]
pub struct SwapChain {
    kind: BackendKind,
    desc: SwapChainDesc,
    native: Box<dyn NativeObject>,
}

impl SwapChain {
    pub fn new(kind: BackendKind, desc: SwapChainDesc, native: impl NativeObject) -> Self {
        Self { kind, desc, native: Box::new(native) }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// 交换链实际采用的描述（格式可能被后端调整）
    pub fn desc(&self) -> &SwapChainDesc {
        &self.desc
    }

    pub fn native<T: Any>(&self) -> Option<&T> {
        (*self.native).as_any().downcast_ref::<T>()
    }
}

/// 设备创建调用的产物：设备 + 按序排列的上下文（下标 0 为立即上下文）
#[derive(Debug)]
pub struct DeviceAndContexts {
    pub device: Device,
    pub contexts: Vec<ExecutionContext>,
}

bitflags! {
    /// D3D11 调试标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct D3D11DebugFlags: u32 {
        const CREATE_DEBUG_DEVICE = 0x01;
        const VERIFY_COMMITTED_SHADER_RESOURCES = 0x02;
        const VERIFY_COMMITTED_RESOURCE_RELEVANCE = 0x04;
    }
}

/// D3D11 专属创建参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct D3D11CreateInfo {
    pub debug_flags: D3D11DebugFlags,
}

impl Default for D3D11CreateInfo {
    fn default() -> Self {
        let debug_flags = if cfg!(debug_assertions) {
            D3D11DebugFlags::CREATE_DEBUG_DEVICE
        } else {
            D3D11DebugFlags::empty()
        };
        Self { debug_flags }
    }
}

/// D3D12 专属创建参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct D3D12CreateInfo {
    pub enable_debug_layer: bool,
    pub enable_gpu_based_validation: bool,
}

impl Default for D3D12CreateInfo {
    fn default() -> Self {
        Self {
            enable_debug_layer: cfg!(debug_assertions),
            enable_gpu_based_validation: false,
        }
    }
}

/// Vulkan 专属创建参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VulkanCreateInfo {
    pub enable_validation: bool,
}

impl Default for VulkanCreateInfo {
    fn default() -> Self {
        Self { enable_validation: cfg!(debug_assertions) }
    }
}

/// 各后端不同的创建参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCreateInfo {
    Null,
    D3D11(D3D11CreateInfo),
    D3D12(D3D12CreateInfo),
    Gl,
    Vulkan(VulkanCreateInfo),
    Metal,
}

impl BackendCreateInfo {
    /// 指定后端的默认创建参数
    pub fn default_for(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Null => BackendCreateInfo::Null,
            BackendKind::D3D11 => BackendCreateInfo::D3D11(D3D11CreateInfo::default()),
            BackendKind::D3D12 => BackendCreateInfo::D3D12(D3D12CreateInfo::default()),
            BackendKind::Gl => BackendCreateInfo::Gl,
            BackendKind::Vulkan => BackendCreateInfo::Vulkan(VulkanCreateInfo::default()),
            BackendKind::Metal => BackendCreateInfo::Metal,
        }
    }
}

/// 设备与上下文创建参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCreateInfo {
    /// 选定的适配器；`None` 表示由后端使用默认适配器
    pub adapter_id: Option<u32>,
    pub min_feature_level: FeatureLevel,
    pub num_deferred_contexts: u32,
    pub backend: BackendCreateInfo,
}

/// 原生后端的能力提供者
///
/// 每个工厂只绑定一个 `BackendKind`。
pub trait EngineFactory: fmt::Debug {
    fn kind(&self) -> BackendKind;

    /// 后端专属的可选加载步骤（例如加载 D3D12 运行时）
    ///
    /// 失败意味着后端存在但无法协商所需特性，应报告为 `FeatureNegotiation`。
    fn negotiate(&self) -> GfxResult<()> {
        Ok(())
    }

    /// 交换链是否自行切换独占全屏；否则全屏由窗口系统负责
    fn exclusive_fullscreen(&self) -> bool {
        false
    }

    /// 能否按创建参数开启 GPU 辅助验证
    fn supports_gpu_based_validation(&self) -> bool {
        true
    }

    /// 枚举适配器
    ///
    /// `adapters` 为 `None` 时只把总数写入 `count`；否则最多填充
    /// `adapters.len()` 项，并把实际填充的数量写回 `count`。
    fn enumerate_adapters(
        &self,
        min_feature_level: FeatureLevel,
        count: &mut u32,
        adapters: Option<&mut [AdapterDescriptor]>,
    );

    /// 枚举指定适配器、指定输出的全屏显示模式，调用形式同 `enumerate_adapters`
    fn enumerate_display_modes(
        &self,
        min_feature_level: FeatureLevel,
        adapter_id: u32,
        output_id: u32,
        format: TextureFormat,
        count: &mut u32,
        modes: Option<&mut [DisplayModeDescriptor]>,
    );

    /// 创建逻辑设备以及 1 个立即上下文和若干延迟上下文
    fn create_device_and_contexts(&self, info: &EngineCreateInfo) -> GfxResult<DeviceAndContexts>;

    /// 为窗口创建交换链，只能使用立即上下文
    fn create_swapchain(
        &self,
        device: &Device,
        immediate_context: &ExecutionContext,
        desc: &SwapChainDesc,
        fullscreen: &FullScreenModeDesc,
        window: &NativeWindow,
    ) -> GfxResult<SwapChain>;

    /// 在一次调用中同时创建设备和交换链（仅部分后端支持）
    fn create_device_and_swapchain(
        &self,
        info: &EngineCreateInfo,
        _desc: &SwapChainDesc,
        _window: &NativeWindow,
    ) -> GfxResult<(DeviceAndContexts, SwapChain)> {
        Err(crate::core::error::GraphicsError::device(
            info.backend_kind(),
            "combined device and swapchain creation is not supported",
        ))
    }
}

impl EngineCreateInfo {
    pub fn backend_kind(&self) -> BackendKind {
        match self.backend {
            BackendCreateInfo::Null => BackendKind::Null,
            BackendCreateInfo::D3D11(_) => BackendKind::D3D11,
            BackendCreateInfo::D3D12(_) => BackendKind::D3D12,
            BackendCreateInfo::Gl => BackendKind::Gl,
            BackendCreateInfo::Vulkan(_) => BackendKind::Vulkan,
            BackendCreateInfo::Metal => BackendKind::Metal,
        }
    }
}

/// 按 "先取数量、再填充" 的约定写出枚举结果，供各工厂实现复用
pub(crate) fn write_enumeration<T: Clone>(items: &[T], count: &mut u32, out: Option<&mut [T]>) {
    match out {
        None => *count = items.len() as u32,
        Some(out) => {
            let filled = items.len().min(out.len()).min(*count as usize);
            out[..filled].clone_from_slice(&items[..filled]);
            *count = filled as u32;
        }
    }
}
