//! 后端工厂解析
//!
//! 按后端种类取得能力提供者：先检查平台是否编译了该后端，
//! 再通过进程内共享的 `RuntimeLoader` 执行一次性的运行时加载，最后构造工厂。

use std::sync::MutexGuard;

use tracing::debug;

use super::backend::EngineFactory;
use super::loader::RuntimeLoader;
use super::null::NullFactory;
use super::types::{BackendKind, DisplayModeDescriptor};
use super::wgpu::WgpuFactory;
use crate::core::error::{GfxResult, GraphicsError};
use crate::core::platform::Platform;

/// 工厂解析器
///
/// 解析失败只会返回 `BackendUnavailable`；适配器数量与特性协商不在这里判断。
pub trait FactoryResolver {
    fn resolve(&mut self, kind: BackendKind) -> GfxResult<Box<dyn EngineFactory>>;
}

/// 面向真实主机的解析器
#[derive(Debug)]
pub struct SystemResolver {
    platform: Platform,
    /// 窗口系统提供的全屏显示模式，转交给 wgpu 工厂
    display_modes: Vec<DisplayModeDescriptor>,
}

impl SystemResolver {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            display_modes: Vec::new(),
        }
    }

    pub fn with_display_modes(mut self, display_modes: Vec<DisplayModeDescriptor>) -> Self {
        self.display_modes = display_modes;
        self
    }

    /// 进程内共享的运行时加载器
    pub fn loader(&self) -> MutexGuard<'static, RuntimeLoader> {
        RuntimeLoader::lock_shared()
    }
}

impl FactoryResolver for SystemResolver {
    fn resolve(&mut self, kind: BackendKind) -> GfxResult<Box<dyn EngineFactory>> {
        if !self.platform.supports(kind) {
            return Err(GraphicsError::unavailable(
                kind,
                format!("not supported on {:?}", self.platform),
            ));
        }

        RuntimeLoader::lock_shared().ensure_loaded(kind)?;
        debug!(backend = ?kind, "Creating engine factory");

        match kind {
            BackendKind::Null => Ok(Box::new(NullFactory::new())),
            BackendKind::D3D11 => dx11_factory(),
            BackendKind::D3D12 | BackendKind::Vulkan | BackendKind::Metal | BackendKind::Gl => {
                Ok(Box::new(WgpuFactory::new(kind, self.display_modes.clone())?))
            }
        }
    }
}

#[cfg(target_os = "windows")]
fn dx11_factory() -> GfxResult<Box<dyn EngineFactory>> {
    Ok(Box::new(super::dx11::Dx11Factory::new()?))
}

#[cfg(not(target_os = "windows"))]
fn dx11_factory() -> GfxResult<Box<dyn EngineFactory>> {
    Err(GraphicsError::unavailable(BackendKind::D3D11, "D3D11 support is not compiled in"))
}
