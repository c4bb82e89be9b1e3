//! 原生运行时加载
//!
//! 部分后端在获得工厂之前需要先加载原生动态库（Vulkan 加载器、
//! `d3d11.dll`、`d3d12.dll`、`opengl32.dll`），或确认系统设备存在（Metal）。
//! 每个后端的加载在进程内只执行一次：成功或失败的结果都缓存在
//! `RuntimeLoader::shared()` 中，任意解析器重复解析同一后端都不会再次加载。

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::{debug, info, warn};

use super::types::BackendKind;
use crate::core::error::{GfxResult, GraphicsError};

/// 运行时加载器
#[derive(Default)]
pub struct RuntimeLoader {
    outcomes: HashMap<BackendKind, GfxResult<()>>,
    load_attempts: HashMap<BackendKind, u32>,
    /// 保持 Vulkan 加载器库常驻
    vulkan_entry: Option<ash::Entry>,
}

impl fmt::Debug for RuntimeLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeLoader")
            .field("outcomes", &self.outcomes)
            .field("load_attempts", &self.load_attempts)
            .field("vulkan_loaded", &self.vulkan_entry.is_some())
            .finish()
    }
}

impl RuntimeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程内共享的加载器
    pub fn shared() -> &'static Mutex<RuntimeLoader> {
        static SHARED: OnceLock<Mutex<RuntimeLoader>> = OnceLock::new();
        SHARED.get_or_init(|| Mutex::new(RuntimeLoader::new()))
    }

    /// 锁定共享加载器；加载结果只在插入时写入，中毒后仍可继续使用
    pub fn lock_shared() -> MutexGuard<'static, RuntimeLoader> {
        Self::shared().lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 确保后端运行时已加载，结果按后端缓存
    pub fn ensure_loaded(&mut self, kind: BackendKind) -> GfxResult<()> {
        if let Some(outcome) = self.outcomes.get(&kind) {
            debug!(backend = ?kind, "Runtime load already attempted");
            return outcome.clone();
        }

        *self.load_attempts.entry(kind).or_insert(0) += 1;
        let outcome = self.load(kind);
        match &outcome {
            Ok(()) => info!(backend = ?kind, "Native runtime loaded"),
            Err(e) => warn!(backend = ?kind, error = %e, "Native runtime unavailable"),
        }
        self.outcomes.insert(kind, outcome.clone());
        outcome
    }

    /// 实际执行加载的次数（用于确认加载是幂等的）
    pub fn load_attempts(&self, kind: BackendKind) -> u32 {
        self.load_attempts.get(&kind).copied().unwrap_or(0)
    }

    /// 已加载的 Vulkan 入口
    pub fn vulkan_entry(&self) -> Option<&ash::Entry> {
        self.vulkan_entry.as_ref()
    }

    fn load(&mut self, kind: BackendKind) -> GfxResult<()> {
        match kind {
            BackendKind::Null => Ok(()),
            BackendKind::Vulkan => {
                // SAFETY: 加载器库在 `vulkan_entry` 存活期间保持常驻
                let entry = unsafe { ash::Entry::load() }
                    .map_err(|e| GraphicsError::unavailable(kind, format!("Vulkan loader: {}", e)))?;
                self.vulkan_entry = Some(entry);
                Ok(())
            }
            BackendKind::D3D11 => load_library(kind, "d3d11.dll"),
            BackendKind::D3D12 => load_library(kind, "d3d12.dll"),
            BackendKind::Gl => load_gl(kind),
            BackendKind::Metal => load_metal(kind),
        }
    }
}

/// D3D12 运行时必须导出的入口
const D3D12_ENTRY_POINTS: [&str; 3] = [
    "D3D12CreateDevice",
    "D3D12GetDebugInterface",
    "D3D12SerializeRootSignature",
];

/// D3D12 的可选加载步骤：解析 `d3d12.dll` 的入口函数
///
/// 动态库存在但入口缺失（例如过旧的运行时）时返回 `FeatureNegotiation`，
/// 与运行时完全不可用区分开。
#[cfg(target_os = "windows")]
pub fn negotiate_d3d12() -> GfxResult<()> {
    use windows::core::{HSTRING, PCSTR};
    use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

    let kind = BackendKind::D3D12;
    let module = unsafe { LoadLibraryW(&HSTRING::from("d3d12.dll")) }.map_err(|e| {
        GraphicsError::FeatureNegotiation { kind, reason: format!("d3d12.dll: {}", e) }
    })?;
    check_entry_points(kind, &D3D12_ENTRY_POINTS, |name| {
        let symbol = format!("{}\0", name);
        unsafe { GetProcAddress(module, PCSTR(symbol.as_ptr())) }.is_some()
    })
}

#[cfg(not(target_os = "windows"))]
pub fn negotiate_d3d12() -> GfxResult<()> {
    Err(GraphicsError::FeatureNegotiation {
        kind: BackendKind::D3D12,
        reason: "D3D12 entry points can only be resolved on Windows".to_string(),
    })
}

fn check_entry_points(kind: BackendKind, names: &[&str], resolve: impl Fn(&str) -> bool) -> GfxResult<()> {
    let missing: Vec<&str> = names.iter().copied().filter(|name| !resolve(name)).collect();
    if missing.is_empty() {
        debug!(backend = ?kind, "Runtime entry points resolved");
        return Ok(());
    }
    Err(GraphicsError::FeatureNegotiation {
        kind,
        reason: format!("missing entry points: {}", missing.join(", ")),
    })
}

#[cfg(target_os = "windows")]
fn load_library(kind: BackendKind, name: &str) -> GfxResult<()> {
    use windows::core::HSTRING;
    use windows::Win32::System::LibraryLoader::LoadLibraryW;

    // 模块在进程生命周期内保持加载，与原生运行时的使用方式一致
    unsafe { LoadLibraryW(&HSTRING::from(name)) }
        .map(|_| ())
        .map_err(|e| GraphicsError::unavailable(kind, format!("{}: {}", name, e)))
}

#[cfg(not(target_os = "windows"))]
fn load_library(kind: BackendKind, name: &str) -> GfxResult<()> {
    Err(GraphicsError::unavailable(
        kind,
        format!("{} can only be loaded on Windows", name),
    ))
}

#[cfg(target_os = "windows")]
fn load_gl(kind: BackendKind) -> GfxResult<()> {
    load_library(kind, "opengl32.dll")
}

#[cfg(not(target_os = "windows"))]
fn load_gl(kind: BackendKind) -> GfxResult<()> {
    if cfg!(target_os = "macos") {
        return Err(GraphicsError::unavailable(kind, "OpenGL is not provided on macOS"));
    }
    // 系统 GL/EGL 库由 wgpu 在创建实例时解析
    Ok(())
}

#[cfg(target_os = "macos")]
fn load_metal(kind: BackendKind) -> GfxResult<()> {
    match metal::Device::system_default() {
        Some(device) => {
            debug!(device = %device.name(), "Metal system device found");
            Ok(())
        }
        None => Err(GraphicsError::unavailable(kind, "no Metal system device")),
    }
}

#[cfg(not(target_os = "macos"))]
fn load_metal(kind: BackendKind) -> GfxResult<()> {
    Err(GraphicsError::unavailable(kind, "Metal is only available on macOS"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_runtime_loads_once() {
        let mut loader = RuntimeLoader::new();
        assert!(loader.ensure_loaded(BackendKind::Null).is_ok());
        assert!(loader.ensure_loaded(BackendKind::Null).is_ok());
        assert_eq!(loader.load_attempts(BackendKind::Null), 1);
        assert_eq!(loader.load_attempts(BackendKind::Vulkan), 0);
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_failed_load_is_cached() {
        let mut loader = RuntimeLoader::new();
        let first = loader.ensure_loaded(BackendKind::D3D12).unwrap_err();
        let second = loader.ensure_loaded(BackendKind::D3D12).unwrap_err();
        assert_eq!(first, second);
        assert!(matches!(first, GraphicsError::BackendUnavailable { kind: BackendKind::D3D12, .. }));
        assert_eq!(loader.load_attempts(BackendKind::D3D12), 1);
    }

    #[test]
    fn test_missing_entry_points_fail_negotiation() {
        let all = check_entry_points(BackendKind::D3D12, &D3D12_ENTRY_POINTS, |_| true);
        assert!(all.is_ok());

        let err = check_entry_points(BackendKind::D3D12, &D3D12_ENTRY_POINTS, |name| {
            name != "D3D12SerializeRootSignature"
        })
        .unwrap_err();
        assert_eq!(
            err,
            GraphicsError::FeatureNegotiation {
                kind: BackendKind::D3D12,
                reason: "missing entry points: D3D12SerializeRootSignature".to_string(),
            }
        );
        assert!(!err.triggers_fallback());
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_d3d12_negotiation_needs_windows() {
        let err = negotiate_d3d12().unwrap_err();
        assert!(matches!(err, GraphicsError::FeatureNegotiation { kind: BackendKind::D3D12, .. }));
    }

    #[test]
    fn test_vulkan_load_is_idempotent() {
        // 宿主可能没有 Vulkan 加载器，这里只检查结果被缓存
        let mut loader = RuntimeLoader::new();
        let first = loader.ensure_loaded(BackendKind::Vulkan);
        let second = loader.ensure_loaded(BackendKind::Vulkan);
        assert_eq!(first, second);
        assert_eq!(loader.load_attempts(BackendKind::Vulkan), 1);
        assert_eq!(loader.vulkan_entry().is_some(), first.is_ok());
    }
}
