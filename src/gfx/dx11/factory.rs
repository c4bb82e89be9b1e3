//! D3D11 后端工厂
//!
//! # 初始化流程
//!
//! 1. 创建 DXGI 工厂（解析阶段）
//! 2. 协商 `IDXGIFactory2`（flip 模型交换链需要）
//! 3. 枚举适配器，逐个探测是否满足最低特性级别
//! 4. 创建设备、立即上下文和延迟上下文
//! 5. 为窗口创建交换链

use raw_window_handle::RawWindowHandle;
use tracing::{debug, info, warn};
use windows::{
    core::*, Win32::Foundation::*, Win32::Graphics::Direct3D::*, Win32::Graphics::Direct3D11::*,
    Win32::Graphics::Dxgi::Common::*, Win32::Graphics::Dxgi::*,
};

use crate::core::error::{GfxResult, GraphicsError};
use crate::gfx::backend::{
    write_enumeration, BackendCreateInfo, ContextRole, D3D11DebugFlags, Device, DeviceAndContexts,
    EngineCreateInfo, EngineFactory, ExecutionContext, SwapChain, MAX_DEFERRED_CONTEXTS,
};
use crate::gfx::swapchain::{FullScreenModeDesc, SwapChainDesc};
use crate::gfx::types::{
    AdapterDescriptor, AdapterType, BackendKind, DisplayModeDescriptor, FeatureLevel, TextureFormat,
};
use crate::gfx::window::NativeWindow;

const KIND: BackendKind = BackendKind::D3D11;

/// D3D11 设备
#[derive(Debug)]
pub struct Dx11Device {
    pub device: ID3D11Device,
    pub feature_level: D3D_FEATURE_LEVEL,
    /// 引擎侧的调试校验标志
    pub debug_flags: D3D11DebugFlags,
}

/// D3D11 设备上下文（立即或延迟）
#[derive(Debug)]
pub struct Dx11Context {
    pub context: ID3D11DeviceContext,
}

/// D3D11 交换链
#[derive(Debug)]
pub struct Dx11SwapChain {
    pub swap_chain: IDXGISwapChain1,
}

/// D3D11 后端工厂
#[derive(Debug)]
pub struct Dx11Factory {
    factory: IDXGIFactory1,
}

// D3D11 设备与 DXGI 对象是自由线程的；设备上下文的并发使用由调用方负责
unsafe impl Send for Dx11Device {}
unsafe impl Sync for Dx11Device {}
unsafe impl Send for Dx11Context {}
unsafe impl Sync for Dx11Context {}
unsafe impl Send for Dx11SwapChain {}
unsafe impl Sync for Dx11SwapChain {}

impl Dx11Factory {
    pub fn new() -> GfxResult<Self> {
        let factory: IDXGIFactory1 = unsafe { CreateDXGIFactory1() }
            .map_err(|e| GraphicsError::unavailable(KIND, format!("CreateDXGIFactory1 failed: {}", e)))?;
        Ok(Self { factory })
    }

    /// 满足最低特性级别的适配器，保持 DXGI 报告的顺序
    fn adapters(&self, min_feature_level: FeatureLevel) -> Vec<(IDXGIAdapter1, DXGI_ADAPTER_DESC1)> {
        let levels = feature_levels(min_feature_level);
        let mut adapters = Vec::new();
        if levels.is_empty() {
            return adapters;
        }

        let mut index = 0;
        // EnumAdapters1 在越过末尾时返回 DXGI_ERROR_NOT_FOUND
        while let Ok(adapter) = unsafe { self.factory.EnumAdapters1(index) } {
            index += 1;
            let Ok(desc) = (unsafe { adapter.GetDesc1() }) else {
                continue;
            };

            // 只探测特性级别，不保留设备
            let created = unsafe {
                D3D11CreateDevice(
                    &adapter,
                    D3D_DRIVER_TYPE_UNKNOWN,
                    HMODULE::default(),
                    D3D11_CREATE_DEVICE_FLAG::default(),
                    Some(levels.as_slice()),
                    D3D11_SDK_VERSION,
                    None,
                    None,
                    None,
                )
            };
            if created.is_ok() {
                adapters.push((adapter, desc));
            } else {
                debug!(adapter = %adapter_name(&desc), "Adapter below minimum feature level");
            }
        }
        adapters
    }
}

impl EngineFactory for Dx11Factory {
    fn kind(&self) -> BackendKind {
        KIND
    }

    fn exclusive_fullscreen(&self) -> bool {
        true
    }

    fn negotiate(&self) -> GfxResult<()> {
        self.factory
            .cast::<IDXGIFactory2>()
            .map(|_| ())
            .map_err(|e| GraphicsError::FeatureNegotiation {
                kind: KIND,
                reason: format!("IDXGIFactory2 is not available: {}", e),
            })
    }

    fn enumerate_adapters(
        &self,
        min_feature_level: FeatureLevel,
        count: &mut u32,
        adapters: Option<&mut [AdapterDescriptor]>,
    ) {
        let descriptors: Vec<AdapterDescriptor> = self
            .adapters(min_feature_level)
            .iter()
            .map(|(adapter, desc)| adapter_descriptor(adapter, desc))
            .collect();
        write_enumeration(&descriptors, count, adapters);
    }

    fn enumerate_display_modes(
        &self,
        min_feature_level: FeatureLevel,
        adapter_id: u32,
        output_id: u32,
        format: TextureFormat,
        count: &mut u32,
        modes: Option<&mut [DisplayModeDescriptor]>,
    ) {
        let adapters = self.adapters(min_feature_level);
        let modes_list = adapters
            .get(adapter_id as usize)
            .and_then(|(adapter, _)| unsafe { adapter.EnumOutputs(output_id) }.ok())
            .map(|output| display_modes(&output, format))
            .unwrap_or_default();
        write_enumeration(&modes_list, count, modes);
    }

    fn create_device_and_contexts(&self, info: &EngineCreateInfo) -> GfxResult<DeviceAndContexts> {
        let debug_flags = match info.backend {
            BackendCreateInfo::D3D11(create_info) => create_info.debug_flags,
            other => {
                return Err(GraphicsError::device(
                    KIND,
                    format!("unexpected create info {:?}", other),
                ))
            }
        };

        let levels = feature_levels(info.min_feature_level);
        if levels.is_empty() {
            return Err(GraphicsError::device(
                KIND,
                format!("feature level {} is above what D3D11 provides", info.min_feature_level),
            ));
        }

        let (adapter, descriptor) = match info.adapter_id {
            Some(index) => {
                let mut adapters = self.adapters(info.min_feature_level);
                if (index as usize) >= adapters.len() {
                    return Err(GraphicsError::device(
                        KIND,
                        format!("adapter {} not found ({} enumerated)", index, adapters.len()),
                    ));
                }
                let (adapter, desc) = adapters.swap_remove(index as usize);
                let descriptor = adapter_descriptor(&adapter, &desc);
                let adapter: IDXGIAdapter = adapter
                    .cast()
                    .map_err(|e| GraphicsError::device(KIND, e.to_string()))?;
                (Some(adapter), Some(descriptor))
            }
            None => (None, None),
        };
        let driver_type = if adapter.is_some() { D3D_DRIVER_TYPE_UNKNOWN } else { D3D_DRIVER_TYPE_HARDWARE };

        let mut flags = D3D11_CREATE_DEVICE_BGRA_SUPPORT;
        if debug_flags.contains(D3D11DebugFlags::CREATE_DEBUG_DEVICE) {
            flags |= D3D11_CREATE_DEVICE_DEBUG;
        }

        let mut device: Option<ID3D11Device> = None;
        let mut immediate: Option<ID3D11DeviceContext> = None;
        let mut feature_level = D3D_FEATURE_LEVEL::default();
        unsafe {
            D3D11CreateDevice(
                adapter.as_ref(),
                driver_type,
                HMODULE::default(),
                flags,
                Some(levels.as_slice()),
                D3D11_SDK_VERSION,
                Some(&mut device),
                Some(&mut feature_level),
                Some(&mut immediate),
            )
        }
        .map_err(|e| GraphicsError::device(KIND, format!("D3D11CreateDevice failed: {}", e)))?;

        let device = device.ok_or_else(|| GraphicsError::device(KIND, "D3D11CreateDevice returned no device"))?;
        let immediate =
            immediate.ok_or_else(|| GraphicsError::device(KIND, "D3D11CreateDevice returned no immediate context"))?;
        info!(?feature_level, ?debug_flags, "D3D11 device created");

        let deferred_count = info.num_deferred_contexts.min(MAX_DEFERRED_CONTEXTS) as usize;
        let mut contexts = Vec::with_capacity(1 + deferred_count);
        contexts.push(ExecutionContext::immediate(KIND, Dx11Context { context: immediate }));
        for i in 0..deferred_count {
            let mut deferred: Option<ID3D11DeviceContext> = None;
            match unsafe { device.CreateDeferredContext(0, Some(&mut deferred)) } {
                Ok(()) => {
                    if let Some(context) = deferred {
                        contexts.push(ExecutionContext::deferred(KIND, i + 1, Dx11Context { context }));
                    }
                }
                Err(e) => {
                    // 已创建的上下文仍然可用
                    warn!(index = i + 1, error = %e, "CreateDeferredContext failed");
                    break;
                }
            }
        }

        let device = Device::new(KIND, descriptor, Dx11Device { device, feature_level, debug_flags });
        Ok(DeviceAndContexts { device, contexts })
    }

    fn create_swapchain(
        &self,
        device: &Device,
        immediate_context: &ExecutionContext,
        desc: &SwapChainDesc,
        fullscreen: &FullScreenModeDesc,
        window: &NativeWindow,
    ) -> GfxResult<SwapChain> {
        let native = device
            .native::<Dx11Device>()
            .ok_or_else(|| GraphicsError::surface(KIND, "device was not created by the D3D11 backend"))?;
        if immediate_context.role() != ContextRole::Immediate {
            return Err(GraphicsError::surface(KIND, "swapchain requires the immediate context"));
        }

        let hwnd = match window.window {
            RawWindowHandle::Win32(handle) => HWND(handle.hwnd.get() as *mut core::ffi::c_void),
            other => {
                return Err(GraphicsError::UnsupportedPlatform(format!(
                    "D3D11 needs a Win32 window handle, got {:?}",
                    other
                )))
            }
        };

        let factory: IDXGIFactory2 = self
            .factory
            .cast()
            .map_err(|e| GraphicsError::surface(KIND, format!("IDXGIFactory2 unavailable: {}", e)))?;

        // flip 模型不支持 sRGB 后台缓冲格式，sRGB 由渲染目标视图负责
        let color_format = match desc.color_format {
            TextureFormat::Rgba8UnormSrgb | TextureFormat::Rgba8Unorm => TextureFormat::Rgba8Unorm,
            _ => TextureFormat::Bgra8Unorm,
        };

        let swap_chain_desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: desc.width,
            Height: desc.height,
            Format: dxgi_format(color_format),
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                ..Default::default()
            },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: desc.buffer_count.max(2),
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            ..Default::default()
        };
        let fullscreen_desc = DXGI_SWAP_CHAIN_FULLSCREEN_DESC {
            RefreshRate: DXGI_RATIONAL {
                Numerator: fullscreen.refresh_rate_numerator,
                Denominator: fullscreen.refresh_rate_denominator,
            },
            Windowed: false.into(),
            ..Default::default()
        };

        let swap_chain = unsafe {
            factory.CreateSwapChainForHwnd(
                &native.device,
                hwnd,
                &swap_chain_desc,
                fullscreen.fullscreen.then_some(&fullscreen_desc as *const _),
                None,
            )
        }
        .map_err(|e| GraphicsError::surface(KIND, format!("CreateSwapChainForHwnd failed: {}", e)))?;

        info!(
            width = desc.width,
            height = desc.height,
            buffers = swap_chain_desc.BufferCount,
            "Swap chain created"
        );

        let actual = SwapChainDesc {
            color_format,
            buffer_count: swap_chain_desc.BufferCount,
            ..*desc
        };
        Ok(SwapChain::new(KIND, actual, Dx11SwapChain { swap_chain }))
    }
}

/// 不低于 `min` 的 D3D11 特性级别，从高到低
fn feature_levels(min: FeatureLevel) -> Vec<D3D_FEATURE_LEVEL> {
    [
        (FeatureLevel { major: 11, minor: 1 }, D3D_FEATURE_LEVEL_11_1),
        (FeatureLevel::L11_0, D3D_FEATURE_LEVEL_11_0),
        (FeatureLevel { major: 10, minor: 1 }, D3D_FEATURE_LEVEL_10_1),
        (FeatureLevel::L10_0, D3D_FEATURE_LEVEL_10_0),
    ]
    .into_iter()
    .filter(|(level, _)| *level >= min)
    .map(|(_, native)| native)
    .collect()
}

fn adapter_name(desc: &DXGI_ADAPTER_DESC1) -> String {
    let len = desc.Description.iter().position(|&c| c == 0).unwrap_or(desc.Description.len());
    String::from_utf16_lossy(&desc.Description[..len])
}

fn adapter_descriptor(adapter: &IDXGIAdapter1, desc: &DXGI_ADAPTER_DESC1) -> AdapterDescriptor {
    let adapter_type = if desc.Flags & (DXGI_ADAPTER_FLAG_SOFTWARE.0 as u32) != 0 {
        AdapterType::Software
    } else {
        AdapterType::Hardware
    };

    let mut num_outputs = 0;
    while unsafe { adapter.EnumOutputs(num_outputs) }.is_ok() {
        num_outputs += 1;
    }

    AdapterDescriptor {
        name: adapter_name(desc),
        adapter_type,
        vendor_id: desc.VendorId,
        device_id: desc.DeviceId,
        dedicated_video_memory: desc.DedicatedVideoMemory as u64,
        num_outputs,
    }
}

/// 输出的全屏显示模式（两次调用 GetDisplayModeList）
fn display_modes(output: &IDXGIOutput, format: TextureFormat) -> Vec<DisplayModeDescriptor> {
    let dxgi = dxgi_format(format);
    let mut count = 0u32;
    if unsafe { output.GetDisplayModeList(dxgi, Default::default(), &mut count, None) }.is_err() || count == 0 {
        return Vec::new();
    }

    let mut modes = vec![DXGI_MODE_DESC::default(); count as usize];
    if unsafe { output.GetDisplayModeList(dxgi, Default::default(), &mut count, Some(modes.as_mut_ptr())) }.is_err() {
        return Vec::new();
    }
    modes.truncate(count as usize);

    modes
        .iter()
        .map(|mode| DisplayModeDescriptor {
            width: mode.Width,
            height: mode.Height,
            format,
            refresh_rate_numerator: mode.RefreshRate.Numerator,
            refresh_rate_denominator: mode.RefreshRate.Denominator,
        })
        .collect()
}

fn dxgi_format(format: TextureFormat) -> DXGI_FORMAT {
    match format {
        TextureFormat::Unknown => DXGI_FORMAT_UNKNOWN,
        TextureFormat::Rgba8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
        TextureFormat::Rgba8UnormSrgb => DXGI_FORMAT_R8G8B8A8_UNORM_SRGB,
        TextureFormat::Bgra8Unorm => DXGI_FORMAT_B8G8R8A8_UNORM,
        TextureFormat::Bgra8UnormSrgb => DXGI_FORMAT_B8G8R8A8_UNORM_SRGB,
        TextureFormat::D16Unorm => DXGI_FORMAT_D16_UNORM,
        TextureFormat::D24UnormS8Uint => DXGI_FORMAT_D24_UNORM_S8_UINT,
        TextureFormat::D32Float => DXGI_FORMAT_D32_FLOAT,
    }
}
