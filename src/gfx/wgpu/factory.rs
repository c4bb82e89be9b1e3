//! wgpu 后端工厂
//!
//! 一个工厂只绑定 wgpu 的一个后端位（DX12 / Vulkan / Metal / GL）。
//! 枚举使用工厂自己的实例；创建设备时按验证设置重新创建实例，
//! 设备对象持有该实例，交换链从同一个实例创建表面。

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::convert;
use crate::core::error::{GfxResult, GraphicsError};
use crate::gfx::backend::{
    write_enumeration, ContextRole, Device, DeviceAndContexts, EngineCreateInfo, EngineFactory,
    ExecutionContext, SwapChain, MAX_DEFERRED_CONTEXTS,
};
use crate::gfx::loader;
use crate::gfx::swapchain::{FullScreenModeDesc, SwapChainDesc};
use crate::gfx::types::{AdapterDescriptor, BackendKind, DisplayModeDescriptor, FeatureLevel, TextureFormat};
use crate::gfx::window::NativeWindow;

/// wgpu 逻辑设备
///
/// 持有创建它的实例和适配器，交换链需要二者来创建表面。
pub struct WgpuDevice {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("adapter", &self.adapter.get_info().name)
            .finish_non_exhaustive()
    }
}

/// 立即上下文：唯一允许提交命令和驱动交换链的队列
pub struct WgpuImmediateContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl fmt::Debug for WgpuImmediateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WgpuImmediateContext")
    }
}

/// 延迟上下文：在其他线程上创建命令编码器，录制结果交给立即上下文提交
pub struct WgpuDeferredContext {
    pub device: Arc<wgpu::Device>,
}

impl WgpuDeferredContext {
    pub fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }
}

impl fmt::Debug for WgpuDeferredContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WgpuDeferredContext")
    }
}

/// 已配置的窗口表面及其深度缓冲
pub struct WgpuSurface {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    pub depth: Option<wgpu::Texture>,
}

impl fmt::Debug for WgpuSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuSurface")
            .field("format", &self.config.format)
            .field("width", &self.config.width)
            .field("height", &self.config.height)
            .field("present_mode", &self.config.present_mode)
            .finish()
    }
}

/// wgpu 后端工厂
pub struct WgpuFactory {
    kind: BackendKind,
    backends: wgpu::Backends,
    instance: wgpu::Instance,
    /// 窗口系统提供的主显示器全屏模式（输出 0）
    display_modes: Vec<DisplayModeDescriptor>,
}

impl fmt::Debug for WgpuFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuFactory")
            .field("kind", &self.kind)
            .field("backends", &self.backends)
            .field("display_modes", &self.display_modes.len())
            .finish()
    }
}

impl WgpuFactory {
    /// 为指定后端种类创建工厂
    pub fn new(kind: BackendKind, display_modes: Vec<DisplayModeDescriptor>) -> GfxResult<Self> {
        let backends = convert::backend_bits(kind)
            .ok_or_else(|| GraphicsError::unavailable(kind, "not provided by wgpu"))?;

        debug!(backend = ?kind, "Creating wgpu instance");
        let instance = create_instance(backends, wgpu::InstanceFlags::from_build_config());

        Ok(Self { kind, backends, instance, display_modes })
    }

    fn adapters(&self, instance: &wgpu::Instance, min_feature_level: FeatureLevel) -> Vec<wgpu::Adapter> {
        instance
            .enumerate_adapters(self.backends)
            .into_iter()
            .filter(|adapter| {
                convert::meets_feature_level(&adapter.get_downlevel_capabilities(), min_feature_level)
            })
            .collect()
    }

    /// 按创建参数选定适配器；`adapter_id` 为 `None` 时交给 wgpu 按性能偏好挑选
    fn pick_adapter(
        &self,
        instance: &wgpu::Instance,
        info: &EngineCreateInfo,
        surface: Option<&wgpu::Surface<'static>>,
    ) -> GfxResult<wgpu::Adapter> {
        match info.adapter_id {
            Some(index) => {
                let mut adapters = self.adapters(instance, info.min_feature_level);
                let count = adapters.len();
                if (index as usize) >= count {
                    return Err(GraphicsError::device(
                        self.kind,
                        format!("adapter {} not found ({} enumerated)", index, count),
                    ));
                }
                let adapter = adapters.swap_remove(index as usize);
                if let Some(surface) = surface {
                    if !adapter.is_surface_supported(surface) {
                        return Err(GraphicsError::device(
                            self.kind,
                            format!("adapter {} cannot present to the window", index),
                        ));
                    }
                }
                Ok(adapter)
            }
            None => pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            }))
            .ok_or_else(|| GraphicsError::device(self.kind, "no suitable adapter")),
        }
    }

    fn build_device(
        &self,
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        num_deferred_contexts: u32,
    ) -> GfxResult<DeviceAndContexts> {
        let adapter_info = adapter.get_info();
        info!(backend = ?self.kind, adapter = %adapter_info.name, "Selected adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Bootstrap Device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
            },
            None,
        ))
        .map_err(|e| GraphicsError::device(self.kind, format!("request_device failed: {}", e)))?;

        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let deferred = num_deferred_contexts.min(MAX_DEFERRED_CONTEXTS) as usize;
        let mut contexts = Vec::with_capacity(1 + deferred);
        contexts.push(ExecutionContext::immediate(
            self.kind,
            WgpuImmediateContext { device: device.clone(), queue: queue.clone() },
        ));
        for i in 0..deferred {
            contexts.push(ExecutionContext::deferred(
                self.kind,
                i + 1,
                WgpuDeferredContext { device: device.clone() },
            ));
        }

        let device = Device::new(
            self.kind,
            Some(convert::adapter_descriptor(&adapter_info)),
            WgpuDevice { instance, adapter, device, queue },
        );
        Ok(DeviceAndContexts { device, contexts })
    }
}

impl EngineFactory for WgpuFactory {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn negotiate(&self) -> GfxResult<()> {
        match self.kind {
            BackendKind::D3D12 => loader::negotiate_d3d12(),
            _ => Ok(()),
        }
    }

    fn supports_gpu_based_validation(&self) -> bool {
        false
    }

    fn enumerate_adapters(
        &self,
        min_feature_level: FeatureLevel,
        count: &mut u32,
        adapters: Option<&mut [AdapterDescriptor]>,
    ) {
        let descriptors: Vec<AdapterDescriptor> = self
            .adapters(&self.instance, min_feature_level)
            .iter()
            .map(|adapter| convert::adapter_descriptor(&adapter.get_info()))
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
        let adapter_count = self.adapters(&self.instance, min_feature_level).len();
        let matching: Vec<DisplayModeDescriptor> = if output_id == 0 && (adapter_id as usize) < adapter_count {
            self.display_modes
                .iter()
                .filter(|mode| format == TextureFormat::Unknown || mode.format == format)
                .copied()
                .collect()
        } else {
            Vec::new()
        };
        write_enumeration(&matching, count, modes);
    }

    fn create_device_and_contexts(&self, info: &EngineCreateInfo) -> GfxResult<DeviceAndContexts> {
        let flags = convert::instance_flags(&info.backend);
        debug!(backend = ?self.kind, ?flags, "Creating device instance");

        let instance = create_instance(self.backends, flags);
        let adapter = self.pick_adapter(&instance, info, None)?;
        self.build_device(instance, adapter, info.num_deferred_contexts)
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
            .native::<WgpuDevice>()
            .ok_or_else(|| GraphicsError::surface(self.kind, "device was not created by wgpu"))?;
        if immediate_context.role() != ContextRole::Immediate {
            return Err(GraphicsError::surface(self.kind, "swapchain requires the immediate context"));
        }
        if fullscreen.fullscreen {
            // wgpu 没有独占全屏，由调用方把窗口切换为无边框全屏
            debug!("Fullscreen requested, presenting through the window");
        }

        let surface = create_surface(self.kind, &native.instance, window)?;
        configure_surface(self.kind, surface, &native.adapter, &native.device, desc)
    }

    fn create_device_and_swapchain(
        &self,
        info: &EngineCreateInfo,
        desc: &SwapChainDesc,
        window: &NativeWindow,
    ) -> GfxResult<(DeviceAndContexts, SwapChain)> {
        let flags = convert::instance_flags(&info.backend);
        debug!(backend = ?self.kind, ?flags, "Creating device and surface together");

        // GL 上下文依附于窗口，先建表面再选适配器
        let instance = create_instance(self.backends, flags);
        let surface = create_surface(self.kind, &instance, window)
            .map_err(|e| GraphicsError::device(self.kind, e.to_string()))?;
        let adapter = self.pick_adapter(&instance, info, Some(&surface))?;
        let created = self.build_device(instance, adapter, info.num_deferred_contexts)?;

        let swapchain = {
            let native = created
                .device
                .native::<WgpuDevice>()
                .ok_or_else(|| GraphicsError::device(self.kind, "device was not created by wgpu"))?;
            configure_surface(self.kind, surface, &native.adapter, &native.device, desc)?
        };
        Ok((created, swapchain))
    }
}

fn create_instance(backends: wgpu::Backends, flags: wgpu::InstanceFlags) -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        flags,
        dx12_shader_compiler: Default::default(),
        gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
    })
}

fn create_surface(
    kind: BackendKind,
    instance: &wgpu::Instance,
    window: &NativeWindow,
) -> GfxResult<wgpu::Surface<'static>> {
    // SAFETY: 调用方保证窗口在交换链存活期间有效
    unsafe {
        instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
            raw_display_handle: window.display,
            raw_window_handle: window.window,
        })
    }
    .map_err(|e| GraphicsError::surface(kind, format!("create_surface failed: {}", e)))
}

fn configure_surface(
    kind: BackendKind,
    surface: wgpu::Surface<'static>,
    adapter: &wgpu::Adapter,
    device: &wgpu::Device,
    desc: &SwapChainDesc,
) -> GfxResult<SwapChain> {
    if desc.width == 0 || desc.height == 0 {
        return Err(GraphicsError::surface(
            kind,
            format!("invalid surface size {}x{}", desc.width, desc.height),
        ));
    }

    let caps = surface.get_capabilities(adapter);
    if caps.formats.is_empty() {
        return Err(GraphicsError::surface(kind, "adapter cannot present to this window"));
    }

    // 优先使用请求的格式，其次任意 sRGB 格式
    let requested = convert::to_wgpu_format(desc.color_format);
    let format = requested
        .filter(|f| caps.formats.contains(f))
        .or_else(|| {
            caps.formats
                .iter()
                .copied()
                .find(|f| matches!(f, wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb))
        })
        .unwrap_or(caps.formats[0]);
    if Some(format) != requested {
        warn!(requested = ?desc.color_format, actual = ?format, "Surface color format substituted");
    }

    let present_mode = if !desc.vsync && caps.present_modes.contains(&wgpu::PresentMode::Immediate) {
        wgpu::PresentMode::Immediate
    } else {
        wgpu::PresentMode::Fifo
    };

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: desc.width,
        height: desc.height,
        present_mode,
        alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: vec![],
        desired_maximum_frame_latency: desc.buffer_count.saturating_sub(1).max(1),
    };
    surface.configure(device, &config);

    let depth = convert::to_wgpu_format(desc.depth_format).map(|depth_format| {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Buffer"),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: depth_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    });

    info!(?format, ?present_mode, width = desc.width, height = desc.height, "Surface configured");

    let actual = SwapChainDesc {
        color_format: convert::from_wgpu_format(format),
        ..*desc
    };
    Ok(SwapChain::new(kind, actual, WgpuSurface { surface, config, depth }))
}
