//! 引导编排器
//!
//! 按 解析工厂 -> 枚举适配器（和显示模式）-> 创建设备与上下文 -> 创建交换链
//! 的顺序完成一次引导，并在首选后端不可用或设备创建失败时按策略回退一次。
//!
//! 所有可变状态都属于 `Bootstrapper` 实例，引导结果由 `Session` 独占持有；
//! 多个引导器（例如测试中）可以同时存在而互不影响。

use super::adapters::{AdapterDirectory, DisplayModeCatalog};
use super::device::DeviceBuilder;
use super::policy::BackendPolicy;
use super::request::BootstrapRequest;
use super::state::{BootstrapNotice, BootstrapState};
use super::surface::SurfaceBuilder;
use crate::core::error::{GfxResult, GraphicsError};
use crate::core::platform::Platform;
use crate::gfx::{
    AdapterDescriptor, AdapterType, BackendKind, Device, DisplayModeDescriptor, EngineFactory, ExecutionContext,
    FactoryResolver, FullScreenModeDesc, NativeWindow, SwapChain, SwapChainDesc,
};
use crate::{bootstrap_debug, bootstrap_info, bootstrap_warn};

/// 显示模式枚举使用的输出
const PRIMARY_OUTPUT: u32 = 0;

/// 引导完成后的图形会话
///
/// 字段按释放顺序排列：交换链、延迟上下文、立即上下文、设备，最后是工厂。
#[derive(Debug)]
pub struct Session {
    swapchain: Option<SwapChain>,
    deferred: Vec<ExecutionContext>,
    immediate: ExecutionContext,
    device: Device,
    factory: Box<dyn EngineFactory>,
    adapter: Option<AdapterDescriptor>,
    adapter_index: Option<u32>,
    adapters: Vec<AdapterDescriptor>,
    display_modes: Vec<DisplayModeDescriptor>,
    display_mode: Option<usize>,
    swapchain_desc: SwapChainDesc,
    fullscreen: FullScreenModeDesc,
}

impl Session {
    /// 实际使用的后端
    pub fn kind(&self) -> BackendKind {
        self.device.kind()
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn immediate_context(&self) -> &ExecutionContext {
        &self.immediate
    }

    pub fn deferred_contexts(&self) -> &[ExecutionContext] {
        &self.deferred
    }

    /// 无头运行时为 `None`，此时调用方不得执行呈现操作
    pub fn swapchain(&self) -> Option<&SwapChain> {
        self.swapchain.as_ref()
    }

    pub fn is_headless(&self) -> bool {
        self.swapchain.is_none()
    }

    pub fn factory(&self) -> &dyn EngineFactory {
        self.factory.as_ref()
    }

    /// 实际选定的适配器
    pub fn adapter(&self) -> Option<&AdapterDescriptor> {
        self.adapter.as_ref()
    }

    /// 选定适配器在枚举结果中的下标；由后端默认选择时为 `None`
    pub fn adapter_index(&self) -> Option<u32> {
        self.adapter_index
    }

    pub fn adapters(&self) -> &[AdapterDescriptor] {
        &self.adapters
    }

    /// 选定适配器主输出上的全屏显示模式，供全屏模式选择界面使用
    pub fn display_modes(&self) -> &[DisplayModeDescriptor] {
        &self.display_modes
    }

    /// 配置中选定且确实存在的显示模式
    pub fn selected_display_mode(&self) -> Option<&DisplayModeDescriptor> {
        self.display_mode.and_then(|i| self.display_modes.get(i))
    }

    /// 是否需要调用方把窗口切换为全屏
    ///
    /// 请求了全屏且交换链不自行处理独占全屏时为 `true`。
    pub fn needs_window_fullscreen(&self) -> bool {
        self.fullscreen.fullscreen && self.swapchain.is_some() && !self.factory.exclusive_fullscreen()
    }

    /// 交换链请求的描述（已应用平台约束）
    pub fn swapchain_desc(&self) -> &SwapChainDesc {
        &self.swapchain_desc
    }

    /// 窗口尺寸变化后重建交换链
    ///
    /// 旧交换链先释放，再创建新的；失败时会话没有交换链。
    pub fn recreate_surface(&mut self, width: u32, height: u32, window: &NativeWindow) -> GfxResult<()> {
        let desc = SwapChainDesc { width, height, ..self.swapchain_desc };
        self.swapchain = None;

        let swapchain = SurfaceBuilder::new(self.factory.as_ref()).build(
            &self.device,
            &self.immediate,
            None,
            &desc,
            &self.fullscreen,
            Some(window),
        )?;
        self.swapchain_desc = desc;
        self.swapchain = swapchain;
        Ok(())
    }
}

/// 引导编排器
pub struct Bootstrapper<R: FactoryResolver> {
    resolver: R,
    platform: Platform,
    state: BootstrapState,
    history: Vec<BootstrapState>,
    notices: Vec<BootstrapNotice>,
}

impl<R: FactoryResolver> Bootstrapper<R> {
    pub fn new(resolver: R, platform: Platform) -> Self {
        Self {
            resolver,
            platform,
            state: BootstrapState::Unstarted,
            history: vec![BootstrapState::Unstarted],
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    /// 本次引导经过的所有状态
    pub fn history(&self) -> &[BootstrapState] {
        &self.history
    }

    pub fn notices(&self) -> &[BootstrapNotice] {
        &self.notices
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// 执行一次完整的引导
    ///
    /// 只有 `BackendUnavailable` 与 `DeviceCreation` 会触发回退，且最多一次；
    /// 其他错误原样返回，状态停留在出错的阶段。
    pub fn run(&mut self, request: &BootstrapRequest, window: Option<&NativeWindow>) -> GfxResult<Session> {
        self.state = BootstrapState::Unstarted;
        self.history = vec![BootstrapState::Unstarted];
        self.notices.clear();

        bootstrap_info!(backend = ?request.backend, platform = ?self.platform, headless = window.is_none(), "Bootstrap starting");

        let mut kind = request.backend;
        let mut fell_back = false;
        loop {
            // 失败的尝试在返回前已释放它的全部资源
            let err = match self.attempt(kind, request, window) {
                Ok(session) => return Ok(session),
                Err(err) => err,
            };

            let next = BackendPolicy::for_kind(kind).fallback(self.platform);
            match next {
                Some(next) if !fell_back && err.triggers_fallback() => {
                    bootstrap_warn!(from = ?kind, to = ?next, error = %err, "Falling back to another backend");
                    self.notices.push(BootstrapNotice::FellBack { from: kind, to: next, reason: err.to_string() });
                    self.transition(BootstrapState::FallingBack(next));
                    fell_back = true;
                    kind = next;
                }
                _ => {
                    bootstrap_warn!(backend = ?kind, state = %self.state, error = %err, "Bootstrap failed");
                    return Err(err);
                }
            }
        }
    }

    fn transition(&mut self, next: BootstrapState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        bootstrap_debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
        self.history.push(next);
    }

    fn attempt(
        &mut self,
        kind: BackendKind,
        request: &BootstrapRequest,
        window: Option<&NativeWindow>,
    ) -> GfxResult<Session> {
        let policy = BackendPolicy::for_kind(kind);

        self.transition(BootstrapState::Resolving(kind));
        let factory = self.resolver.resolve(kind)?;
        factory.negotiate()?;

        self.transition(BootstrapState::Enumerating(kind));
        let directory = if policy.enumerates_adapters() {
            AdapterDirectory::enumerate(factory.as_ref(), request.min_feature_level)
        } else {
            AdapterDirectory::default()
        };
        for (i, adapter) in directory.adapters().iter().enumerate() {
            bootstrap_debug!(index = i, adapter = %adapter.details(), "Adapter");
        }

        let adapter_index = if policy.enumerates_adapters() {
            directory.select(request.adapter_index, request.adapter_type, request.adapter_selection)?
        } else {
            None
        };
        let selected = adapter_index.and_then(|i| directory.get(i)).cloned();
        if let (AdapterType::Software, Some(adapter)) = (request.adapter_type, &selected) {
            if adapter.adapter_type != AdapterType::Software {
                bootstrap_warn!(index = request.adapter_index, "No software adapter, keeping configured adapter");
                self.notices.push(BootstrapNotice::SoftwareAdapterMissing { retained_index: request.adapter_index });
            }
        }

        // 软件适配器没有原生显示模式
        let display_modes = match (&selected, adapter_index) {
            (Some(adapter), Some(index))
                if request.adapter_type != AdapterType::Software && adapter.adapter_type != AdapterType::Software =>
            {
                DisplayModeCatalog::enumerate(
                    factory.as_ref(),
                    request.min_feature_level,
                    index,
                    PRIMARY_OUTPUT,
                    request.swapchain.color_format,
                )
                .into_modes()
            }
            _ => Vec::new(),
        };

        self.transition(BootstrapState::DeviceBuilding(kind));
        if policy.enumerates_adapters() && directory.is_empty() {
            if policy.requires_adapters() {
                return Err(GraphicsError::device(kind, "no adapters were enumerated"));
            }
            bootstrap_info!(backend = ?kind, "No adapters enumerated, using the backend default");
            self.notices.push(BootstrapNotice::NoAdapters { kind });
        }

        let swapchain_desc = SurfaceBuilder::effective_desc(&request.swapchain, self.platform);
        if swapchain_desc.buffer_count != request.swapchain.buffer_count {
            bootstrap_info!(
                requested = request.swapchain.buffer_count,
                applied = swapchain_desc.buffer_count,
                "Platform requires more swapchain buffers"
            );
            self.notices.push(BootstrapNotice::BufferCountRaised {
                requested: request.swapchain.buffer_count,
                applied: swapchain_desc.buffer_count,
            });
        }

        let built = DeviceBuilder::new(factory.as_ref(), policy, self.platform).build(
            adapter_index,
            request,
            &swapchain_desc,
            window,
        )?;
        self.notices.extend(built.notices.iter().cloned());

        self.transition(BootstrapState::SurfaceBuilding(kind));
        let display_mode = (request.display_mode < display_modes.len()).then_some(request.display_mode);
        let fullscreen = match display_mode.map(|i| &display_modes[i]) {
            Some(mode) if request.fullscreen => FullScreenModeDesc::from_mode(mode),
            _ => FullScreenModeDesc { fullscreen: request.fullscreen, ..Default::default() },
        };
        let swapchain = SurfaceBuilder::new(factory.as_ref()).build(
            &built.device,
            &built.immediate,
            built.swapchain,
            &swapchain_desc,
            &fullscreen,
            window,
        )?;

        self.transition(BootstrapState::Ready(kind));
        let adapter = selected.or_else(|| built.device.adapter().cloned());
        bootstrap_info!(
            backend = ?kind,
            adapter = adapter.as_ref().map(|a| a.name.as_str()).unwrap_or("<default>"),
            deferred = built.deferred.len(),
            headless = swapchain.is_none(),
            "Bootstrap ready"
        );

        Ok(Session {
            swapchain,
            deferred: built.deferred,
            immediate: built.immediate,
            device: built.device,
            factory,
            adapter,
            adapter_index,
            adapters: directory.adapters().to_vec(),
            display_modes,
            display_mode,
            swapchain_desc,
            fullscreen,
        })
    }
}
