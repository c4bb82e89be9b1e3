//! 可编排的测试后端
//!
//! `ScriptedResolver` 按 `Script` 返回工厂或失败，所有工厂调用与原生对象的
//! 创建/释放都记录在共享的 `Ledger` 中，测试据此检查调用顺序和资源残留。

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use super::backend::{
    write_enumeration, Device, DeviceAndContexts, EngineCreateInfo, EngineFactory, ExecutionContext,
    SwapChain,
};
use super::resolver::FactoryResolver;
use super::swapchain::{FullScreenModeDesc, SwapChainDesc};
use super::types::{AdapterDescriptor, AdapterType, BackendKind, DisplayModeDescriptor, FeatureLevel, TextureFormat};
use super::window::NativeWindow;
use crate::core::error::{GfxResult, GraphicsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Factory,
    Device,
    Context,
    SwapChain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Resolve(BackendKind),
    Negotiate(BackendKind),
    EnumerateAdapters { kind: BackendKind, fill: bool },
    EnumerateDisplayModes { kind: BackendKind, adapter_id: u32 },
    CreateDevice(BackendKind),
    CreateSwapChain(BackendKind),
    CreateDeviceAndSwapChain(BackendKind),
    Acquire(BackendKind, Resource),
    Release(BackendKind, Resource),
}

#[derive(Debug, Default)]
pub struct Ledger {
    pub events: Vec<Event>,
    pub create_infos: Vec<EngineCreateInfo>,
    pub swapchain_descs: Vec<SwapChainDesc>,
    live: HashMap<(BackendKind, Resource), u32>,
}

impl Ledger {
    /// 指定后端当前存活的原生对象数量
    pub fn live(&self, kind: BackendKind) -> u32 {
        self.live
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, n)| *n)
            .sum()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }

    pub fn swapchain_calls(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::CreateSwapChain(_) | Event::CreateDeviceAndSwapChain(_)))
            .count()
    }
}

pub type SharedLedger = Arc<Mutex<Ledger>>;

fn lock(ledger: &SharedLedger) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap()
}

/// 原生对象替身：创建时登记，析构时注销
pub struct Token {
    kind: BackendKind,
    resource: Resource,
    ledger: SharedLedger,
}

impl Token {
    fn acquire(kind: BackendKind, resource: Resource, ledger: &SharedLedger) -> Self {
        let mut guard = lock(ledger);
        *guard.live.entry((kind, resource)).or_insert(0) += 1;
        guard.events.push(Event::Acquire(kind, resource));
        Self { kind, resource, ledger: ledger.clone() }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {:?})", self.kind, self.resource)
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        let mut guard = lock(&self.ledger);
        if let Some(n) = guard.live.get_mut(&(self.kind, self.resource)) {
            *n = n.saturating_sub(1);
        }
        guard.events.push(Event::Release(self.kind, self.resource));
    }
}

/// 测试脚本
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub adapters: HashMap<BackendKind, Vec<AdapterDescriptor>>,
    pub display_modes: Vec<DisplayModeDescriptor>,
    pub unavailable: HashSet<BackendKind>,
    pub negotiate_failures: HashSet<BackendKind>,
    pub device_failures: HashSet<BackendKind>,
    pub surface_failures: HashSet<BackendKind>,
    /// 不支持 GPU 辅助验证的后端
    pub no_gpu_validation: HashSet<BackendKind>,
    /// 交换链自行处理独占全屏的后端
    pub exclusive_fullscreen: HashSet<BackendKind>,
    /// 后端实际能创建的延迟上下文上限
    pub max_deferred: Option<u32>,
}

impl Script {
    pub fn with_adapters(mut self, kind: BackendKind, types: &[AdapterType]) -> Self {
        let adapters = types
            .iter()
            .enumerate()
            .map(|(i, t)| AdapterDescriptor {
                name: format!("{:?} adapter {}", t, i),
                adapter_type: *t,
                device_id: i as u32,
                ..Default::default()
            })
            .collect();
        self.adapters.insert(kind, adapters);
        self
    }

    pub fn unavailable(mut self, kind: BackendKind) -> Self {
        self.unavailable.insert(kind);
        self
    }

    pub fn failing_device(mut self, kind: BackendKind) -> Self {
        self.device_failures.insert(kind);
        self
    }

    pub fn failing_surface(mut self, kind: BackendKind) -> Self {
        self.surface_failures.insert(kind);
        self
    }

    pub fn without_gpu_validation(mut self, kind: BackendKind) -> Self {
        self.no_gpu_validation.insert(kind);
        self
    }

    pub fn failing_negotiation(mut self, kind: BackendKind) -> Self {
        self.negotiate_failures.insert(kind);
        self
    }
}

#[derive(Debug)]
pub struct ScriptedResolver {
    script: Script,
    ledger: SharedLedger,
}

impl ScriptedResolver {
    pub fn new(script: Script) -> Self {
        Self { script, ledger: SharedLedger::default() }
    }

    pub fn ledger(&self) -> SharedLedger {
        self.ledger.clone()
    }
}

impl FactoryResolver for ScriptedResolver {
    fn resolve(&mut self, kind: BackendKind) -> GfxResult<Box<dyn EngineFactory>> {
        lock(&self.ledger).events.push(Event::Resolve(kind));
        if self.script.unavailable.contains(&kind) {
            return Err(GraphicsError::unavailable(kind, "scripted"));
        }
        Ok(Box::new(ScriptedFactory {
            kind,
            script: self.script.clone(),
            ledger: self.ledger.clone(),
            _token: Token::acquire(kind, Resource::Factory, &self.ledger),
        }))
    }
}

#[derive(Debug)]
pub struct ScriptedFactory {
    kind: BackendKind,
    script: Script,
    ledger: SharedLedger,
    _token: Token,
}

impl ScriptedFactory {
    fn adapters(&self) -> &[AdapterDescriptor] {
        self.script.adapters.get(&self.kind).map(Vec::as_slice).unwrap_or(&[])
    }

    fn record(&self, event: Event) {
        lock(&self.ledger).events.push(event);
    }

    fn build(&self, info: &EngineCreateInfo) -> GfxResult<DeviceAndContexts> {
        lock(&self.ledger).create_infos.push(*info);
        if self.script.device_failures.contains(&self.kind) {
            return Err(GraphicsError::device(self.kind, "scripted"));
        }

        let adapter = match info.adapter_id {
            Some(index) => Some(
                self.adapters()
                    .get(index as usize)
                    .cloned()
                    .ok_or_else(|| GraphicsError::device(self.kind, "no such adapter"))?,
            ),
            None => None,
        };

        let deferred = self
            .script
            .max_deferred
            .map_or(info.num_deferred_contexts, |max| max.min(info.num_deferred_contexts));
        let mut contexts = vec![ExecutionContext::immediate(
            self.kind,
            Token::acquire(self.kind, Resource::Context, &self.ledger),
        )];
        for i in 0..deferred as usize {
            contexts.push(ExecutionContext::deferred(
                self.kind,
                i + 1,
                Token::acquire(self.kind, Resource::Context, &self.ledger),
            ));
        }

        let device = Device::new(self.kind, adapter, Token::acquire(self.kind, Resource::Device, &self.ledger));
        Ok(DeviceAndContexts { device, contexts })
    }

    fn swapchain(&self, desc: &SwapChainDesc) -> GfxResult<SwapChain> {
        lock(&self.ledger).swapchain_descs.push(*desc);
        if self.script.surface_failures.contains(&self.kind) {
            return Err(GraphicsError::surface(self.kind, "scripted"));
        }
        Ok(SwapChain::new(
            self.kind,
            *desc,
            Token::acquire(self.kind, Resource::SwapChain, &self.ledger),
        ))
    }
}

impl EngineFactory for ScriptedFactory {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn negotiate(&self) -> GfxResult<()> {
        self.record(Event::Negotiate(self.kind));
        if self.script.negotiate_failures.contains(&self.kind) {
            return Err(GraphicsError::FeatureNegotiation { kind: self.kind, reason: "scripted".into() });
        }
        Ok(())
    }

    fn exclusive_fullscreen(&self) -> bool {
        self.script.exclusive_fullscreen.contains(&self.kind)
    }

    fn supports_gpu_based_validation(&self) -> bool {
        !self.script.no_gpu_validation.contains(&self.kind)
    }

    fn enumerate_adapters(
        &self,
        _min_feature_level: FeatureLevel,
        count: &mut u32,
        adapters: Option<&mut [AdapterDescriptor]>,
    ) {
        self.record(Event::EnumerateAdapters { kind: self.kind, fill: adapters.is_some() });
        write_enumeration(self.adapters(), count, adapters);
    }

    fn enumerate_display_modes(
        &self,
        _min_feature_level: FeatureLevel,
        adapter_id: u32,
        _output_id: u32,
        _format: TextureFormat,
        count: &mut u32,
        modes: Option<&mut [DisplayModeDescriptor]>,
    ) {
        self.record(Event::EnumerateDisplayModes { kind: self.kind, adapter_id });
        write_enumeration(&self.script.display_modes, count, modes);
    }

    fn create_device_and_contexts(&self, info: &EngineCreateInfo) -> GfxResult<DeviceAndContexts> {
        self.record(Event::CreateDevice(self.kind));
        self.build(info)
    }

    fn create_swapchain(
        &self,
        _device: &Device,
        _immediate_context: &ExecutionContext,
        desc: &SwapChainDesc,
        _fullscreen: &FullScreenModeDesc,
        _window: &NativeWindow,
    ) -> GfxResult<SwapChain> {
        self.record(Event::CreateSwapChain(self.kind));
        self.swapchain(desc)
    }

    fn create_device_and_swapchain(
        &self,
        info: &EngineCreateInfo,
        desc: &SwapChainDesc,
        _window: &NativeWindow,
    ) -> GfxResult<(DeviceAndContexts, SwapChain)> {
        self.record(Event::CreateDeviceAndSwapChain(self.kind));
        let created = self.build(info)?;
        let swapchain = self
            .swapchain(desc)
            .map_err(|e| GraphicsError::device(self.kind, e.to_string()))?;
        Ok((created, swapchain))
    }
}

/// 测试用的伪 Win32 窗口
pub fn fake_window() -> NativeWindow {
    use raw_window_handle::{RawDisplayHandle, RawWindowHandle, Win32WindowHandle, WindowsDisplayHandle};
    use std::num::NonZeroIsize;

    let hwnd = NonZeroIsize::new(0x1000).unwrap();
    NativeWindow::new(
        RawWindowHandle::Win32(Win32WindowHandle::new(hwnd)),
        RawDisplayHandle::Windows(WindowsDisplayHandle::new()),
    )
}
