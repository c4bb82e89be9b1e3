//! 设备与执行上下文构建

use super::policy::BackendPolicy;
use super::request::BootstrapRequest;
use super::state::BootstrapNotice;
use crate::core::error::{GfxResult, GraphicsError};
use crate::core::platform::Platform;
use crate::gfx::{
    BackendCreateInfo, ContextRole, Device, DeviceAndContexts, EngineCreateInfo, EngineFactory, ExecutionContext,
    NativeWindow, SwapChain, SwapChainDesc, MAX_DEFERRED_CONTEXTS,
};
use crate::{bootstrap_debug, bootstrap_info, bootstrap_warn};

/// 设备构建结果
#[derive(Debug)]
pub struct BuiltDevice {
    pub device: Device,
    pub immediate: ExecutionContext,
    pub deferred: Vec<ExecutionContext>,
    /// 与设备一起创建的交换链
    pub swapchain: Option<SwapChain>,
    pub notices: Vec<BootstrapNotice>,
}

/// 设备与上下文构建器
pub struct DeviceBuilder<'a> {
    factory: &'a dyn EngineFactory,
    policy: BackendPolicy,
    platform: Platform,
}

impl<'a> DeviceBuilder<'a> {
    pub fn new(factory: &'a dyn EngineFactory, policy: BackendPolicy, platform: Platform) -> Self {
        Self { factory, policy, platform }
    }

    /// 创建设备、立即上下文和延迟上下文
    ///
    /// `swapchain_desc` 只在后端把交换链合并进设备创建时使用，且必须已应用平台约束。
    pub fn build(
        &self,
        adapter_id: Option<u32>,
        request: &BootstrapRequest,
        swapchain_desc: &SwapChainDesc,
        window: Option<&NativeWindow>,
    ) -> GfxResult<BuiltDevice> {
        let kind = self.policy.kind();
        let mut notices = Vec::new();

        let mut deferred_requested = request.deferred_contexts;
        if self.policy.single_context() && deferred_requested > 0 {
            bootstrap_info!(
                backend = ?kind,
                requested = deferred_requested,
                "Backend supports a single context, deferred contexts disabled"
            );
            notices.push(BootstrapNotice::DeferredContextsDowngraded {
                kind,
                requested: deferred_requested,
                granted: 0,
            });
            deferred_requested = 0;
        }
        if deferred_requested > MAX_DEFERRED_CONTEXTS {
            bootstrap_warn!(
                backend = ?kind,
                requested = deferred_requested,
                max = MAX_DEFERRED_CONTEXTS,
                "Deferred context request clamped"
            );
            notices.push(BootstrapNotice::DeferredContextsDowngraded {
                kind,
                requested: deferred_requested,
                granted: MAX_DEFERRED_CONTEXTS,
            });
            deferred_requested = MAX_DEFERRED_CONTEXTS;
        }

        if let Some(level) = request.validation.level() {
            if !self.policy.has_validation() {
                bootstrap_debug!(backend = ?kind, validation = level, "Validation level ignored");
                notices.push(BootstrapNotice::ValidationIgnored { kind, level });
            }
        }

        let backend = self.policy.create_info(request.validation);
        if let (BackendCreateInfo::D3D12(d3d12), Some(level)) = (&backend, request.validation.level()) {
            if d3d12.enable_gpu_based_validation && !self.factory.supports_gpu_based_validation() {
                bootstrap_warn!(backend = ?kind, validation = level, "GPU-based validation is not available");
                notices.push(BootstrapNotice::GpuValidationUnavailable { kind, level });
            }
        }

        let info = EngineCreateInfo {
            adapter_id,
            min_feature_level: request.min_feature_level,
            num_deferred_contexts: deferred_requested,
            backend,
        };
        bootstrap_debug!(backend = ?kind, ?info, "Creating device");

        let (created, swapchain) = match window {
            Some(window) if self.policy.folds_surface() => {
                let (created, swapchain) = self.factory.create_device_and_swapchain(&info, swapchain_desc, window)?;
                notices.push(BootstrapNotice::SurfaceFolded { kind });
                (created, Some(swapchain))
            }
            None if self.policy.requires_window(self.platform) => {
                return Err(GraphicsError::device(kind, "a window is required to create the device"));
            }
            _ => (self.factory.create_device_and_contexts(&info)?, None),
        };

        let DeviceAndContexts { device, contexts } = created;
        let mut contexts = contexts.into_iter();
        let immediate = match contexts.next() {
            Some(ctx) if ctx.role() == ContextRole::Immediate => ctx,
            _ => return Err(GraphicsError::device(kind, "backend returned no immediate context")),
        };

        let deferred: Vec<ExecutionContext> = contexts
            .filter(|ctx| ctx.role() == ContextRole::Deferred)
            .take(deferred_requested as usize)
            .collect();
        if (deferred.len() as u32) < deferred_requested {
            bootstrap_warn!(
                backend = ?kind,
                requested = deferred_requested,
                granted = deferred.len(),
                "Backend produced fewer deferred contexts than requested"
            );
            notices.push(BootstrapNotice::DeferredContextsDowngraded {
                kind,
                requested: deferred_requested,
                granted: deferred.len() as u32,
            });
        }

        bootstrap_info!(backend = ?kind, deferred = deferred.len(), "Device created");
        Ok(BuiltDevice { device, immediate, deferred, swapchain, notices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::testing::{fake_window, Event, Script, ScriptedResolver};
    use crate::gfx::{BackendKind, FactoryResolver, ValidationLevel, VulkanCreateInfo};

    fn request(kind: BackendKind, deferred: u32) -> BootstrapRequest {
        let mut request = BootstrapRequest::default().with_backend(kind);
        request.deferred_contexts = deferred;
        request
    }

    #[test]
    fn test_deferred_contexts_are_attached() {
        let mut resolver = ScriptedResolver::new(Script::default());
        let factory = resolver.resolve(BackendKind::Vulkan).unwrap();
        let builder = DeviceBuilder::new(factory.as_ref(), BackendPolicy::Vulkan, Platform::Linux);

        let built = builder
            .build(None, &request(BackendKind::Vulkan, 3), &SwapChainDesc::default(), None)
            .unwrap();
        assert_eq!(built.immediate.role(), ContextRole::Immediate);
        assert_eq!(built.deferred.len(), 3);
        assert_eq!(built.deferred[2].index(), 3);
        assert!(built.swapchain.is_none());
        assert!(built.notices.is_empty());
    }

    #[test]
    fn test_shortfall_is_recorded() {
        let mut script = Script::default();
        script.max_deferred = Some(1);
        let mut resolver = ScriptedResolver::new(script);
        let factory = resolver.resolve(BackendKind::Vulkan).unwrap();
        let builder = DeviceBuilder::new(factory.as_ref(), BackendPolicy::Vulkan, Platform::Linux);

        let built = builder
            .build(None, &request(BackendKind::Vulkan, 4), &SwapChainDesc::default(), None)
            .unwrap();
        assert_eq!(built.deferred.len(), 1);
        assert_eq!(
            built.notices,
            vec![BootstrapNotice::DeferredContextsDowngraded {
                kind: BackendKind::Vulkan,
                requested: 4,
                granted: 1,
            }]
        );
    }

    #[test]
    fn test_huge_deferred_request_is_clamped() {
        let mut resolver = ScriptedResolver::new(Script::default());
        let ledger = resolver.ledger();
        let factory = resolver.resolve(BackendKind::Vulkan).unwrap();
        let builder = DeviceBuilder::new(factory.as_ref(), BackendPolicy::Vulkan, Platform::Linux);

        let built = builder
            .build(None, &request(BackendKind::Vulkan, u32::MAX), &SwapChainDesc::default(), None)
            .unwrap();
        assert_eq!(built.deferred.len(), MAX_DEFERRED_CONTEXTS as usize);
        assert_eq!(
            built.notices,
            vec![BootstrapNotice::DeferredContextsDowngraded {
                kind: BackendKind::Vulkan,
                requested: u32::MAX,
                granted: MAX_DEFERRED_CONTEXTS,
            }]
        );
        assert_eq!(ledger.lock().unwrap().create_infos[0].num_deferred_contexts, MAX_DEFERRED_CONTEXTS);
    }

    #[test]
    fn test_missing_gpu_validation_is_recorded() {
        let script = Script::default().without_gpu_validation(BackendKind::D3D12);
        let mut resolver = ScriptedResolver::new(script);
        let factory = resolver.resolve(BackendKind::D3D12).unwrap();
        let builder = DeviceBuilder::new(factory.as_ref(), BackendPolicy::D3D12, Platform::Windows);

        let mut req = request(BackendKind::D3D12, 0);
        req.validation = ValidationLevel::new(2);
        let built = builder.build(None, &req, &SwapChainDesc::default(), None).unwrap();
        assert_eq!(
            built.notices,
            vec![BootstrapNotice::GpuValidationUnavailable { kind: BackendKind::D3D12, level: 2 }]
        );

        // 标准验证不受影响
        req.validation = ValidationLevel::new(1);
        let built = builder.build(None, &req, &SwapChainDesc::default(), None).unwrap();
        assert!(built.notices.is_empty());
    }

    #[test]
    fn test_validation_reaches_create_info() {
        let mut resolver = ScriptedResolver::new(Script::default());
        let ledger = resolver.ledger();
        let factory = resolver.resolve(BackendKind::Vulkan).unwrap();
        let builder = DeviceBuilder::new(factory.as_ref(), BackendPolicy::Vulkan, Platform::Linux);

        let mut req = request(BackendKind::Vulkan, 0);
        req.validation = ValidationLevel::new(0);
        builder.build(None, &req, &SwapChainDesc::default(), None).unwrap();

        let ledger = ledger.lock().unwrap();
        assert_eq!(
            ledger.create_infos[0].backend,
            BackendCreateInfo::Vulkan(VulkanCreateInfo { enable_validation: false })
        );
    }

    #[test]
    fn test_gl_folds_surface_and_forces_single_context() {
        let mut resolver = ScriptedResolver::new(Script::default());
        let ledger = resolver.ledger();
        let factory = resolver.resolve(BackendKind::Gl).unwrap();
        let builder = DeviceBuilder::new(factory.as_ref(), BackendPolicy::Gl, Platform::Linux);
        let window = fake_window();

        let built = builder
            .build(None, &request(BackendKind::Gl, 2), &SwapChainDesc::default(), Some(&window))
            .unwrap();
        assert!(built.deferred.is_empty());
        assert!(built.swapchain.is_some());
        assert!(built.notices.contains(&BootstrapNotice::SurfaceFolded { kind: BackendKind::Gl }));

        let ledger = ledger.lock().unwrap();
        assert_eq!(ledger.create_infos[0].num_deferred_contexts, 0);
        assert_eq!(ledger.count(&Event::CreateDeviceAndSwapChain(BackendKind::Gl)), 1);
        assert_eq!(ledger.count(&Event::CreateDevice(BackendKind::Gl)), 0);
    }

    #[test]
    fn test_gl_without_window() {
        let mut resolver = ScriptedResolver::new(Script::default());
        let factory = resolver.resolve(BackendKind::Gl).unwrap();

        let linux = DeviceBuilder::new(factory.as_ref(), BackendPolicy::Gl, Platform::Linux);
        let err = linux
            .build(None, &request(BackendKind::Gl, 0), &SwapChainDesc::default(), None)
            .unwrap_err();
        assert!(matches!(err, GraphicsError::DeviceCreation { kind: BackendKind::Gl, .. }));

        let mac = DeviceBuilder::new(factory.as_ref(), BackendPolicy::Gl, Platform::MacOs);
        let built = mac
            .build(None, &request(BackendKind::Gl, 0), &SwapChainDesc::default(), None)
            .unwrap();
        assert!(built.swapchain.is_none());
    }
}
