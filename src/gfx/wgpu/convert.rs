//! 引导层类型与 wgpu 类型之间的转换

use crate::gfx::backend::BackendCreateInfo;
use crate::gfx::types::{AdapterDescriptor, AdapterType, BackendKind, FeatureLevel, TextureFormat};

/// 后端种类对应的 wgpu 后端位；wgpu 不提供的后端返回 `None`
pub fn backend_bits(kind: BackendKind) -> Option<wgpu::Backends> {
    match kind {
        BackendKind::D3D12 => Some(wgpu::Backends::DX12),
        BackendKind::Vulkan => Some(wgpu::Backends::VULKAN),
        BackendKind::Metal => Some(wgpu::Backends::METAL),
        BackendKind::Gl => Some(wgpu::Backends::GL),
        BackendKind::Null | BackendKind::D3D11 => None,
    }
}

/// 由创建参数得到实例标志
///
/// D3D12 的 GPU 辅助验证在 wgpu 0.19 中没有对应的实例标志，
/// 只能随调试层一起打开标准验证。
pub fn instance_flags(backend: &BackendCreateInfo) -> wgpu::InstanceFlags {
    let validation = match backend {
        BackendCreateInfo::D3D12(info) => info.enable_debug_layer,
        BackendCreateInfo::Vulkan(info) => info.enable_validation,
        _ => return wgpu::InstanceFlags::from_build_config(),
    };

    if validation {
        wgpu::InstanceFlags::DEBUG | wgpu::InstanceFlags::VALIDATION
    } else {
        wgpu::InstanceFlags::empty()
    }
}

pub fn adapter_type(device_type: wgpu::DeviceType) -> AdapterType {
    match device_type {
        wgpu::DeviceType::Cpu => AdapterType::Software,
        wgpu::DeviceType::DiscreteGpu
        | wgpu::DeviceType::IntegratedGpu
        | wgpu::DeviceType::VirtualGpu => AdapterType::Hardware,
        wgpu::DeviceType::Other => AdapterType::Unknown,
    }
}

pub fn adapter_descriptor(info: &wgpu::AdapterInfo) -> AdapterDescriptor {
    AdapterDescriptor {
        name: info.name.clone(),
        adapter_type: adapter_type(info.device_type),
        vendor_id: info.vendor,
        device_id: info.device,
        dedicated_video_memory: 0,
        num_outputs: 0,
    }
}

/// 适配器是否满足最低特性级别
///
/// 11_0 以上要求计算着色器，12_0 以上要求完整的 WebGPU 能力集。
pub fn meets_feature_level(caps: &wgpu::DownlevelCapabilities, level: FeatureLevel) -> bool {
    if level >= FeatureLevel::L12_0 {
        return caps.is_webgpu_compliant();
    }
    if level >= FeatureLevel::L11_0 {
        return caps.flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS);
    }
    true
}

pub fn to_wgpu_format(format: TextureFormat) -> Option<wgpu::TextureFormat> {
    match format {
        TextureFormat::Unknown => None,
        TextureFormat::Rgba8Unorm => Some(wgpu::TextureFormat::Rgba8Unorm),
        TextureFormat::Rgba8UnormSrgb => Some(wgpu::TextureFormat::Rgba8UnormSrgb),
        TextureFormat::Bgra8Unorm => Some(wgpu::TextureFormat::Bgra8Unorm),
        TextureFormat::Bgra8UnormSrgb => Some(wgpu::TextureFormat::Bgra8UnormSrgb),
        TextureFormat::D16Unorm => Some(wgpu::TextureFormat::Depth16Unorm),
        TextureFormat::D24UnormS8Uint => Some(wgpu::TextureFormat::Depth24PlusStencil8),
        TextureFormat::D32Float => Some(wgpu::TextureFormat::Depth32Float),
    }
}

pub fn from_wgpu_format(format: wgpu::TextureFormat) -> TextureFormat {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => TextureFormat::Rgba8Unorm,
        wgpu::TextureFormat::Rgba8UnormSrgb => TextureFormat::Rgba8UnormSrgb,
        wgpu::TextureFormat::Bgra8Unorm => TextureFormat::Bgra8Unorm,
        wgpu::TextureFormat::Bgra8UnormSrgb => TextureFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Depth16Unorm => TextureFormat::D16Unorm,
        wgpu::TextureFormat::Depth24PlusStencil8 => TextureFormat::D24UnormS8Uint,
        wgpu::TextureFormat::Depth32Float => TextureFormat::D32Float,
        _ => TextureFormat::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::backend::{D3D12CreateInfo, VulkanCreateInfo};

    #[test]
    fn test_backend_bits() {
        assert_eq!(backend_bits(BackendKind::Vulkan), Some(wgpu::Backends::VULKAN));
        assert_eq!(backend_bits(BackendKind::D3D11), None);
        assert_eq!(backend_bits(BackendKind::Null), None);
    }

    #[test]
    fn test_validation_maps_to_instance_flags() {
        let on = instance_flags(&BackendCreateInfo::D3D12(D3D12CreateInfo {
            enable_debug_layer: true,
            enable_gpu_based_validation: true,
        }));
        assert!(on.contains(wgpu::InstanceFlags::VALIDATION));

        let off = instance_flags(&BackendCreateInfo::Vulkan(VulkanCreateInfo { enable_validation: false }));
        assert!(off.is_empty());
    }

    #[test]
    fn test_device_type_mapping() {
        assert_eq!(adapter_type(wgpu::DeviceType::Cpu), AdapterType::Software);
        assert_eq!(adapter_type(wgpu::DeviceType::DiscreteGpu), AdapterType::Hardware);
        assert_eq!(adapter_type(wgpu::DeviceType::Other), AdapterType::Unknown);
    }

    #[test]
    fn test_format_mapping() {
        for format in [
            TextureFormat::Rgba8Unorm,
            TextureFormat::Bgra8UnormSrgb,
            TextureFormat::D24UnormS8Uint,
            TextureFormat::D32Float,
        ] {
            let wgpu_format = to_wgpu_format(format).unwrap();
            assert_eq!(from_wgpu_format(wgpu_format), format);
        }
        assert_eq!(to_wgpu_format(TextureFormat::Unknown), None);
    }
}
