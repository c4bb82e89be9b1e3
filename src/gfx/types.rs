//! 后端无关的基础类型
//!
//! 后端种类、适配器与显示模式描述、特性级别、纹理格式和验证级别。
//! 这些类型同时被配置层（serde）和引导流程使用。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 图形后端种类
///
/// 同一时刻只有一个后端处于激活状态，只有编排器的回退逻辑可以改变它。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// 纯软件的空后端，不访问任何 GPU
    Null,
    /// Direct3D 11
    D3D11,
    /// Direct3D 12
    D3D12,
    /// OpenGL / OpenGL ES
    Gl,
    /// Vulkan
    Vulkan,
    /// Metal
    Metal,
}

impl BackendKind {
    pub const ALL: [BackendKind; 6] = [
        BackendKind::Null,
        BackendKind::D3D11,
        BackendKind::D3D12,
        BackendKind::Gl,
        BackendKind::Vulkan,
        BackendKind::Metal,
    ];

    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Null => "Null",
            BackendKind::D3D11 => "Direct3D 11",
            BackendKind::D3D12 => "Direct3D 12",
            BackendKind::Gl => "OpenGL",
            BackendKind::Vulkan => "Vulkan",
            BackendKind::Metal => "Metal",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    /// 接受配置文件中的小写名称以及常见的命令行缩写
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "null" => Ok(BackendKind::Null),
            "d3d11" | "dx11" => Ok(BackendKind::D3D11),
            "d3d12" | "dx12" => Ok(BackendKind::D3D12),
            "gl" | "gles" | "opengl" => Ok(BackendKind::Gl),
            "vk" | "vulkan" => Ok(BackendKind::Vulkan),
            "mtl" | "metal" => Ok(BackendKind::Metal),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// 适配器类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterType {
    #[default]
    Unknown,
    Hardware,
    Software,
}

/// 最低特性级别（如 `11_0`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeatureLevel {
    pub major: u8,
    pub minor: u8,
}

impl FeatureLevel {
    pub const L10_0: FeatureLevel = FeatureLevel { major: 10, minor: 0 };
    pub const L11_0: FeatureLevel = FeatureLevel { major: 11, minor: 0 };
    pub const L12_0: FeatureLevel = FeatureLevel { major: 12, minor: 0 };
}

impl Default for FeatureLevel {
    fn default() -> Self {
        FeatureLevel::L11_0
    }
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.major, self.minor)
    }
}

impl FromStr for FeatureLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once(|c: char| c == '_' || c == '.')
            .ok_or_else(|| format!("feature level '{}' must look like 11_0", s))?;
        let major = major
            .trim()
            .parse()
            .map_err(|_| format!("invalid major version in '{}'", s))?;
        let minor = minor
            .trim()
            .parse()
            .map_err(|_| format!("invalid minor version in '{}'", s))?;
        Ok(FeatureLevel { major, minor })
    }
}

impl TryFrom<String> for FeatureLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FeatureLevel> for String {
    fn from(level: FeatureLevel) -> Self {
        level.to_string()
    }
}

/// 交换链与显示模式使用的纹理格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    #[default]
    Unknown,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    D16Unorm,
    D24UnormS8Uint,
    D32Float,
}

impl TextureFormat {
    /// 是否为深度（模板）格式
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D16Unorm | TextureFormat::D24UnormS8Uint | TextureFormat::D32Float
        )
    }

    pub fn is_srgb(&self) -> bool {
        matches!(self, TextureFormat::Rgba8UnormSrgb | TextureFormat::Bgra8UnormSrgb)
    }
}

/// 物理适配器描述
///
/// 顺序即工厂报告的顺序；索引只在一次枚举调用期间稳定。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdapterDescriptor {
    pub name: String,
    pub adapter_type: AdapterType,
    pub vendor_id: u32,
    pub device_id: u32,
    /// 专用显存（字节），后端无法得知时为 0
    pub dedicated_video_memory: u64,
    /// 连接到该适配器的输出（显示器）数量
    pub num_outputs: u32,
}

impl AdapterDescriptor {
    /// 供适配器选择界面显示的详细信息
    pub fn details(&self) -> String {
        let mut details = format!(
            "{} ({:?}, vendor 0x{:04X}, device 0x{:04X})",
            self.name, self.adapter_type, self.vendor_id, self.device_id
        );
        if self.dedicated_video_memory > 0 {
            details.push_str(&format!(
                ", {} MB",
                self.dedicated_video_memory / (1024 * 1024)
            ));
        }
        if self.num_outputs > 0 {
            details.push_str(&format!(", {} output(s)", self.num_outputs));
        }
        details
    }
}

/// 全屏显示模式描述
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayModeDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub refresh_rate_numerator: u32,
    pub refresh_rate_denominator: u32,
}

impl DisplayModeDescriptor {
    /// 刷新率（Hz）
    pub fn refresh_rate(&self) -> f32 {
        if self.refresh_rate_denominator == 0 {
            return 0.0;
        }
        self.refresh_rate_numerator as f32 / self.refresh_rate_denominator as f32
    }
}

/// 验证级别
///
/// 三态：未设置（使用后端默认值）、0（强制关闭）、>= 1（开启，>= 2 额外开启 GPU 辅助验证）。
/// 负值等同于未设置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationLevel(Option<u32>);

impl ValidationLevel {
    pub const UNSET: ValidationLevel = ValidationLevel(None);

    pub fn new(level: u32) -> Self {
        ValidationLevel(Some(level))
    }

    /// 从有符号整数构造，负值表示未设置
    pub fn from_raw(raw: i32) -> Self {
        u32::try_from(raw).map(ValidationLevel::new).unwrap_or(ValidationLevel::UNSET)
    }

    pub fn level(&self) -> Option<u32> {
        self.0
    }

    pub fn is_unset(&self) -> bool {
        self.0.is_none()
    }
}

impl From<Option<i32>> for ValidationLevel {
    fn from(raw: Option<i32>) -> Self {
        raw.map(ValidationLevel::from_raw).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("dx12".parse::<BackendKind>(), Ok(BackendKind::D3D12));
        assert_eq!("VK".parse::<BackendKind>(), Ok(BackendKind::Vulkan));
        assert_eq!("gles".parse::<BackendKind>(), Ok(BackendKind::Gl));
        assert!("d3d9".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_feature_level_parse_and_order() {
        let level: FeatureLevel = "12_0".parse().unwrap();
        assert_eq!(level, FeatureLevel::L12_0);
        assert_eq!("11.0".parse::<FeatureLevel>(), Ok(FeatureLevel::L11_0));
        assert!(FeatureLevel::L10_0 < FeatureLevel::L11_0);
        assert!("eleven".parse::<FeatureLevel>().is_err());
        assert_eq!(FeatureLevel::L11_0.to_string(), "11_0");
    }

    #[test]
    fn test_validation_level_tri_state() {
        assert!(ValidationLevel::from_raw(-1).is_unset());
        assert_eq!(ValidationLevel::from_raw(0).level(), Some(0));
        assert_eq!(ValidationLevel::from(Some(2)).level(), Some(2));
        assert!(ValidationLevel::from(None).is_unset());
    }

    #[test]
    fn test_texture_format_classes() {
        assert!(TextureFormat::D32Float.is_depth());
        assert!(!TextureFormat::Rgba8UnormSrgb.is_depth());
        assert!(TextureFormat::Bgra8UnormSrgb.is_srgb());
    }

    #[test]
    fn test_adapter_details_and_refresh_rate() {
        let adapter = AdapterDescriptor {
            name: "Test GPU".into(),
            adapter_type: AdapterType::Hardware,
            vendor_id: 0x10DE,
            device_id: 0x2204,
            dedicated_video_memory: 8 * 1024 * 1024 * 1024,
            num_outputs: 2,
        };
        let details = adapter.details();
        assert!(details.contains("Test GPU"));
        assert!(details.contains("0x10DE"));
        assert!(details.contains("8192 MB"));

        let mode = DisplayModeDescriptor {
            width: 1920,
            height: 1080,
            format: TextureFormat::Rgba8UnormSrgb,
            refresh_rate_numerator: 60000,
            refresh_rate_denominator: 1001,
        };
        assert!((mode.refresh_rate() - 59.94).abs() < 0.01);
        assert_eq!(DisplayModeDescriptor::default().refresh_rate(), 0.0);
    }
}
