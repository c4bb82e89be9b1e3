//! 交换链描述
//!
//! `SwapChainDesc` 中的颜色/深度格式会在引导完成后被管线状态创建读取，
//! 因此交换链对象始终携带它实际采用的描述。

use super::types::{DisplayModeDescriptor, TextureFormat};

/// 交换链描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainDesc {
    pub width: u32,
    pub height: u32,
    pub color_format: TextureFormat,
    pub depth_format: TextureFormat,
    /// 后台缓冲数量
    pub buffer_count: u32,
    pub vsync: bool,
}

impl Default for SwapChainDesc {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            color_format: TextureFormat::Rgba8UnormSrgb,
            depth_format: TextureFormat::D32Float,
            buffer_count: 2,
            vsync: true,
        }
    }
}

/// 全屏模式描述
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FullScreenModeDesc {
    pub fullscreen: bool,
    pub refresh_rate_numerator: u32,
    pub refresh_rate_denominator: u32,
}

impl FullScreenModeDesc {
    /// 以指定显示模式进入全屏
    pub fn from_mode(mode: &DisplayModeDescriptor) -> Self {
        Self {
            fullscreen: true,
            refresh_rate_numerator: mode.refresh_rate_numerator,
            refresh_rate_denominator: mode.refresh_rate_denominator,
        }
    }
}
