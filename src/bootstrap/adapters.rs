//! 适配器目录与显示模式目录
//!
//! 两者都使用 "先取数量、再填充" 的两次调用约定查询工厂，本身没有副作用。

use crate::core::config::AdapterSelection;
use crate::core::error::{GfxResult, GraphicsError};
use crate::gfx::{AdapterDescriptor, AdapterType, DisplayModeDescriptor, EngineFactory, FeatureLevel, TextureFormat};

/// 一次枚举得到的适配器列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterDirectory {
    adapters: Vec<AdapterDescriptor>,
}

impl AdapterDirectory {
    pub fn enumerate(factory: &dyn EngineFactory, min_feature_level: FeatureLevel) -> Self {
        let mut count = 0u32;
        factory.enumerate_adapters(min_feature_level, &mut count, None);

        let mut adapters = vec![AdapterDescriptor::default(); count as usize];
        if count > 0 {
            factory.enumerate_adapters(min_feature_level, &mut count, Some(&mut adapters));
            // 第二次调用可能填充得更少
            adapters.truncate(count as usize);
        }
        Self { adapters }
    }

    pub fn adapters(&self) -> &[AdapterDescriptor] {
        &self.adapters
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&AdapterDescriptor> {
        self.adapters.get(index as usize)
    }

    /// 选定适配器索引
    ///
    /// 请求软件适配器时选第一个软件适配器；否则使用配置的索引。
    /// 列表为空时返回 `None`，由后端使用默认适配器。
    /// 索引越界时返回 `AdapterOutOfRange`，从不越界访问。
    pub fn select(
        &self,
        index: u32,
        adapter_type: AdapterType,
        selection: AdapterSelection,
    ) -> GfxResult<Option<u32>> {
        if self.adapters.is_empty() {
            return Ok(None);
        }
        let count = self.adapters.len() as u32;

        if adapter_type == AdapterType::Software {
            if let Some(pos) = self
                .adapters
                .iter()
                .position(|a| a.adapter_type == AdapterType::Software)
            {
                return Ok(Some(pos as u32));
            }
            if selection == AdapterSelection::Strict {
                return Err(GraphicsError::AdapterOutOfRange { index: None, adapter_type, count });
            }
        }

        if index < count {
            Ok(Some(index))
        } else {
            Err(GraphicsError::AdapterOutOfRange { index: Some(index), adapter_type, count })
        }
    }
}

/// 选定适配器、选定输出上的全屏显示模式
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayModeCatalog {
    modes: Vec<DisplayModeDescriptor>,
}

impl DisplayModeCatalog {
    pub fn enumerate(
        factory: &dyn EngineFactory,
        min_feature_level: FeatureLevel,
        adapter_id: u32,
        output_id: u32,
        format: TextureFormat,
    ) -> Self {
        let mut count = 0u32;
        factory.enumerate_display_modes(min_feature_level, adapter_id, output_id, format, &mut count, None);

        let mut modes = vec![DisplayModeDescriptor::default(); count as usize];
        if count > 0 {
            factory.enumerate_display_modes(
                min_feature_level,
                adapter_id,
                output_id,
                format,
                &mut count,
                Some(&mut modes),
            );
            modes.truncate(count as usize);
        }
        Self { modes }
    }

    pub fn modes(&self) -> &[DisplayModeDescriptor] {
        &self.modes
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn into_modes(self) -> Vec<DisplayModeDescriptor> {
        self.modes
    }
}
