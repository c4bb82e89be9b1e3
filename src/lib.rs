//! DistBootstrap - 渲染后端引导库
//!
//! 负责在渲染开始之前选定图形后端、枚举适配器与显示模式、
//! 创建设备和执行上下文，并为窗口创建交换链。
//! 支持 Direct3D 11、Direct3D 12、OpenGL、Vulkan、Metal 以及纯软件的空后端。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（日志、配置、错误处理、平台信息）
//! - `gfx`: 图形后端抽象层与具体的能力提供者
//! - `bootstrap`: 引导流程（后端策略、状态机、回退）
//!
//! # 使用示例
//!
//! ```no_run
//! use dist_bootstrap::bootstrap::{Bootstrapper, BootstrapRequest};
//! use dist_bootstrap::core::{Config, Platform};
//! use dist_bootstrap::gfx::SystemResolver;
//!
//! let config = Config::default();
//! let platform = Platform::current();
//! let mut bootstrapper = Bootstrapper::new(SystemResolver::new(platform), platform);
//!
//! // 无窗口运行，不创建交换链
//! let session = bootstrapper.run(&BootstrapRequest::from_config(&config), None)?;
//! println!("running on {}", session.kind());
//! # Ok::<(), dist_bootstrap::core::GraphicsError>(())
//! ```

pub mod bootstrap;
pub mod core;
pub mod gfx;
