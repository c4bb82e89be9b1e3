//! 渲染后端引导
//!
//! 在图形工厂、适配器、设备/上下文和交换链之上实现完整的引导流程：
//!
//! - `request`：一次引导的输入，由配置生成
//! - `policy`：各后端初始化协议的差异（标签变体分发）
//! - `adapters`：两次调用式的适配器与显示模式枚举、适配器选择
//! - `device`：设备与执行上下文的创建
//! - `surface`：交换链的创建与平台约束
//! - `state`：引导状态机与引导过程中产生的通知
//! - `orchestrator`：按状态机驱动上述步骤，并负责 D3D12 到 D3D11 的一次性回退

pub mod adapters;
pub mod device;
pub mod orchestrator;
pub mod policy;
pub mod request;
pub mod state;
pub mod surface;

pub use adapters::{AdapterDirectory, DisplayModeCatalog};
pub use device::{BuiltDevice, DeviceBuilder};
pub use orchestrator::{Bootstrapper, Session};
pub use policy::BackendPolicy;
pub use request::BootstrapRequest;
pub use state::{BootstrapNotice, BootstrapState};
pub use surface::SurfaceBuilder;
