//! DirectX 11 图形后端实现
//!
//! wgpu 不提供 D3D11 后端，这里直接通过 `windows` crate 调用 DXGI 与 D3D11：
//! DXGI 适配器与显示模式枚举、`D3D11CreateDevice`、延迟上下文以及
//! flip 模型交换链。D3D11 是 D3D12 设备创建失败时的回退后端。

mod factory;

pub use factory::{Dx11Context, Dx11Device, Dx11Factory, Dx11SwapChain};
