//! DistBootstrap - 渲染后端引导程序
//!
//! 按配置选择图形后端，完成适配器枚举、设备与上下文创建以及交换链创建，
//! 然后进入窗口事件循环；窗口尺寸变化时重建交换链。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件
//! cargo run
//!
//! # 使用 Vulkan 并开启验证层
//! cargo run -- --mode vk --validation 1
//!
//! # 无窗口运行
//! cargo run -- --mode null --headless
//! ```
//!
//! # 架构概览
//!
//! ```text
//! ┌─────────────┐
//! │   main.rs   │  应用程序入口
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  Bootstrap  │  引导状态机与回退
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │     Gfx     │  工厂解析与具体后端
//! └─────────────┘
//! ```

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::{Fullscreen, Window, WindowBuilder};

use dist_bootstrap::bootstrap::{BootstrapRequest, Bootstrapper, Session};
use dist_bootstrap::core::{log, Config, Platform};
use dist_bootstrap::gfx::{DisplayModeDescriptor, NativeWindow, SystemResolver, TextureFormat};

/// 应用程序入口点
///
/// # 初始化流程
///
/// 1. 加载配置文件（config.toml）并应用命令行参数
/// 2. 初始化日志系统
/// 3. 无头模式直接引导；否则创建窗口后引导
/// 4. 进入事件循环
fn main() -> Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.apply_args(std::env::args());
    config.validate().context("invalid configuration")?;

    let log_file = config.logging.file_output.then_some(config.logging.log_file.as_str());
    log::init_logger(config.logging.level, config.logging.file_output, log_file)
        .context("failed to initialize logging")?;
    info!(version = env!("CARGO_PKG_VERSION"), "DistBootstrap starting...");

    let platform = Platform::current();
    let request = BootstrapRequest::from_config(&config);
    info!(
        backend = ?request.backend,
        platform = ?platform,
        width = config.window.width,
        height = config.window.height,
        "Graphics configuration"
    );

    if config.window.headless {
        let mut bootstrapper = Bootstrapper::new(SystemResolver::new(platform), platform);
        let session = bootstrapper.run(&request, None).context("bootstrap failed")?;
        report(&session);
        for notice in bootstrapper.notices() {
            info!(%notice, "Bootstrap notice");
        }
        return Ok(());
    }

    run_windowed(&config, platform, &request)
}

fn run_windowed(config: &Config, platform: Platform, request: &BootstrapRequest) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let window = WindowBuilder::new()
        .with_title(config.window.title.as_str())
        .with_inner_size(PhysicalSize::new(config.window.width, config.window.height))
        .with_resizable(config.window.resizable)
        .build(&event_loop)
        .context("failed to create window")?;
    let native = NativeWindow::from_window(&window)?;

    let resolver = SystemResolver::new(platform).with_display_modes(monitor_modes(&window, request));
    let mut bootstrapper = Bootstrapper::new(resolver, platform);
    let session = bootstrapper.run(request, Some(&native)).context("bootstrap failed")?;
    report(&session);
    for notice in bootstrapper.notices() {
        info!(%notice, "Bootstrap notice");
    }
    if session.needs_window_fullscreen() {
        // 窗口尺寸变化会触发交换链重建
        info!("Switching window to borderless fullscreen");
        window.set_fullscreen(Some(Fullscreen::Borderless(window.current_monitor())));
    }

    info!("Entering main loop...");
    // 会话必须先于窗口释放
    let mut session = Some(session);
    event_loop.run(move |event, target| match event {
        Event::WindowEvent { event: WindowEvent::CloseRequested, .. } => {
            info!("Close requested, shutting down...");
            session = None;
            target.exit();
        }
        Event::WindowEvent { event: WindowEvent::Resized(size), .. } => {
            debug!(width = size.width, height = size.height, "Window resized");
            let Some(active) = session.as_mut() else {
                return;
            };
            if size.width == 0 || size.height == 0 {
                return;
            }
            if let Err(e) = active.recreate_surface(size.width, size.height, &native) {
                error!(error = %e, "Failed to recreate swapchain");
                session = None;
                target.exit();
            }
        }
        Event::AboutToWait => window.request_redraw(),
        _ => (),
    })?;

    Ok(())
}

/// 当前显示器支持的全屏模式
fn monitor_modes(window: &Window, request: &BootstrapRequest) -> Vec<DisplayModeDescriptor> {
    let Some(monitor) = window.current_monitor() else {
        warn!("No monitor available, display modes will be empty");
        return Vec::new();
    };
    let format = match request.swapchain.color_format {
        TextureFormat::Unknown => TextureFormat::Rgba8UnormSrgb,
        format => format,
    };
    monitor
        .video_modes()
        .map(|mode| DisplayModeDescriptor {
            width: mode.size().width,
            height: mode.size().height,
            format,
            refresh_rate_numerator: mode.refresh_rate_millihertz(),
            refresh_rate_denominator: 1000,
        })
        .collect()
}

fn report(session: &Session) {
    info!(
        backend = %session.kind(),
        adapter = session.adapter().map(|a| a.name.as_str()).unwrap_or("<default>"),
        adapters = session.adapters().len(),
        display_modes = session.display_modes().len(),
        deferred_contexts = session.deferred_contexts().len(),
        headless = session.is_headless(),
        "Bootstrap complete"
    );
    if let Some(swapchain) = session.swapchain() {
        let desc = swapchain.desc();
        info!(
            width = desc.width,
            height = desc.height,
            buffers = desc.buffer_count,
            color = ?desc.color_format,
            depth = ?desc.depth_format,
            "Swapchain ready"
        );
    }
}
