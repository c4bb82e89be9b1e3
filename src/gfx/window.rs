//! 原生窗口句柄
//!
//! 引导流程只需要不透明的平台窗口/显示句柄，不依赖具体的窗口系统。

use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};

use crate::core::error::GraphicsError;

/// 原生窗口
///
/// 调用方需保证窗口在交换链存活期间一直有效。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeWindow {
    pub window: RawWindowHandle,
    pub display: RawDisplayHandle,
}

impl NativeWindow {
    pub fn new(window: RawWindowHandle, display: RawDisplayHandle) -> Self {
        Self { window, display }
    }

    /// 从窗口系统对象提取原生句柄
    ///
    /// 平台无法提供句柄时返回 `UnsupportedPlatform`，而不是中止进程。
    pub fn from_window<W>(window: &W) -> Result<Self, GraphicsError>
    where
        W: HasWindowHandle + HasDisplayHandle + ?Sized,
    {
        let window_handle = window
            .window_handle()
            .map_err(|e| GraphicsError::UnsupportedPlatform(format!("missing window handle: {}", e)))?;
        let display_handle = window
            .display_handle()
            .map_err(|e| GraphicsError::UnsupportedPlatform(format!("missing display handle: {}", e)))?;

        Ok(Self::new(window_handle.as_raw(), display_handle.as_raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_window_handle::{
        DisplayHandle, HandleError, Win32WindowHandle, WindowHandle, WindowsDisplayHandle,
    };
    use std::num::NonZeroIsize;

    struct Unavailable;

    impl HasWindowHandle for Unavailable {
        fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    impl HasDisplayHandle for Unavailable {
        fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    struct FakeWin32;

    impl HasWindowHandle for FakeWin32 {
        fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            let raw = RawWindowHandle::Win32(Win32WindowHandle::new(NonZeroIsize::new(7).unwrap()));
            Ok(unsafe { WindowHandle::borrow_raw(raw) })
        }
    }

    impl HasDisplayHandle for FakeWin32 {
        fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
            Ok(DisplayHandle::windows())
        }
    }

    #[test]
    fn test_missing_handle_is_typed_error() {
        let err = NativeWindow::from_window(&Unavailable).unwrap_err();
        assert!(matches!(err, GraphicsError::UnsupportedPlatform(_)));
    }

    #[test]
    fn test_handles_are_extracted() {
        let native = NativeWindow::from_window(&FakeWin32).unwrap();
        assert!(matches!(native.window, RawWindowHandle::Win32(_)));
        assert_eq!(
            native.display,
            RawDisplayHandle::Windows(WindowsDisplayHandle::new())
        );
    }
}
