//! Conversions from and to the Windows API types the hook structures mirror.

use windows::Win32::Foundation::{
    HWND,
    LPARAM,
    POINT,
    RECT,
    WPARAM,
};
use windows::Win32::UI::WindowsAndMessaging::{
    KBDLLHOOKSTRUCT,
    KBDLLHOOKSTRUCT_FLAGS,
    MSG,
    MSLLHOOKSTRUCT,
    WINDOWS_HOOK_ID,
};

use crate::error::HookError;
use crate::hook_type::HookType;
use crate::input::{
    KbdLlHookStruct,
    MsLlHookStruct,
    Point,
};
use crate::message::{
    Msg,
    Rect,
};

impl From<HookType> for WINDOWS_HOOK_ID {
    fn from(value: HookType) -> Self {
        WINDOWS_HOOK_ID(value.into())
    }
}

impl TryFrom<WINDOWS_HOOK_ID> for HookType {
    type Error = HookError;

    fn try_from(value: WINDOWS_HOOK_ID) -> Result<Self, Self::Error> {
        HookType::try_from(value.0).map_err(|_| HookError::InvalidParameter("hook type out of range"))
    }
}

impl From<POINT> for Point {
    fn from(value: POINT) -> Self {
        Point {
            x: value.x,
            y: value.y,
        }
    }
}

impl From<Point> for POINT {
    fn from(value: Point) -> Self {
        POINT {
            x: value.x,
            y: value.y,
        }
    }
}

impl From<RECT> for Rect {
    fn from(value: RECT) -> Self {
        Rect {
            left: value.left,
            top: value.top,
            right: value.right,
            bottom: value.bottom,
        }
    }
}

impl From<MSG> for Msg {
    fn from(value: MSG) -> Self {
        Msg {
            hwnd: value.hwnd.0 as usize,
            message: value.message,
            w_param: value.wParam.0,
            l_param: value.lParam.0,
            time: value.time,
            pt: value.pt.into(),
        }
    }
}

impl From<Msg> for MSG {
    fn from(value: Msg) -> Self {
        MSG {
            hwnd: HWND(value.hwnd as *mut _),
            message: value.message,
            wParam: WPARAM(value.w_param),
            lParam: LPARAM(value.l_param),
            time: value.time,
            pt: value.pt.into(),
        }
    }
}

impl From<KBDLLHOOKSTRUCT> for KbdLlHookStruct {
    fn from(value: KBDLLHOOKSTRUCT) -> Self {
        KbdLlHookStruct {
            vk_code: value.vkCode,
            scan_code: value.scanCode,
            flags: value.flags.0,
            time: value.time,
            extra_info: value.dwExtraInfo,
        }
    }
}

impl From<KbdLlHookStruct> for KBDLLHOOKSTRUCT {
    fn from(value: KbdLlHookStruct) -> Self {
        KBDLLHOOKSTRUCT {
            vkCode: value.vk_code,
            scanCode: value.scan_code,
            flags: KBDLLHOOKSTRUCT_FLAGS(value.flags),
            time: value.time,
            dwExtraInfo: value.extra_info,
        }
    }
}

impl From<MSLLHOOKSTRUCT> for MsLlHookStruct {
    fn from(value: MSLLHOOKSTRUCT) -> Self {
        MsLlHookStruct {
            pt: value.pt.into(),
            mouse_data: value.mouseData,
            flags: value.flags,
            time: value.time,
            extra_info: value.dwExtraInfo,
        }
    }
}
