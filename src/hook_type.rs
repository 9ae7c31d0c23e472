//! Hook types, call codes and the per-thread hook mask.

use bitflags::bitflags;
use num_enum::{
    FromPrimitive,
    IntoPrimitive,
    TryFromPrimitive,
};

/// Number of distinct hook types, i.e. chains per hook table.
pub const HOOK_TYPE_COUNT: usize = (HookType::MAX - HookType::MIN + 1) as usize;

/// An interception point in the input/message pipeline.
///
/// The discriminants are the raw hook ids used on the kernel-call surface.
#[derive(TryFromPrimitive, IntoPrimitive, Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(i32)]
pub enum HookType {
    /// Messages for dialogs, menus and scroll bars of the installing application.
    MsgFilter = -1,
    JournalRecord = 0,
    JournalPlayback = 1,
    Keyboard = 2,
    /// Messages about to be returned from the message queue.
    GetMessage = 3,
    CallWndProc = 4,
    /// Window creation, sizing, activation and related notifications.
    Cbt = 5,
    /// System wide variant of [`HookType::MsgFilter`].
    SysMsgFilter = 6,
    Mouse = 7,
    Hardware = 8,
    Debug = 9,
    Shell = 10,
    ForegroundIdle = 11,
    CallWndProcRet = 12,
    KeyboardLowLevel = 13,
    MouseLowLevel = 14,
}

impl HookType {
    pub const MIN: i32 = -1;
    pub const MAX: i32 = 14;

    pub const ALL: [HookType; HOOK_TYPE_COUNT] = [
        HookType::MsgFilter,
        HookType::JournalRecord,
        HookType::JournalPlayback,
        HookType::Keyboard,
        HookType::GetMessage,
        HookType::CallWndProc,
        HookType::Cbt,
        HookType::SysMsgFilter,
        HookType::Mouse,
        HookType::Hardware,
        HookType::Debug,
        HookType::Shell,
        HookType::ForegroundIdle,
        HookType::CallWndProcRet,
        HookType::KeyboardLowLevel,
        HookType::MouseLowLevel,
    ];

    /// Index of this type's chain inside a hook table.
    #[inline]
    pub fn index(self) -> usize {
        (i32::from(self) - Self::MIN) as usize
    }

    #[inline]
    pub fn flag(self) -> HookTypeFlags {
        HookTypeFlags::from_bits_retain(1 << self.index())
    }

    /// The two low-level input hooks, which are delivered in the context of the installing thread.
    pub fn is_low_level(self) -> bool {
        matches!(self, HookType::KeyboardLowLevel | HookType::MouseLowLevel)
    }

    /// Types that can never be installed for a specific thread.
    pub fn is_global_only(self) -> bool {
        matches!(
            self,
            HookType::JournalRecord
                | HookType::JournalPlayback
                | HookType::KeyboardLowLevel
                | HookType::MouseLowLevel
                | HookType::SysMsgFilter
        )
    }

    /// Whether installation is implemented for this type in the given scope.
    ///
    /// Only the low-level input hooks, the get-message hook and thread-local CBT hooks are.
    pub fn is_installable(self, global: bool) -> bool {
        match self {
            HookType::KeyboardLowLevel | HookType::MouseLowLevel | HookType::GetMessage => true,
            HookType::Cbt => !global,
            _ => false,
        }
    }
}

bitflags! {
    /// Set of hook types installed for a thread, one bit per chain index.
    #[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
    pub struct HookTypeFlags: u32 {
        const MSG_FILTER = 1 << 0;
        const JOURNAL_RECORD = 1 << 1;
        const JOURNAL_PLAYBACK = 1 << 2;
        const KEYBOARD = 1 << 3;
        const GET_MESSAGE = 1 << 4;
        const CALL_WND_PROC = 1 << 5;
        const CBT = 1 << 6;
        const SYS_MSG_FILTER = 1 << 7;
        const MOUSE = 1 << 8;
        const HARDWARE = 1 << 9;
        const DEBUG = 1 << 10;
        const SHELL = 1 << 11;
        const FOREGROUND_IDLE = 1 << 12;
        const CALL_WND_PROC_RET = 1 << 13;
        const KEYBOARD_LL = 1 << 14;
        const MOUSE_LL = 1 << 15;
    }
}

/// Call codes of the [`HookType::Cbt`] hook.
#[derive(FromPrimitive, Copy, Clone, Eq, PartialEq, Debug)]
#[repr(i32)]
pub enum CbtCode {
    MoveSize = 0,
    MinMax = 1,
    Qs = 2,
    CreateWnd = 3,
    DestroyWnd = 4,
    Activate = 5,
    ClickSkipped = 6,
    KeySkipped = 7,
    SysCommand = 8,
    SetFocus = 9,
    #[num_enum(catch_all)]
    Other(i32),
}

/// Text encoding a callback expects for string data.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub enum TextEncoding {
    Ansi,
    #[default]
    Unicode,
}

impl From<bool> for TextEncoding {
    /// Converts the raw `ansi` flag of the kernel-call surface.
    fn from(ansi: bool) -> Self {
        if ansi {
            TextEncoding::Ansi
        } else {
            TextEncoding::Unicode
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_cover_table() {
        for (expected, hook_type) in HookType::ALL.into_iter().enumerate() {
            assert_eq!(hook_type.index(), expected);
        }
        assert_eq!(HookType::MouseLowLevel.index(), HOOK_TYPE_COUNT - 1);
    }

    #[test]
    fn raw_range_is_validated() {
        assert_eq!(HookType::try_from(-1i32).ok(), Some(HookType::MsgFilter));
        assert_eq!(HookType::try_from(14i32).ok(), Some(HookType::MouseLowLevel));
        assert!(HookType::try_from(-2i32).is_err());
        assert!(HookType::try_from(15i32).is_err());
    }

    #[test]
    fn flags_match_named_constants() {
        assert_eq!(HookType::MsgFilter.flag(), HookTypeFlags::MSG_FILTER);
        assert_eq!(HookType::GetMessage.flag(), HookTypeFlags::GET_MESSAGE);
        assert_eq!(HookType::Cbt.flag(), HookTypeFlags::CBT);
        assert_eq!(HookType::KeyboardLowLevel.flag(), HookTypeFlags::KEYBOARD_LL);
        assert_eq!(HookType::MouseLowLevel.flag(), HookTypeFlags::MOUSE_LL);
        let all = HookType::ALL
            .into_iter()
            .fold(HookTypeFlags::empty(), |acc, ty| acc | ty.flag());
        assert_eq!(all, HookTypeFlags::all());
    }

    #[test]
    fn installable_subset() {
        assert!(HookType::Cbt.is_installable(false));
        assert!(!HookType::Cbt.is_installable(true));
        assert!(HookType::GetMessage.is_installable(true));
        assert!(HookType::MouseLowLevel.is_installable(true));
        assert!(!HookType::Shell.is_installable(false));
        assert!(!HookType::JournalRecord.is_installable(true));
    }

    #[test]
    fn cbt_code_catch_all() {
        assert_eq!(CbtCode::from(5), CbtCode::Activate);
        assert_eq!(CbtCode::from(42), CbtCode::Other(42));
    }
}
