//! Per-type hook parameter marshalling.
//!
//! The pointer parameter of a hook call refers to caller memory whose layout depends on
//! the hook type and call code. Before a callback runs it is copied into a typed
//! [`HookParam`]; hook types that report results through the structure get it copied
//! back afterwards. Both copies are fault-contained: a bad caller pointer yields
//! [`HookError::MalformedParameter`] instead of a crash.

use tracing::warn;

use crate::error::HookError;
use crate::hook_type::{
    CbtCode,
    HookType,
};
use crate::input::{
    EventMsg,
    KbdLlHookStruct,
    MouseHookStruct,
    MsLlHookStruct,
};
use crate::internal::{
    FieldReader,
    FieldWriter,
};
use crate::memory::CallerMemory;
use crate::message::{
    CbtActivateStruct,
    CbtCreateWnd,
    Msg,
    Rect,
};
use crate::process::ProcessId;
use private::Codec;

/// A fixed-layout structure that can be copied to and from caller memory.
///
/// Fields are stored little-endian and unpadded; pointer-sized fields take 8 bytes.
pub trait HookStruct: Codec + Copy + Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    fn from_bytes(bytes: &[u8]) -> Self {
        Self::decode(&mut FieldReader::new(bytes))
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = FieldWriter::with_capacity(Self::SIZE);
        self.encode(&mut writer);
        writer.finish()
    }
}

pub(crate) mod private {
    use crate::internal::{
        FieldReader,
        FieldWriter,
    };

    pub trait Codec {
        fn decode(reader: &mut FieldReader<'_>) -> Self;

        fn encode(&self, writer: &mut FieldWriter);
    }
}

/// The typed pointer parameter a callback receives.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum HookParam {
    /// The caller passed a null pointer.
    Null,
    /// Passed through unmarshalled.
    Raw(usize),
    Mouse(MouseHookStruct),
    LowLevelMouse(MsLlHookStruct),
    LowLevelKeyboard(KbdLlHookStruct),
    Message(Msg),
    CreateWnd(CbtCreateWnd),
    MoveSize(Rect),
    Activate(CbtActivateStruct),
    Event(EventMsg),
}

/// How a hook call with a given type and code is delivered.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum Delivery {
    /// Walk the chain with this parameter.
    Chain(HookParam),
    /// Routed to the debug hook, which is not implemented.
    DebugStub,
    /// No delivery mechanism exists for this type.
    Unsupported,
}

fn copy_in<T: HookStruct>(
    memory: &dyn CallerMemory,
    process: ProcessId,
    hook_type: HookType,
    address: usize,
) -> Result<T, HookError> {
    let mut buf = vec![0; T::SIZE];
    memory
        .read(process, address, &mut buf)
        .map_err(|fault| HookError::MalformedParameter { hook_type, fault })?;
    Ok(T::from_bytes(&buf))
}

fn copy_out<T: HookStruct>(
    memory: &dyn CallerMemory,
    process: ProcessId,
    hook_type: HookType,
    address: usize,
    value: &T,
) -> Result<(), HookError> {
    memory
        .write(process, address, &value.to_bytes())
        .map_err(|fault| HookError::MalformedParameter { hook_type, fault })
}

/// Copies the pointer parameter in from the caller according to `hook_type` and `code`.
pub(crate) fn marshal_in(
    memory: &dyn CallerMemory,
    process: ProcessId,
    hook_type: HookType,
    code: i32,
    l_param: usize,
) -> Result<Delivery, HookError> {
    macro_rules! typed {
        ($variant:ident, $ty:ty) => {
            if l_param == 0 {
                HookParam::Null
            } else {
                HookParam::$variant(copy_in::<$ty>(memory, process, hook_type, l_param)?)
            }
        };
    }

    let param = match hook_type {
        HookType::Mouse => typed!(Mouse, MouseHookStruct),
        HookType::MouseLowLevel => typed!(LowLevelMouse, MsLlHookStruct),
        HookType::KeyboardLowLevel => typed!(LowLevelKeyboard, KbdLlHookStruct),
        HookType::MsgFilter | HookType::SysMsgFilter | HookType::GetMessage => {
            typed!(Message, Msg)
        }
        HookType::Cbt => match CbtCode::from(code) {
            CbtCode::CreateWnd => typed!(CreateWnd, CbtCreateWnd),
            CbtCode::MoveSize => typed!(MoveSize, Rect),
            CbtCode::Activate => typed!(Activate, CbtActivateStruct),
            CbtCode::ClickSkipped => typed!(Mouse, MouseHookStruct),
            _ => HookParam::Raw(l_param),
        },
        HookType::JournalPlayback | HookType::JournalRecord => typed!(Event, EventMsg),
        HookType::Debug => return Ok(Delivery::DebugStub),
        HookType::ForegroundIdle | HookType::Keyboard | HookType::Shell => {
            HookParam::Raw(l_param)
        }
        HookType::CallWndProc | HookType::CallWndProcRet | HookType::Hardware => {
            return Ok(Delivery::Unsupported);
        }
    };
    Ok(Delivery::Chain(param))
}

/// Copies a possibly mutated parameter back to the caller for the types that return data through it.
pub(crate) fn write_back(
    memory: &dyn CallerMemory,
    process: ProcessId,
    hook_type: HookType,
    l_param: usize,
    param: &HookParam,
) -> Result<(), HookError> {
    if l_param == 0 {
        return Ok(());
    }
    match (hook_type, param) {
        (HookType::GetMessage, HookParam::Message(msg)) => {
            copy_out(memory, process, hook_type, l_param, msg)
        }
        (HookType::JournalPlayback | HookType::JournalRecord, HookParam::Event(event)) => {
            copy_out(memory, process, hook_type, l_param, event)
        }
        _ => Ok(()),
    }
}

/// Reports a marshalling failure through diagnostics only.
pub(crate) fn report_malformed(err: &HookError, direction: &str) {
    warn!(%err, direction, "hook parameter copy faulted");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        Protection,
        RegionMemory,
    };

    const PROCESS: ProcessId = ProcessId(1);
    const BASE: usize = 0x4000;

    fn memory() -> RegionMemory {
        let memory = RegionMemory::new();
        memory.map(PROCESS, BASE, 0x100, Protection::ReadWrite);
        memory
    }

    #[test]
    fn low_level_keyboard_is_copied() -> anyhow::Result<()> {
        let memory = memory();
        let record = KbdLlHookStruct {
            vk_code: 0x20,
            ..Default::default()
        };
        memory.store(PROCESS, BASE, &record)?;
        let delivery = marshal_in(&memory, PROCESS, HookType::KeyboardLowLevel, 0, BASE)?;
        assert_eq!(delivery, Delivery::Chain(HookParam::LowLevelKeyboard(record)));
        Ok(())
    }

    #[test]
    fn cbt_codes_select_structure() -> anyhow::Result<()> {
        let memory = memory();
        let rect = Rect {
            left: 1,
            top: 2,
            right: 3,
            bottom: 4,
        };
        memory.store(PROCESS, BASE, &rect)?;
        let move_size = marshal_in(&memory, PROCESS, HookType::Cbt, 0, BASE)?;
        assert_eq!(move_size, Delivery::Chain(HookParam::MoveSize(rect)));
        let destroy = marshal_in(&memory, PROCESS, HookType::Cbt, 4, BASE)?;
        assert_eq!(destroy, Delivery::Chain(HookParam::Raw(BASE)));
        let click = marshal_in(&memory, PROCESS, HookType::Cbt, 6, BASE)?;
        assert!(matches!(click, Delivery::Chain(HookParam::Mouse(_))));
        Ok(())
    }

    #[test]
    fn null_pointer_is_not_copied() -> anyhow::Result<()> {
        let memory = memory();
        let delivery = marshal_in(&memory, PROCESS, HookType::GetMessage, 0, 0)?;
        assert_eq!(delivery, Delivery::Chain(HookParam::Null));
        write_back(&memory, PROCESS, HookType::GetMessage, 0, &HookParam::Null)?;
        Ok(())
    }

    #[test]
    fn bad_pointer_is_malformed() {
        let memory = memory();
        let result = marshal_in(&memory, PROCESS, HookType::MouseLowLevel, 0, 0xDEAD_0000);
        assert!(matches!(
            result,
            Err(HookError::MalformedParameter {
                hook_type: HookType::MouseLowLevel,
                ..
            })
        ));
    }

    #[test]
    fn special_types() -> anyhow::Result<()> {
        let memory = memory();
        assert_eq!(
            marshal_in(&memory, PROCESS, HookType::Debug, 0, BASE)?,
            Delivery::DebugStub
        );
        assert_eq!(
            marshal_in(&memory, PROCESS, HookType::CallWndProc, 0, BASE)?,
            Delivery::Unsupported
        );
        assert_eq!(
            marshal_in(&memory, PROCESS, HookType::Shell, 0, 0xDEAD_0000)?,
            Delivery::Chain(HookParam::Raw(0xDEAD_0000))
        );
        Ok(())
    }

    #[test]
    fn journal_event_is_written_back() -> anyhow::Result<()> {
        let memory = memory();
        memory.store(PROCESS, BASE, &EventMsg::default())?;
        let event = EventMsg {
            message: 0x100,
            time: 5,
            ..Default::default()
        };
        write_back(
            &memory,
            PROCESS,
            HookType::JournalPlayback,
            BASE,
            &HookParam::Event(event),
        )?;
        assert_eq!(memory.load::<EventMsg>(PROCESS, BASE)?, event);
        Ok(())
    }

    #[test]
    fn filter_messages_are_not_written_back() -> anyhow::Result<()> {
        let memory = memory();
        let msg = Msg {
            message: 9,
            ..Default::default()
        };
        write_back(&memory, PROCESS, HookType::MsgFilter, BASE, &HookParam::Message(msg))?;
        assert_eq!(memory.load::<Msg>(PROCESS, BASE)?, Msg::default());
        Ok(())
    }
}
