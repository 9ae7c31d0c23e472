//! Keyboard and mouse event records passed to input hooks.

use crate::internal::{
    FieldReader,
    FieldWriter,
};
use crate::param::HookStruct;
use crate::param::private::Codec;

/// A screen position.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    fn decode(reader: &mut FieldReader<'_>) -> Self {
        Point {
            x: reader.i32(),
            y: reader.i32(),
        }
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer.i32(self.x).i32(self.y);
    }
}

/// Legacy mouse hook record, used by [`HookType::Mouse`](crate::HookType::Mouse) and
/// the click-skipped CBT notification.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct MouseHookStruct {
    pub pt: Point,
    pub hwnd: usize,
    pub hit_test_code: u32,
    pub extra_info: usize,
    /// Wheel delta or X button number.
    pub mouse_data: u32,
}

impl HookStruct for MouseHookStruct {
    const SIZE: usize = 32;
}

impl Codec for MouseHookStruct {
    fn decode(reader: &mut FieldReader<'_>) -> Self {
        MouseHookStruct {
            pt: Point::decode(reader),
            hwnd: reader.usize(),
            hit_test_code: reader.u32(),
            extra_info: reader.usize(),
            mouse_data: reader.u32(),
        }
    }

    fn encode(&self, writer: &mut FieldWriter) {
        self.pt.encode(writer);
        writer
            .usize(self.hwnd)
            .u32(self.hit_test_code)
            .usize(self.extra_info)
            .u32(self.mouse_data);
    }
}

/// Low-level mouse event record.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct MsLlHookStruct {
    pub pt: Point,
    pub mouse_data: u32,
    pub flags: u32,
    pub time: u32,
    pub extra_info: usize,
}

impl HookStruct for MsLlHookStruct {
    const SIZE: usize = 28;
}

impl Codec for MsLlHookStruct {
    fn decode(reader: &mut FieldReader<'_>) -> Self {
        MsLlHookStruct {
            pt: Point::decode(reader),
            mouse_data: reader.u32(),
            flags: reader.u32(),
            time: reader.u32(),
            extra_info: reader.usize(),
        }
    }

    fn encode(&self, writer: &mut FieldWriter) {
        self.pt.encode(writer);
        writer
            .u32(self.mouse_data)
            .u32(self.flags)
            .u32(self.time)
            .usize(self.extra_info);
    }
}

/// Low-level keyboard event record.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct KbdLlHookStruct {
    pub vk_code: u32,
    pub scan_code: u32,
    pub flags: u32,
    pub time: u32,
    pub extra_info: usize,
}

impl HookStruct for KbdLlHookStruct {
    const SIZE: usize = 24;
}

impl Codec for KbdLlHookStruct {
    fn decode(reader: &mut FieldReader<'_>) -> Self {
        KbdLlHookStruct {
            vk_code: reader.u32(),
            scan_code: reader.u32(),
            flags: reader.u32(),
            time: reader.u32(),
            extra_info: reader.usize(),
        }
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer
            .u32(self.vk_code)
            .u32(self.scan_code)
            .u32(self.flags)
            .u32(self.time)
            .usize(self.extra_info);
    }
}

/// Journal event record, read by journal record hooks and filled in by playback hooks.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct EventMsg {
    pub message: u32,
    pub param_l: u32,
    pub param_h: u32,
    pub time: u32,
    pub hwnd: usize,
}

impl HookStruct for EventMsg {
    const SIZE: usize = 24;
}

impl Codec for EventMsg {
    fn decode(reader: &mut FieldReader<'_>) -> Self {
        EventMsg {
            message: reader.u32(),
            param_l: reader.u32(),
            param_h: reader.u32(),
            time: reader.u32(),
            hwnd: reader.usize(),
        }
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer
            .u32(self.message)
            .u32(self.param_l)
            .u32(self.param_h)
            .u32(self.time)
            .usize(self.hwnd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_encoded_size<T: HookStruct>(value: T) {
        assert_eq!(value.to_bytes().len(), T::SIZE);
    }

    #[test]
    fn sizes_match_layout() {
        assert_encoded_size(MouseHookStruct::default());
        assert_encoded_size(MsLlHookStruct::default());
        assert_encoded_size(KbdLlHookStruct::default());
        assert_encoded_size(EventMsg::default());
    }

    #[test]
    fn keyboard_field_order() {
        let record = KbdLlHookStruct {
            vk_code: 0x41,
            scan_code: 0x1E,
            flags: 0x80,
            time: 1000,
            extra_info: 0xABCD,
        };
        let bytes = record.to_bytes();
        assert_eq!(&bytes[..4], &0x41u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &0x80u32.to_le_bytes());
        assert_eq!(KbdLlHookStruct::from_bytes(&bytes), record);
    }
}
