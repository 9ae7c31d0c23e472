//! Window message records passed to message and CBT hooks.

use crate::input::Point;
use crate::internal::{
    FieldReader,
    FieldWriter,
};
use crate::param::HookStruct;
use crate::param::private::Codec;

/// A queued window message.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct Msg {
    pub hwnd: usize,
    pub message: u32,
    pub w_param: usize,
    pub l_param: isize,
    pub time: u32,
    pub pt: Point,
}

impl HookStruct for Msg {
    const SIZE: usize = 40;
}

impl Codec for Msg {
    fn decode(reader: &mut FieldReader<'_>) -> Self {
        Msg {
            hwnd: reader.usize(),
            message: reader.u32(),
            w_param: reader.usize(),
            l_param: reader.isize(),
            time: reader.u32(),
            pt: Point {
                x: reader.i32(),
                y: reader.i32(),
            },
        }
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer
            .usize(self.hwnd)
            .u32(self.message)
            .usize(self.w_param)
            .isize(self.l_param)
            .u32(self.time)
            .i32(self.pt.x)
            .i32(self.pt.y);
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl HookStruct for Rect {
    const SIZE: usize = 16;
}

impl Codec for Rect {
    fn decode(reader: &mut FieldReader<'_>) -> Self {
        Rect {
            left: reader.i32(),
            top: reader.i32(),
            right: reader.i32(),
            bottom: reader.i32(),
        }
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer
            .i32(self.left)
            .i32(self.top)
            .i32(self.right)
            .i32(self.bottom);
    }
}

/// Window creation notification data.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct CbtCreateWnd {
    /// Address of the creation parameters in the caller's address space.
    pub create_params: usize,
    pub insert_after: usize,
}

impl HookStruct for CbtCreateWnd {
    const SIZE: usize = 16;
}

impl Codec for CbtCreateWnd {
    fn decode(reader: &mut FieldReader<'_>) -> Self {
        CbtCreateWnd {
            create_params: reader.usize(),
            insert_after: reader.usize(),
        }
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer.usize(self.create_params).usize(self.insert_after);
    }
}

/// Window activation notification data.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct CbtActivateStruct {
    /// Whether activation was caused by a mouse click.
    pub mouse: bool,
    pub active_window: usize,
}

impl HookStruct for CbtActivateStruct {
    const SIZE: usize = 12;
}

impl Codec for CbtActivateStruct {
    fn decode(reader: &mut FieldReader<'_>) -> Self {
        CbtActivateStruct {
            mouse: reader.bool(),
            active_window: reader.usize(),
        }
    }

    fn encode(&self, writer: &mut FieldWriter) {
        writer.bool(self.mouse).usize(self.active_window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_layout() {
        assert_eq!(Msg::default().to_bytes().len(), Msg::SIZE);
        assert_eq!(Rect::default().to_bytes().len(), Rect::SIZE);
        assert_eq!(CbtCreateWnd::default().to_bytes().len(), CbtCreateWnd::SIZE);
        assert_eq!(
            CbtActivateStruct::default().to_bytes().len(),
            CbtActivateStruct::SIZE
        );
    }

    #[test]
    fn msg_decodes_all_fields() {
        let msg = Msg {
            hwnd: 0x10,
            message: 0x0201,
            w_param: 1,
            l_param: -5,
            time: 77,
            pt: Point { x: -3, y: 9 },
        };
        assert_eq!(Msg::from_bytes(&msg.to_bytes()), msg);
    }
}
