//! Host-side collaborators.
//!
//! These traits are the boundary to the application that owns the window and the
//! configuration. They carry no input logic of their own.

use std::path::PathBuf;

/// The window the input system is attached to.
pub trait HostWindow {
    /// Client-area size in pixels.
    fn client_size(&self) -> (u32, u32);

    /// Cursor position in client coordinates, if the cursor can be queried.
    fn cursor_pos(&self) -> Option<(i32, i32)>;

    /// Confine the cursor to the client area (`true`) or release it.
    fn clip_cursor(&mut self, confine: bool);

    fn set_cursor_visible(&mut self, visible: bool);
}

/// Resolves a device path to a human-friendly name.
pub trait DeviceNamer {
    fn friendly_name(&self, path: &str) -> Option<String>;
}

/// Native "open file" dialog. Blocks until the user picks a file or cancels.
///
/// Not used by the input system itself; hosts implement it next to
/// [`HostWindow`] for configuration screens.
pub trait FilePicker {
    fn pick_file(&mut self) -> Option<PathBuf>;
}

/// Window stand-in with a fixed client area and a settable cursor.
///
/// Used when the host has no real window yet, and by tests.
#[derive(Clone, Debug)]
pub struct HeadlessWindow {
    pub size: (u32, u32),
    pub cursor: Option<(i32, i32)>,
    pub clipped: bool,
    pub cursor_visible: bool,
}

impl HeadlessWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            cursor: None,
            clipped: false,
            cursor_visible: true,
        }
    }
}

impl HostWindow for HeadlessWindow {
    fn client_size(&self) -> (u32, u32) {
        self.size
    }

    fn cursor_pos(&self) -> Option<(i32, i32)> {
        self.cursor
    }

    fn clip_cursor(&mut self, confine: bool) {
        self.clipped = confine;
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }
}

/// Shared handle, so a caller can keep observing a window it handed over.
impl HostWindow for std::rc::Rc<std::cell::RefCell<HeadlessWindow>> {
    fn client_size(&self) -> (u32, u32) {
        self.borrow().size
    }

    fn cursor_pos(&self) -> Option<(i32, i32)> {
        self.borrow().cursor
    }

    fn clip_cursor(&mut self, confine: bool) {
        self.borrow_mut().clipped = confine;
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.borrow_mut().cursor_visible = visible;
    }
}

/// Fixed path → name table.
impl DeviceNamer for std::collections::HashMap<String, String> {
    fn friendly_name(&self, path: &str) -> Option<String> {
        self.get(path).cloned()
    }
}
