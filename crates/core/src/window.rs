use hellforge_project::WindowState;

/// 視窗的位置、尺寸、可見與焦點狀態。 / Geometry, visibility and focus of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    title: String,
    visible: bool,
    focused: bool,
    position: (f32, f32),
    size: (f32, f32),
}

impl Window {
    /// 建立隱藏的新視窗。 / Creates a hidden window at the given position.
    pub fn new(title: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            title: title.into(),
            visible: false,
            focused: false,
            position: (x, y),
            size: (0.0, 0.0),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// 設定可見狀態；隱藏時一併失去焦點。 / Sets visibility; hiding also drops focus.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.focused = false;
        }
    }

    pub fn show(&mut self) {
        self.set_visible(true);
    }

    pub fn toggle_visibility(&mut self) {
        self.set_visible(!self.visible);
    }

    pub fn has_focus(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused && self.visible;
    }

    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = (x, y);
    }

    pub fn size(&self) -> (f32, f32) {
        self.size
    }

    /// 設定尺寸；零值代表保留目前尺寸。 / Resizes; a zero dimension keeps the current value.
    pub fn set_size(&mut self, width: f32, height: f32) {
        if width > 0.0 {
            self.size.0 = width;
        }
        if height > 0.0 {
            self.size.1 = height;
        }
    }

    /// 匯出可序列化的狀態。 / Snapshot used in session records.
    pub fn state(&self) -> WindowState {
        WindowState::new(self.visible, self.position, self.size)
    }

    /// 套用已保存的狀態。 / Applies a stored snapshot.
    pub fn apply(&mut self, state: &WindowState) {
        self.set_position(state.pos_x, state.pos_y);
        self.set_visible(state.visible);
        self.set_size(state.width, state.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_windows_cannot_hold_focus() {
        let mut window = Window::new("Console", 10.0, 500.0);
        window.set_focused(true);
        assert!(!window.has_focus());

        window.show();
        window.set_focused(true);
        assert!(window.has_focus());
        window.toggle_visibility();
        assert!(!window.has_focus());
    }

    #[test]
    fn state_round_trip_keeps_geometry() {
        let mut window = Window::new("a", 0.0, 0.0);
        window.apply(&WindowState::new(true, (12.0, 34.0), (640.0, 480.0)));
        assert_eq!(window.state(), WindowState::new(true, (12.0, 34.0), (640.0, 480.0)));

        window.set_size(0.0, 0.0);
        assert_eq!(window.size(), (640.0, 480.0));
    }
}
