// Pointer and viewport tracking
// Abstracts winit events into a queryable per-frame snapshot

use glam::Vec2;
use winit::event::{MouseScrollDelta, WindowEvent};

pub struct InputState {
    // Pointer, in physical pixels from the window's top-left
    pub mouse_position: (f32, f32),

    // Scroll: accumulated vertical scroll this frame, reset in end_frame()
    pub scroll_delta: f32,

    // Window dimensions (used for pointer normalization)
    pub window_size: (u32, u32),
}

impl InputState {
    pub fn new() -> Self {
        Self {
            mouse_position: (0.0, 0.0),
            scroll_delta: 0.0,
            window_size: (0, 0),
        }
    }

    /// Feed a winit WindowEvent into the input state.
    /// Call this once per event before the app's own event handling.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.scroll_delta += y;
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
            }
            _ => {}
        }
    }

    /// Call once per frame after update() and render() have consumed input.
    /// Resets per-frame accumulators.
    pub fn end_frame(&mut self) {
        self.scroll_delta = 0.0;
    }

    /// Pointer position normalized to -1..1 per axis (-1 = left/top edge,
    /// +1 = right/bottom edge). `None` before the first resize event.
    pub fn pointer_normalized(&self) -> Option<Vec2> {
        let (w, h) = (self.window_size.0 as f32, self.window_size.1 as f32);
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        let nx = (self.mouse_position.0 / w) * 2.0 - 1.0;
        let ny = (self.mouse_position.1 / h) * 2.0 - 1.0;
        Some(Vec2::new(nx.clamp(-1.0, 1.0), ny.clamp(-1.0, 1.0)))
    }
}
