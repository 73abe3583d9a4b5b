//! Presentation surface.
//!
//! The supervisor only needs a handful of drawing primitives: clear, the
//! transform/state stack, fonts, text and present. Everything else belongs
//! to the application.

use std::sync::Arc;

use parking_lot::Mutex;

/// Opaque font handle. Identity is all the supervisor cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FontId(pub u32);

/// 2D affine transform `[a c tx; b d ty]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub const fn translation(x: f32, y: f32) -> Self {
        Self {
            tx: x,
            ty: y,
            ..Self::IDENTITY
        }
    }

    pub const fn scaling(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// `self` followed by `next` (`next * self`).
    pub fn then(&self, next: &Self) -> Self {
        Self {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            tx: next.a * self.tx + next.c * self.ty + next.tx,
            ty: next.b * self.tx + next.d * self.ty + next.ty,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Clip rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scissor {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Drawing surface provided by the host.
pub trait Surface {
    /// Whether a display surface is currently available.
    fn is_active(&self) -> bool {
        true
    }

    fn clear(&mut self);

    /// Reset the current transform to identity.
    fn origin(&mut self);

    /// Save transform, scissor and render target.
    fn push(&mut self);

    /// Restore the state saved by the matching [`push`](Self::push).
    fn pop(&mut self);

    fn reset_scissor(&mut self);

    /// Draw to the default target again.
    fn reset_target(&mut self);

    fn font(&self) -> FontId;

    fn set_font(&mut self, font: FontId);

    /// A plain fallback font of the given pixel size.
    fn fallback_font(&mut self, size: f32) -> FontId;

    /// Display scale (pixels per logical unit).
    fn scale(&self) -> f32 {
        1.0
    }

    fn print(&mut self, text: &str, x: f32, y: f32);

    fn present(&mut self);
}

// ============================================================================
// Headless
// ============================================================================

/// Surface for hosts without a display. Never active; every call is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl Surface for Headless {
    fn is_active(&self) -> bool {
        false
    }
    fn clear(&mut self) {}
    fn origin(&mut self) {}
    fn push(&mut self) {}
    fn pop(&mut self) {}
    fn reset_scissor(&mut self) {}
    fn reset_target(&mut self) {}
    fn font(&self) -> FontId {
        FontId::default()
    }
    fn set_font(&mut self, _font: FontId) {}
    fn fallback_font(&mut self, _size: f32) -> FontId {
        FontId::default()
    }
    fn print(&mut self, _text: &str, _x: f32, _y: f32) {}
    fn present(&mut self) {}
}

// ============================================================================
// MemorySurface
// ============================================================================

/// A recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    Print { text: String, x: f32, y: f32 },
    Present,
}

/// In-memory surface that models the state stack and records draw calls.
///
/// Clones share state: hand one to the supervisor, inspect through another.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    state: Arc<Mutex<SurfaceState>>,
}

#[derive(Debug)]
struct SurfaceState {
    active: bool,
    scale: f32,
    transform: Transform,
    scissor: Option<Scissor>,
    target: Option<String>,
    stack: Vec<SavedState>,
    font: FontId,
    next_font: u32,
    font_sizes: Vec<(FontId, f32)>,
    ops: Vec<DrawOp>,
    frames: usize,
}

#[derive(Debug, Clone)]
struct SavedState {
    transform: Transform,
    scissor: Option<Scissor>,
    target: Option<String>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SurfaceState {
                active: true,
                scale: 1.0,
                transform: Transform::IDENTITY,
                scissor: None,
                target: None,
                stack: Vec::new(),
                font: FontId(0),
                next_font: 1,
                font_sizes: Vec::new(),
                ops: Vec::new(),
                frames: 0,
            })),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.state.lock().active = active;
    }

    pub fn set_scale(&self, scale: f32) {
        self.state.lock().scale = scale;
    }

    /// Compose a translation onto the current transform.
    pub fn translate(&self, x: f32, y: f32) {
        let mut state = self.state.lock();
        state.transform = Transform::translation(x, y).then(&state.transform);
    }

    /// Compose a scale onto the current transform.
    pub fn scale_by(&self, sx: f32, sy: f32) {
        let mut state = self.state.lock();
        state.transform = Transform::scaling(sx, sy).then(&state.transform);
    }

    pub fn set_scissor(&self, scissor: Scissor) {
        self.state.lock().scissor = Some(scissor);
    }

    pub fn set_target(&self, target: impl Into<String>) {
        self.state.lock().target = Some(target.into());
    }

    /// Allocate a new font handle and make it current.
    pub fn use_new_font(&self) -> FontId {
        let mut state = self.state.lock();
        let font = FontId(state.next_font);
        state.next_font += 1;
        state.font = font;
        font
    }

    pub fn transform(&self) -> Transform {
        self.state.lock().transform
    }

    pub fn scissor(&self) -> Option<Scissor> {
        self.state.lock().scissor
    }

    pub fn target(&self) -> Option<String> {
        self.state.lock().target.clone()
    }

    pub fn current_font(&self) -> FontId {
        self.state.lock().font
    }

    /// Pixel size a fallback font was created with.
    pub fn font_size(&self, font: FontId) -> Option<f32> {
        let state = self.state.lock();
        state
            .font_sizes
            .iter()
            .find(|(id, _)| *id == font)
            .map(|(_, size)| *size)
    }

    /// Depth of the transform/state stack.
    pub fn depth(&self) -> usize {
        self.state.lock().stack.len()
    }

    pub fn ops(&self) -> Vec<DrawOp> {
        self.state.lock().ops.clone()
    }

    /// Text printed since the last [`clear_ops`](Self::clear_ops).
    pub fn printed(&self) -> Vec<String> {
        self.state
            .lock()
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Print { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Number of presented frames.
    pub fn frames(&self) -> usize {
        self.state.lock().frames
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for MemorySurface {
    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    fn clear(&mut self) {
        self.state.lock().ops.push(DrawOp::Clear);
    }

    fn origin(&mut self) {
        self.state.lock().transform = Transform::IDENTITY;
    }

    fn push(&mut self) {
        let mut state = self.state.lock();
        let saved = SavedState {
            transform: state.transform,
            scissor: state.scissor,
            target: state.target.clone(),
        };
        state.stack.push(saved);
    }

    fn pop(&mut self) {
        let mut state = self.state.lock();
        if let Some(saved) = state.stack.pop() {
            state.transform = saved.transform;
            state.scissor = saved.scissor;
            state.target = saved.target;
        }
    }

    fn reset_scissor(&mut self) {
        self.state.lock().scissor = None;
    }

    fn reset_target(&mut self) {
        self.state.lock().target = None;
    }

    fn font(&self) -> FontId {
        self.state.lock().font
    }

    fn set_font(&mut self, font: FontId) {
        self.state.lock().font = font;
    }

    fn fallback_font(&mut self, size: f32) -> FontId {
        let mut state = self.state.lock();
        let font = FontId(state.next_font);
        state.next_font += 1;
        state.font_sizes.push((font, size));
        font
    }

    fn scale(&self) -> f32 {
        self.state.lock().scale
    }

    fn print(&mut self, text: &str, x: f32, y: f32) {
        self.state.lock().ops.push(DrawOp::Print {
            text: text.to_owned(),
            x,
            y,
        });
    }

    fn present(&mut self) {
        let mut state = self.state.lock();
        state.ops.push(DrawOp::Present);
        state.frames += 1;
    }
}
