//! Fault state and presentation snapshot.
//!
//! ```text
//!            raise                      clear_if_faulted
//! Clear ──────────────▶ Faulted ────────────────────────▶ Clear
//!                         │  ▲
//!                         └──┘ raise (message replaced, snapshot kept)
//! ```
//!
//! Raising with an active surface pushes its state stack and switches to a
//! plain presentation (identity transform, no scissor, default target,
//! fallback font) so the fault message is readable whatever the application
//! left behind. Clearing pops the stack and restores the font.

mod report;

pub use report::{Fault, sanitize};

use crate::host::{FontId, Surface};

/// Presentation state saved when a fault was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    font: FontId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum FaultState {
    #[default]
    Clear,
    Faulted {
        message: String,
        snapshot: Option<Snapshot>,
    },
}

impl FaultState {
    /// Enter (or stay in) the faulted state.
    ///
    /// A snapshot is taken only on the transition from `Clear` and only when
    /// a surface is given and active. `font_size` is scaled by the surface.
    pub fn raise(&mut self, message: String, surface: Option<&mut dyn Surface>, font_size: f32) {
        if let Self::Faulted { message: current, .. } = self {
            *current = message;
            return;
        }

        let snapshot = surface.filter(|s| s.is_active()).map(|s| {
            s.push();
            s.origin();
            s.reset_scissor();
            s.reset_target();
            let font = s.font();
            let fallback = s.fallback_font(font_size * s.scale());
            s.set_font(fallback);
            Snapshot { font }
        });

        *self = Self::Faulted { message, snapshot };
    }

    /// Return to `Clear`, restoring presentation state if it was saved.
    ///
    /// Returns whether a fault was cleared.
    pub fn clear_if_faulted(&mut self, surface: &mut dyn Surface) -> bool {
        match std::mem::take(self) {
            Self::Clear => false,
            Self::Faulted { snapshot, .. } => {
                if let Some(snapshot) = snapshot {
                    surface.pop();
                    surface.set_font(snapshot.font);
                }
                true
            }
        }
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self, Self::Faulted { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Clear => None,
            Self::Faulted { message, .. } => Some(message),
        }
    }

    pub fn has_snapshot(&self) -> bool {
        matches!(self, Self::Faulted { snapshot: Some(_), .. })
    }
}
