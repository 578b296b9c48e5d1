//! Keyboard input state and the viewer's key bindings.
//!
//! [`Input`] tracks which keys are currently pressed, just pressed this
//! frame, or just released this frame. The window event handler feeds it;
//! [`actions`] turns this frame's presses into [`ViewerAction`]s.
//!
//! | Key | Action |
//! |-----|--------|
//! | `1`..`5` | toggle diffuse, displacement, normal, roughness, AO |
//! | `→` / `←` | next / previous material set |
//! | `R` | reload the current set |
//! | `Esc` | exit |

use std::collections::HashSet;
use std::hash::Hash;

pub use winit::keyboard::KeyCode;

use crate::render3d::material::Channel;

/// Tracks the state of a set of inputs (keys or buttons).
///
/// - `pressed`: currently held down
/// - `just_pressed`: pressed this frame (not held last frame)
/// - `just_released`: released this frame
#[derive(Debug)]
pub struct Input<T: Eq + Hash + Copy> {
    pressed: HashSet<T>,
    just_pressed: HashSet<T>,
    just_released: HashSet<T>,
}

impl<T: Eq + Hash + Copy> Input<T> {
    pub fn new() -> Self {
        Self {
            pressed: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    /// Returns `true` if the input is currently held down.
    pub fn pressed(&self, input: T) -> bool {
        self.pressed.contains(&input)
    }

    /// Returns `true` if the input was pressed this frame.
    pub fn just_pressed(&self, input: T) -> bool {
        self.just_pressed.contains(&input)
    }

    /// Returns `true` if the input was released this frame.
    pub fn just_released(&self, input: T) -> bool {
        self.just_released.contains(&input)
    }

    /// Call when an input is pressed (from event handler).
    pub fn press(&mut self, input: T) {
        if self.pressed.insert(input) {
            self.just_pressed.insert(input);
        }
    }

    /// Call when an input is released (from event handler).
    pub fn release(&mut self, input: T) {
        if self.pressed.remove(&input) {
            self.just_released.insert(input);
        }
    }

    /// Clear per-frame state. Called once the frame's actions are handled.
    pub fn clear_just(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl<T: Eq + Hash + Copy> Default for Input<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Something the user asked the viewer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerAction {
    ToggleLayer(Channel),
    NextSet,
    PreviousSet,
    Reload,
    Exit,
}

const BINDINGS: [(KeyCode, ViewerAction); 9] = [
    (KeyCode::Digit1, ViewerAction::ToggleLayer(Channel::Diffuse)),
    (KeyCode::Digit2, ViewerAction::ToggleLayer(Channel::Displacement)),
    (KeyCode::Digit3, ViewerAction::ToggleLayer(Channel::Normal)),
    (KeyCode::Digit4, ViewerAction::ToggleLayer(Channel::Roughness)),
    (KeyCode::Digit5, ViewerAction::ToggleLayer(Channel::AmbientOcclusion)),
    (KeyCode::ArrowRight, ViewerAction::NextSet),
    (KeyCode::ArrowLeft, ViewerAction::PreviousSet),
    (KeyCode::KeyR, ViewerAction::Reload),
    (KeyCode::Escape, ViewerAction::Exit),
];

/// Actions for every bound key pressed this frame, in binding-table order.
pub fn actions(keys: &Input<KeyCode>) -> Vec<ViewerAction> {
    BINDINGS
        .iter()
        .filter(|(key, _)| keys.just_pressed(*key))
        .map(|&(_, action)| action)
        .collect()
}
