//! Input intent.
//!
//! The simulation loop polls an [`InputSource`] once per sub-step. It only
//! asks whether an action is held; edge detection, rebinding and device
//! handling belong to whoever implements the trait.

use bevy::prelude::*;

use crate::config::KeyBindings;
use crate::scroll::Direction;

/// Actions the player can hold.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Jump,
    Left,
    Right,
}

/// Anything that can report which actions are currently held.
pub trait InputSource {
    fn is_held(&self, action: InputAction) -> bool;

    /// Horizontal direction requested this sub-step.
    ///
    /// Left and right held together cancel out.
    fn horizontal(&self) -> Option<Direction> {
        match (self.is_held(InputAction::Left), self.is_held(InputAction::Right)) {
            (true, false) => Some(Direction::Left),
            (false, true) => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Plain held-state snapshot.
///
/// Useful for tests, AI, replays and anything else that does not read a
/// keyboard.
///
/// # Example
///
/// ```rust
/// use msg_side_scroller::prelude::*;
///
/// let input = HeldInput::none().with_right().with_jump();
/// assert!(input.is_held(InputAction::Right));
/// assert!(input.is_held(InputAction::Jump));
/// assert!(!input.is_held(InputAction::Left));
/// ```
#[derive(Resource, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[reflect(Resource)]
pub struct HeldInput {
    pub jump: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldInput {
    /// Nothing held.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_jump(mut self) -> Self {
        self.jump = true;
        self
    }

    pub fn with_left(mut self) -> Self {
        self.left = true;
        self
    }

    pub fn with_right(mut self) -> Self {
        self.right = true;
        self
    }

    /// Set the held state of one action.
    pub fn set(&mut self, action: InputAction, held: bool) {
        match action {
            InputAction::Jump => self.jump = held,
            InputAction::Left => self.left = held,
            InputAction::Right => self.right = held,
        }
    }

    /// Release everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl InputSource for HeldInput {
    fn is_held(&self, action: InputAction) -> bool {
        match action {
            InputAction::Jump => self.jump,
            InputAction::Left => self.left,
            InputAction::Right => self.right,
        }
    }
}

/// Keyboard state read through a set of [`KeyBindings`].
pub struct KeyboardInput<'a> {
    keys: &'a ButtonInput<KeyCode>,
    bindings: &'a KeyBindings,
}

impl<'a> KeyboardInput<'a> {
    pub fn new(keys: &'a ButtonInput<KeyCode>, bindings: &'a KeyBindings) -> Self {
        Self { keys, bindings }
    }
}

impl InputSource for KeyboardInput<'_> {
    fn is_held(&self, action: InputAction) -> bool {
        self.keys.any_pressed(self.bindings.keys_for(action).iter().copied())
    }
}
