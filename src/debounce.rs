//! Command debouncing.
//!
//! Turns the noisy per-frame label stream into an edge-triggered, rate-limited
//! command stream:
//! - a label change emits that label and starts the long cooldown
//! - a departure (no label after something else was sent) emits `N` and starts
//!   the short cooldown
//! - repeats of the last sent command emit nothing
//!
//! While a cooldown is running the frame's label is not evaluated at all. The
//! emission frame counts as the first cooldown frame.

use serde::Serialize;

use crate::classify::Material;
use crate::command::Command;

pub const DEFAULT_LABEL_COOLDOWN: u32 = 10;
pub const DEFAULT_DEPARTURE_COOLDOWN: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebounceSettings {
    /// Frames of cooldown after a label emission.
    pub label_cooldown: u32,
    /// Frames of cooldown after an `N` emission.
    pub departure_cooldown: u32,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            label_cooldown: DEFAULT_LABEL_COOLDOWN,
            departure_cooldown: DEFAULT_DEPARTURE_COOLDOWN,
        }
    }
}

/// Process-lifetime debouncer state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DebounceState {
    /// Last command written to the link, if any.
    pub last_sent: Option<Command>,
    /// Frames left before the next evaluation.
    pub cooldown: u32,
    /// Steel classifications evaluated so far. Never resets.
    pub steel_confirmations: u64,
}

#[derive(Clone, Debug, Default)]
pub struct CommandDebouncer {
    settings: DebounceSettings,
    state: DebounceState,
}

impl CommandDebouncer {
    pub fn new(settings: DebounceSettings) -> Self {
        Self {
            settings,
            state: DebounceState::default(),
        }
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    pub fn settings(&self) -> &DebounceSettings {
        &self.settings
    }

    /// Feeds one frame's label and returns the command to send, if any.
    pub fn step(&mut self, label: Option<Material>) -> Option<Command> {
        let mut emitted = None;

        if self.state.cooldown == 0 {
            match label {
                Some(material) => {
                    let command = self.resolve(material);
                    if self.state.last_sent != Some(command) {
                        emitted = Some(command);
                        self.state.last_sent = Some(command);
                        self.state.cooldown = self.settings.label_cooldown;
                    }
                }
                None if self.state.last_sent != Some(Command::Nothing) => {
                    emitted = Some(Command::Nothing);
                    self.state.last_sent = Some(Command::Nothing);
                    self.state.cooldown = self.settings.departure_cooldown;
                }
                None => {}
            }
        }

        if self.state.cooldown > 0 {
            self.state.cooldown -= 1;
        }
        emitted
    }

    /// Maps a material to its command. Only the first steel confirmation of
    /// the run is sent as steel; every later one is sent as unknown.
    fn resolve(&mut self, material: Material) -> Command {
        if material != Material::SteelGray {
            return Command::from(material);
        }
        self.state.steel_confirmations += 1;
        if self.state.steel_confirmations == 1 {
            Command::Steel
        } else {
            Command::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(debouncer: &mut CommandDebouncer, labels: &[Option<Material>]) -> Vec<Command> {
        labels
            .iter()
            .filter_map(|&label| debouncer.step(label))
            .collect()
    }

    #[test]
    fn first_absent_frame_announces_nothing() {
        let mut debouncer = CommandDebouncer::default();
        assert_eq!(debouncer.step(None), Some(Command::Nothing));
        assert_eq!(debouncer.state().cooldown, DEFAULT_DEPARTURE_COOLDOWN - 1);
    }

    #[test]
    fn repeated_label_is_sent_once() {
        let mut debouncer = CommandDebouncer::default();
        let sent = run(&mut debouncer, &[Some(Material::Red); 40]);
        assert_eq!(sent, vec![Command::Red]);
    }

    #[test]
    fn cooldown_suppresses_evaluation_for_following_frames() {
        let mut debouncer = CommandDebouncer::default();
        assert_eq!(debouncer.step(Some(Material::Red)), Some(Command::Red));
        for _ in 0..DEFAULT_LABEL_COOLDOWN - 1 {
            assert_eq!(debouncer.step(Some(Material::Yellow)), None);
        }
        assert_eq!(debouncer.state().cooldown, 0);
        assert_eq!(debouncer.step(Some(Material::Yellow)), Some(Command::Yellow));
    }

    #[test]
    fn departure_uses_short_cooldown() {
        let mut debouncer = CommandDebouncer::default();
        debouncer.step(Some(Material::Sand));
        for _ in 0..DEFAULT_LABEL_COOLDOWN - 1 {
            debouncer.step(None);
        }
        assert_eq!(debouncer.step(None), Some(Command::Nothing));
        for _ in 0..DEFAULT_DEPARTURE_COOLDOWN - 1 {
            assert_eq!(debouncer.step(Some(Material::Red)), None);
        }
        assert_eq!(debouncer.step(Some(Material::Red)), Some(Command::Red));
    }

    #[test]
    fn absent_frames_after_nothing_are_silent() {
        let mut debouncer = CommandDebouncer::default();
        let sent = run(&mut debouncer, &[None; 500]);
        assert_eq!(sent, vec![Command::Nothing]);
    }

    #[test]
    fn steel_is_real_only_once() {
        let mut debouncer = CommandDebouncer::default();
        let mut labels = Vec::new();
        for _ in 0..3 {
            labels.push(Some(Material::SteelGray));
            labels.extend(std::iter::repeat(None).take(20));
        }
        let sent = run(&mut debouncer, &labels);
        assert_eq!(
            sent,
            vec![
                Command::Steel,
                Command::Nothing,
                Command::Unknown,
                Command::Nothing,
                Command::Unknown,
                Command::Nothing,
            ]
        );
        assert_eq!(debouncer.state().steel_confirmations, 3);
    }

    #[test]
    fn steel_counter_ignores_frames_in_cooldown() {
        let mut debouncer = CommandDebouncer::default();
        run(&mut debouncer, &[Some(Material::SteelGray); 10]);
        assert_eq!(debouncer.state().steel_confirmations, 1);
        // The next evaluated steel frame counts and is redirected.
        assert_eq!(debouncer.step(Some(Material::SteelGray)), Some(Command::Unknown));
        assert_eq!(debouncer.state().steel_confirmations, 2);
    }

    #[test]
    fn duplicate_after_cooldown_does_not_restart_it() {
        let mut debouncer = CommandDebouncer::default();
        run(&mut debouncer, &[Some(Material::Yellow); 10]);
        assert_eq!(debouncer.state().cooldown, 0);
        assert_eq!(debouncer.step(Some(Material::Yellow)), None);
        assert_eq!(debouncer.state().cooldown, 0);
        assert_eq!(debouncer.step(None), Some(Command::Nothing));
    }
}
