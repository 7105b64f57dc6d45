use std::fmt;

use super::error::SubsystemError;

/// A collaborator driven by the engine loop. Everything except `name` has a
/// no-op default so placeholders only implement what they need.
///
/// All methods are called from the loop thread.
pub trait Subsystem: Send {
    fn name(&self) -> &str;

    fn initialize(&mut self) -> Result<(), SubsystemError> {
        Ok(())
    }

    /// Variable-rate update, once per frame.
    fn update(&mut self, _dt: f64) {}

    /// Fixed-rate update; `dt` is always the fixed time step.
    fn fixed_update(&mut self, _dt: f64) {}

    fn render(&mut self) {}

    fn process_input(&mut self) {}

    fn shutdown(&mut self) {}
}

/// Position a [`Subsystem`] occupies in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Physics,
    Rendering,
    Ai,
    Audio,
    Input,
    Race,
    /// Loading screen
    Loader,
    MainMenu,
    RaceSetup,
    RaceResults,
}

impl Slot {
    /// Initialization order. Shutdown walks it backwards.
    pub const INIT_ORDER: [Slot; 10] = [
        Slot::Physics,
        Slot::Rendering,
        Slot::Ai,
        Slot::Audio,
        Slot::Input,
        Slot::Race,
        Slot::Loader,
        Slot::MainMenu,
        Slot::RaceSetup,
        Slot::RaceResults,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Fixed table of optional subsystems, one per [`Slot`].
#[derive(Default)]
pub(crate) struct Subsystems {
    slots: [Option<Box<dyn Subsystem>>; 10],
}

impl Subsystems {
    pub(crate) fn attach(&mut self, slot: Slot, subsystem: Box<dyn Subsystem>) -> Option<Box<dyn Subsystem>> {
        self.slots[slot.index()].replace(subsystem)
    }

    pub(crate) fn get_mut(&mut self, slot: Slot) -> Option<&mut (dyn Subsystem + 'static)> {
        self.slots[slot.index()].as_deref_mut()
    }

    pub(crate) fn is_attached(&self, slot: Slot) -> bool {
        self.slots[slot.index()].is_some()
    }

    /// Run `f` on the subsystem in `slot`, if any.
    pub(crate) fn with(&mut self, slot: Slot, f: impl FnOnce(&mut dyn Subsystem)) {
        if let Some(subsystem) = self.get_mut(slot) {
            f(subsystem);
        }
    }

    /// Occupied slots in initialization order.
    pub(crate) fn in_init_order(&self) -> Vec<Slot> {
        Slot::INIT_ORDER
            .into_iter()
            .filter(|slot| self.is_attached(*slot))
            .collect()
    }
}
