//! Relay address bus encoder.
//!
//! The downstream relay decoder reads an 8-bit code from the address lines
//! when the trigger line goes high. [`OutputBus::emit`] presents a code with a
//! fixed transition order:
//!
//! 1. trigger low
//! 2. every address line, the LED and the beeper low
//! 3. address line `i` high for each set bit `i`
//! 4. trigger high, only for a nonzero code
//!
//! The trigger is therefore never high while the address lines hold anything
//! other than the final code. `emit(0)` is the idle state the terminal
//! returns to at startup and logout.

use std::sync::Arc;

use fobreader_core::constants::{ADDRESS_LINES, LOGIN_ADDRESS_LINE};
use fobreader_core::{Level, PinRole};
use tracing::debug;

use crate::error::Result;
use crate::pins::SignalBus;

/// Encodes access codes onto the relay bus.
#[derive(Debug, Clone)]
pub struct OutputBus {
    bus: Arc<SignalBus>,
}

impl OutputBus {
    pub fn new(bus: Arc<SignalBus>) -> Self {
        Self { bus }
    }

    /// Present `code` on the address lines and strobe the trigger.
    ///
    /// The whole sequence is one bus batch, so an emit or login through a
    /// clone of this bus cannot land between its steps.
    ///
    /// # Errors
    ///
    /// Returns an error if a line write fails; the bus may then be left
    /// partially cleared but the trigger is already low.
    pub fn emit(&self, code: u8) -> Result<()> {
        self.bus.drive(&emit_sequence(code))?;
        debug!("Emitted code {} ({:#010b})", code, code);
        Ok(())
    }

    /// Signal a logged-in user.
    ///
    /// Address line 5 is raised together with the trigger: on installations
    /// without a cabinet decoder it is wired as a second trigger. The LED is
    /// lit and the beeper silenced.
    ///
    /// # Errors
    ///
    /// Returns an error if a line write fails.
    pub fn login(&self) -> Result<()> {
        self.bus.drive(&[
            (PinRole::Address(LOGIN_ADDRESS_LINE), Level::High),
            (PinRole::Trigger, Level::High),
            (PinRole::Led, Level::High),
            (PinRole::Beeper, Level::Low),
        ])?;
        debug!("Login signalled");
        Ok(())
    }

    pub fn signal_bus(&self) -> &Arc<SignalBus> {
        &self.bus
    }
}

/// Transitions presenting `code`, in bus order.
fn emit_sequence(code: u8) -> Vec<(PinRole, Level)> {
    let clear = (0..ADDRESS_LINES as u8)
        .map(|bit| (PinRole::Address(bit), Level::Low))
        .chain([(PinRole::Led, Level::Low), (PinRole::Beeper, Level::Low)]);
    let set = (0..ADDRESS_LINES as u8)
        .filter(|bit| code & (1 << bit) != 0)
        .map(|bit| (PinRole::Address(bit), Level::High));
    let strobe = (code != 0).then_some((PinRole::Trigger, Level::High));

    std::iter::once((PinRole::Trigger, Level::Low))
        .chain(clear)
        .chain(set)
        .chain(strobe)
        .collect()
}
