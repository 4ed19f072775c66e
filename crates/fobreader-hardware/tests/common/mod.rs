//! Shared fixtures for the hardware integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use fobreader_core::{Level, PinRole, PlatformKind};
use fobreader_hardware::devices::{AnyInputSource, AnyPinDriver};
use fobreader_hardware::input::SerialWiegandSource;
use fobreader_hardware::mock::{MockSerialHandle, MockSerialTransport};
use fobreader_hardware::pins::{SignalBus, SimulatedPinDriver};
use fobreader_hardware::screen::Screen;
use fobreader_hardware::{PinMap, PlatformProfile, Terminal};

/// A signal bus over in-memory lines with the simulated pin map.
pub fn simulated_bus() -> Arc<SignalBus> {
    Arc::new(SignalBus::new(
        PinMap::SIMULATED,
        AnyPinDriver::Simulated(SimulatedPinDriver::new()),
    ))
}

/// Every transition applied to `bus` so far, as pin roles.
pub fn transitions(bus: &SignalBus) -> Vec<(PinRole, Level)> {
    let AnyPinDriver::Simulated(driver) = bus.driver() else {
        panic!("expected simulated driver");
    };
    driver
        .history()
        .into_iter()
        .map(|(line, level)| (bus.pins().role(line).expect("unmapped line"), level))
        .collect()
}

/// A simulated terminal reading from a scripted serial transport.
pub fn scripted_terminal(screen: Option<Screen>) -> (Terminal, Arc<SignalBus>, MockSerialHandle) {
    let bus = simulated_bus();
    let (transport, serial) = MockSerialTransport::new();
    let input = AnyInputSource::Serial(SerialWiegandSource::new(Box::new(transport), None));
    let terminal = Terminal::from_parts(
        PlatformProfile::for_kind(PlatformKind::Simulated),
        Arc::clone(&bus),
        input,
        screen,
    )
    .expect("terminal should open");
    (terminal, bus, serial)
}
