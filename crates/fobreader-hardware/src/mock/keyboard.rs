//! Scripted terminal events for the simulated keypad.

use std::collections::VecDeque;

use crossterm::event::Event;

use crate::error::Result;
use crate::input::KeyEvents;

/// Event queue that replays a fixed script, then stays empty.
#[derive(Debug, Default, Clone)]
pub struct ScriptedKeyEvents {
    events: VecDeque<Event>,
}

impl ScriptedKeyEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl FromIterator<Event> for ScriptedKeyEvents {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl KeyEvents for ScriptedKeyEvents {
    fn poll_event(&mut self) -> Result<Option<Event>> {
        Ok(self.events.pop_front())
    }
}
