//! Desktop keyboard standing in for the terminal keypad.
//!
//! Keys map onto the same credential tokens the physical reader produces:
//!
//! | Key                  | Credential        |
//! |----------------------|-------------------|
//! | `0`..`9`             | the digit         |
//! | `Enter`, `#`         | confirm token     |
//! | `Backspace`, `*`     | cancel token      |
//! | `Esc`, `Ctrl+C`      | process exit      |
//!
//! Exiting on `Esc` is kiosk behavior: there is no way back into the reader
//! loop once the operator closes the simulator.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use fobreader_core::Credential;
use fobreader_core::constants::SIMULATED_POLL_INTERVAL_MS;
use tracing::{debug, info};

use super::InputSource;
use crate::error::Result;

/// Queue of pending terminal events.
pub trait KeyEvents: Send {
    /// The next queued event, or `None` if the queue is empty. Never waits.
    ///
    /// # Errors
    ///
    /// Returns an error if the event queue cannot be read.
    fn poll_event(&mut self) -> Result<Option<Event>>;
}

/// The process terminal's event queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstermEvents;

impl KeyEvents for CrosstermEvents {
    fn poll_event(&mut self) -> Result<Option<Event>> {
        if event::poll(Duration::ZERO)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }
}

/// What a single terminal event means to the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Credential(Credential),
    Terminate,
    Ignore,
}

/// Translate a terminal event into a reader action.
pub fn map_key_event(event: &Event) -> KeyAction {
    let Event::Key(key) = event else {
        return KeyAction::Ignore;
    };
    if key.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            KeyAction::Terminate
        }
        KeyCode::Esc => KeyAction::Terminate,
        KeyCode::Enter | KeyCode::Char('#') => KeyAction::Credential(Credential::confirm()),
        KeyCode::Backspace | KeyCode::Char('*') => KeyAction::Credential(Credential::cancel()),
        KeyCode::Char(c) if c.is_ascii_digit() => KeyAction::Credential(Credential::new(c)),
        _ => KeyAction::Ignore,
    }
}

/// Keyboard-driven input for the simulated platform.
pub struct SimulatedKeySource<E: KeyEvents = CrosstermEvents> {
    events: E,
    poll_interval: Duration,
    terminate: fn(),
}

impl SimulatedKeySource<CrosstermEvents> {
    pub fn new() -> Self {
        Self::with_events(CrosstermEvents)
    }
}

impl Default for SimulatedKeySource<CrosstermEvents> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: KeyEvents> SimulatedKeySource<E> {
    pub fn with_events(events: E) -> Self {
        Self {
            events,
            poll_interval: Duration::from_millis(SIMULATED_POLL_INTERVAL_MS),
            terminate: terminate_process,
        }
    }

    /// Replace what happens on `Esc` or `Ctrl+C`.
    pub fn with_terminate_hook(mut self, terminate: fn()) -> Self {
        self.terminate = terminate;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl<E: KeyEvents> std::fmt::Debug for SimulatedKeySource<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedKeySource")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl<E: KeyEvents> InputSource for SimulatedKeySource<E> {
    async fn read(&mut self) -> Result<Credential> {
        tokio::time::sleep(self.poll_interval).await;

        while let Some(event) = self.events.poll_event()? {
            match map_key_event(&event) {
                KeyAction::Credential(credential) => {
                    debug!("Simulated key read: {}", credential);
                    return Ok(credential);
                }
                KeyAction::Terminate => {
                    info!("Simulator closed by operator");
                    (self.terminate)();
                    return Ok(Credential::empty());
                }
                KeyAction::Ignore => {}
            }
        }

        Ok(Credential::empty())
    }
}

fn terminate_process() {
    crate::surface::restore_terminal();
    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedKeyEvents;
    use crossterm::event::{KeyEvent, KeyEventState};
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[rstest]
    #[case(KeyCode::Char('0'), "0")]
    #[case(KeyCode::Char('7'), "7")]
    #[case(KeyCode::Enter, "B")]
    #[case(KeyCode::Char('#'), "B")]
    #[case(KeyCode::Backspace, "A")]
    #[case(KeyCode::Char('*'), "A")]
    fn test_key_to_credential(#[case] code: KeyCode, #[case] expected: &str) {
        assert_eq!(
            map_key_event(&press(code)),
            KeyAction::Credential(Credential::new(expected))
        );
    }

    #[rstest]
    #[case(press(KeyCode::Esc))]
    #[case(Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)))]
    fn test_terminate_keys(#[case] event: Event) {
        assert_eq!(map_key_event(&event), KeyAction::Terminate);
    }

    #[rstest]
    #[case(press(KeyCode::Char('x')))]
    #[case(press(KeyCode::Up))]
    #[case(Event::FocusGained)]
    #[case(Event::Resize(80, 24))]
    fn test_unmapped_events_ignored(#[case] event: Event) {
        assert_eq!(map_key_event(&event), KeyAction::Ignore);
    }

    #[test]
    fn test_key_release_ignored() {
        let release = Event::Key(KeyEvent::new_with_kind_and_state(
            KeyCode::Char('1'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
            KeyEventState::NONE,
        ));
        assert_eq!(map_key_event(&release), KeyAction::Ignore);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_skips_ignored_events() {
        let events = ScriptedKeyEvents::from_iter([
            press(KeyCode::Up),
            press(KeyCode::Char('4')),
            press(KeyCode::Enter),
        ]);
        let mut source = SimulatedKeySource::with_events(events);

        assert_eq!(source.read().await.unwrap().as_str(), "4");
        assert!(source.read().await.unwrap().is_confirm());
        assert!(source.read().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_waits_poll_interval() {
        let mut source = SimulatedKeySource::with_events(ScriptedKeyEvents::new());
        let start = tokio::time::Instant::now();

        assert!(source.read().await.unwrap().is_empty());
        assert_eq!(start.elapsed(), Duration::from_millis(SIMULATED_POLL_INTERVAL_MS));
    }

    static TERMINATIONS: AtomicUsize = AtomicUsize::new(0);

    fn count_termination() {
        TERMINATIONS.fetch_add(1, Ordering::SeqCst);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escape_invokes_terminate_hook() {
        let events = ScriptedKeyEvents::from_iter([press(KeyCode::Esc), press(KeyCode::Char('1'))]);
        let mut source =
            SimulatedKeySource::with_events(events).with_terminate_hook(count_termination);

        assert!(source.read().await.unwrap().is_empty());
        assert_eq!(TERMINATIONS.load(Ordering::SeqCst), 1);
    }
}
