use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What the app loop reacts to
#[derive(Clone, Debug)]
pub enum LyrikEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events
pub trait EventSource: Send + 'static {
    /// Wait up to `timeout` for the next event
    fn recv_timeout(&self, timeout: Duration) -> Result<LyrikEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<LyrikEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // key release events show up on some platforms; only presses type
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    tx.send(LyrikEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(LyrikEvent::Resize),
                Ok(_) => Ok(()),
                Err(err) => {
                    log::warn!("terminal event stream closed: {err}");
                    break;
                }
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<LyrikEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Feeds events from a channel, for headless runs
pub struct ChannelEventSource {
    rx: Receiver<LyrikEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<LyrikEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<LyrikEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms.max(1)))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Milliseconds on a monotonic clock, the time base sessions run on
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall time since the clock was created
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Clock moved by hand; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Advances the app one event or tick at a time
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Next event, or `Tick` once the tick interval passes without one
    pub fn step(&self) -> LyrikEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                LyrikEvent::Tick
            }
        }
    }
}

/// Meaning of a key press while typing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    /// Same song, fresh session
    Restart,
    /// Pick another song
    NewSong,
    /// Speak the current word
    Speak,
    Backspace,
    Char(char),
    Ignore,
}

pub fn key_action(key: &KeyEvent) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => KeyAction::Quit,
        KeyCode::Char('c') if ctrl => KeyAction::Quit,
        KeyCode::Left => KeyAction::Restart,
        KeyCode::Right => KeyAction::NewSong,
        KeyCode::Tab => KeyAction::Speak,
        KeyCode::Backspace => KeyAction::Backspace,
        KeyCode::Char(c) if !ctrl => KeyAction::Char(c),
        _ => KeyAction::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(ChannelEventSource::new(rx), FixedTicker::from_millis(1));
        assert!(matches!(runner.step(), LyrikEvent::Tick));
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(LyrikEvent::Resize).unwrap();
        let runner = Runner::new(ChannelEventSource::new(rx), FixedTicker::from_millis(10));
        assert!(matches!(runner.step(), LyrikEvent::Resize));
    }

    #[test]
    fn disconnected_source_ticks() {
        let (tx, rx) = mpsc::channel::<LyrikEvent>();
        drop(tx);
        let runner = Runner::new(ChannelEventSource::new(rx), FixedTicker::from_millis(1));
        assert!(matches!(runner.step(), LyrikEvent::Tick));
    }

    #[test]
    fn manual_clock_is_shared() {
        let clock = ManualClock::new(100);
        let other = clock.clone();
        clock.advance(50);
        assert_eq!(other.now_ms(), 150);
        other.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn key_mapping() {
        let key = |code, modifiers| KeyEvent::new(code, modifiers);
        assert_eq!(key_action(&key(KeyCode::Esc, KeyModifiers::NONE)), KeyAction::Quit);
        assert_eq!(
            key_action(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyAction::Quit
        );
        assert_eq!(key_action(&key(KeyCode::Left, KeyModifiers::NONE)), KeyAction::Restart);
        assert_eq!(key_action(&key(KeyCode::Right, KeyModifiers::NONE)), KeyAction::NewSong);
        assert_eq!(
            key_action(&key(KeyCode::Char('R'), KeyModifiers::SHIFT)),
            KeyAction::Char('R')
        );
        assert_eq!(key_action(&key(KeyCode::Tab, KeyModifiers::NONE)), KeyAction::Speak);
        assert_eq!(key_action(&key(KeyCode::Up, KeyModifiers::NONE)), KeyAction::Ignore);
        assert_eq!(
            key_action(&key(KeyCode::Char('x'), KeyModifiers::CONTROL)),
            KeyAction::Ignore
        );
    }
}
