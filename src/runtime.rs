use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum RaceEvent {
    Key(KeyEvent),
    Resize,
    /// One second of test time; carries the generation of the session
    /// whose metronome produced it.
    Tick(u64),
}

/// Source of app events. Metronomes feed ticks through `sender`.
pub trait RaceEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<RaceEvent, RecvTimeoutError>;

    fn sender(&self) -> Sender<RaceEvent>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<RaceEvent>,
    rx: Receiver<RaceEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let reader_tx = tx.clone();

        thread::spawn(move || loop {
            let evt = match event::read() {
                Ok(CtEvent::Key(key)) => RaceEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => RaceEvent::Resize,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "terminal event reader stopped");
                    break;
                }
            };
            if reader_tx.send(evt).is_err() {
                break;
            }
        });

        Self { tx, rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RaceEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<RaceEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<RaceEvent> {
        self.tx.clone()
    }
}

/// Channel-fed event source for tests
pub struct TestEventSource {
    tx: Sender<RaceEvent>,
    rx: Receiver<RaceEvent>,
}

impl TestEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl Default for TestEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RaceEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<RaceEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<RaceEvent> {
        self.tx.clone()
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Periodic tick source for one running session.
///
/// Cancelled when dropped. A tick already in flight when it is cancelled
/// still reaches the channel, so consumers must compare the generation.
pub struct Metronome {
    generation: u64,
    stop: Arc<AtomicBool>,
}

impl Metronome {
    pub fn start<T: Ticker>(tx: Sender<RaceEvent>, ticker: T, generation: u64) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let interval = ticker.interval();

        thread::spawn(move || loop {
            thread::sleep(interval);
            if thread_stop.load(Ordering::Acquire) {
                break;
            }
            if tx.send(RaceEvent::Tick(generation)).is_err() {
                break;
            }
        });

        tracing::debug!(generation, "metronome started");
        Self { generation, stop }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        tracing::debug!(generation = self.generation, "metronome cancelled");
    }
}

/// Runner that advances the application one event at a time
pub struct Runner<E: RaceEventSource> {
    event_source: E,
    poll: Duration,
}

impl<E: RaceEventSource> Runner<E> {
    pub fn new(event_source: E, poll: Duration) -> Self {
        Self {
            event_source,
            poll,
        }
    }

    /// Blocks up to the poll interval; `None` means nothing arrived
    pub fn step(&self) -> Option<RaceEvent> {
        match self.event_source.recv_timeout(self.poll) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn sender(&self) -> Sender<RaceEvent> {
        self.event_source.sender()
    }
}

/// Wall-clock source for session timestamps
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for deterministic tests and replays
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_returns_none_on_timeout() {
        let runner = Runner::new(TestEventSource::new(), Duration::from_millis(1));
        assert!(runner.step().is_none());
    }

    #[test]
    fn step_passes_through_events() {
        let runner = Runner::new(TestEventSource::new(), Duration::from_millis(10));
        runner.sender().send(RaceEvent::Resize).unwrap();

        match runner.step() {
            Some(RaceEvent::Resize) => {}
            other => panic!("expected Resize event, got {other:?}"),
        }
    }

    #[test]
    fn metronome_ticks_with_generation() {
        let runner = Runner::new(TestEventSource::new(), Duration::from_millis(200));
        let metronome = Metronome::start(
            runner.sender(),
            FixedTicker::new(Duration::from_millis(5)),
            7,
        );
        assert_eq!(metronome.generation(), 7);

        match runner.step() {
            Some(RaceEvent::Tick(7)) => {}
            other => panic!("expected Tick(7), got {other:?}"),
        }
    }

    #[test]
    fn dropped_metronome_stops_ticking() {
        let runner = Runner::new(TestEventSource::new(), Duration::from_millis(1));
        let metronome = Metronome::start(
            runner.sender(),
            FixedTicker::new(Duration::from_millis(5)),
            1,
        );
        thread::sleep(Duration::from_millis(20));
        drop(metronome);

        // let any in-flight tick land, then drain
        thread::sleep(Duration::from_millis(30));
        while runner.step().is_some() {}

        thread::sleep(Duration::from_millis(50));
        assert!(runner.step().is_none());
    }

    #[test]
    fn manual_clock_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        let shared = clock.clone();
        shared.advance(chrono::Duration::seconds(9));
        assert_eq!(clock.now() - start, chrono::Duration::seconds(9));
    }
}
