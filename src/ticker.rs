use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

pub const DEFAULT_TICK: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub sequence: u64,
}

/// Owned handle to a running recompute timer. The timer thread only signals;
/// whoever holds the handle does the work, so two recomputations never overlap.
/// Dropping the handle stops and joins the timer.
pub struct TickerHandle {
    ticks: Receiver<Tick>,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl TickerHandle {
    pub fn spawn(period: Duration) -> io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        // A single slot: ticks that arrive while the consumer is busy coalesce.
        let (tick_tx, tick_rx) = mpsc::sync_channel::<Tick>(1);

        let worker = thread::Builder::new()
            .name("recompute-ticker".to_string())
            .spawn(move || run_timer(period, stop_rx, tick_tx))?;
        debug!(?period, "started recompute ticker");

        Ok(Self {
            ticks: tick_rx,
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    /// Returns a pending tick without blocking.
    pub fn try_tick(&self) -> Option<Tick> {
        self.ticks.try_recv().ok()
    }

    /// Blocks until the next tick. `None` once the timer has stopped.
    pub fn wait_tick(&self) -> Option<Tick> {
        self.ticks.recv().ok()
    }

    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the timer thread immediately.
        drop(self.stop.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("recompute ticker thread panicked");
            } else {
                debug!("stopped recompute ticker");
            }
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_timer(period: Duration, stop: Receiver<()>, ticks: SyncSender<Tick>) {
    let mut deadline = Instant::now() + period;
    let mut sequence = 0;

    loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        match stop.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }

        sequence += 1;
        match ticks.try_send(Tick { sequence }) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => return,
        }
        deadline += period;
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::TickerHandle;

    #[test]
    fn emits_increasing_ticks() {
        let ticker = TickerHandle::spawn(Duration::from_millis(10)).expect("spawn ticker");

        let first = ticker.wait_tick().expect("first tick");
        let second = ticker.wait_tick().expect("second tick");

        assert!(second.sequence > first.sequence);
    }

    #[test]
    fn cancel_stops_promptly_and_joins() {
        let ticker = TickerHandle::spawn(Duration::from_secs(3600)).expect("spawn ticker");
        let started = Instant::now();

        ticker.cancel();

        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn busy_consumer_sees_coalesced_ticks() {
        let ticker = TickerHandle::spawn(Duration::from_millis(20)).expect("spawn ticker");
        std::thread::sleep(Duration::from_millis(200));

        let mut pending = 0;
        while ticker.try_tick().is_some() {
            pending += 1;
        }

        assert!(pending <= 1);
    }
}
