//! Recurring cycle driver.
//!
//! [`Scheduler`] runs engine cycles back to back at a target interval. The
//! cancel token is checked once before each cycle; a cycle that overruns the
//! interval is followed immediately by the next one and the missed tick is
//! dropped rather than queued. [`EngineRunner`] moves the whole loop onto a
//! background thread.

use crate::engine::{CycleOutcome, FrameSink, MosaicEngine, TileSource};
use crate::trace::{trace_event, trace_span};
use crate::util::{StitchError, StitchResult};
use crate::CanvasReader;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Time source for the scheduler.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Shared stop flag checked at every cycle boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Summary of one scheduler run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Cycles executed, including skipped ones.
    pub cycles: u64,
    /// Cycles that merged a tile.
    pub merged: u64,
    /// Cycles that took longer than the interval.
    pub overruns: u64,
    /// True when the run ended because the tile source ran dry.
    pub exhausted: bool,
}

/// Fixed-interval cycle loop.
#[derive(Clone, Copy, Debug)]
pub struct Scheduler {
    interval: Duration,
    max_cycles: Option<u64>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_cycles: None,
        }
    }

    /// Stops after `max_cycles` cycles even if never cancelled.
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs cycles until cancelled, halted, exhausted or out of budget.
    pub fn run(
        &self,
        engine: &mut MosaicEngine,
        source: &mut dyn TileSource,
        sink: &mut dyn FrameSink,
        token: &CancelToken,
        clock: &dyn Clock,
    ) -> ScheduleReport {
        let _span = trace_span!("schedule", interval_ms = self.interval.as_millis() as u64).entered();
        let mut report = ScheduleReport::default();

        loop {
            if token.is_cancelled() {
                break;
            }
            if self.max_cycles.is_some_and(|max| report.cycles >= max) {
                break;
            }

            let started = clock.now();
            match engine.run_cycle(source, sink) {
                CycleOutcome::Halted => break,
                CycleOutcome::Exhausted => {
                    report.exhausted = true;
                    break;
                }
                CycleOutcome::Merged { .. } => report.merged += 1,
                CycleOutcome::Skipped(_) => {}
            }
            report.cycles += 1;

            let elapsed = clock.now().saturating_duration_since(started);
            if elapsed < self.interval {
                clock.sleep(self.interval - elapsed);
            } else if elapsed > self.interval {
                report.overruns += 1;
            }
        }

        trace_event!(
            "schedule_finished",
            cycles = report.cycles,
            merged = report.merged,
            overruns = report.overruns,
            exhausted = report.exhausted
        );
        report
    }
}

/// Runs a scheduler on a background thread.
pub struct EngineRunner;

impl EngineRunner {
    /// Starts `engine` and drives it on a new thread.
    ///
    /// Fails synchronously with `EngineNotInitialized` when there is no canvas.
    pub fn spawn<S, F>(
        mut engine: MosaicEngine,
        mut source: S,
        mut sink: F,
        scheduler: Scheduler,
    ) -> StitchResult<RunnerHandle>
    where
        S: TileSource + Send + 'static,
        F: FrameSink + Send + 'static,
    {
        engine.start()?;
        let token = CancelToken::new();
        let reader = engine.reader();
        let thread_token = token.clone();
        let join = thread::Builder::new()
            .name("tilemosaic-engine".into())
            .spawn(move || {
                let report =
                    scheduler.run(&mut engine, &mut source, &mut sink, &thread_token, &SystemClock);
                engine.stop();
                (engine, report)
            })
            .map_err(|_| StitchError::InvalidState {
                op: "spawn",
                state: "thread creation failed",
            })?;
        Ok(RunnerHandle {
            token,
            reader,
            join,
        })
    }
}

/// Handle to a running background engine.
pub struct RunnerHandle {
    token: CancelToken,
    reader: CanvasReader,
    join: JoinHandle<(MosaicEngine, ScheduleReport)>,
}

impl RunnerHandle {
    /// Reader for the canvas the background engine publishes.
    pub fn reader(&self) -> CanvasReader {
        self.reader.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Requests a stop and waits for the current cycle to finish.
    pub fn stop(self) -> StitchResult<(MosaicEngine, ScheduleReport)> {
        self.token.cancel();
        self.wait()
    }

    /// Waits for the run to end on its own (exhausted source or budget).
    pub fn wait(self) -> StitchResult<(MosaicEngine, ScheduleReport)> {
        self.join.join().map_err(|_| StitchError::InvalidState {
            op: "join",
            state: "engine thread panicked",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelToken, Clock, Scheduler};
    use crate::engine::{MosaicConfig, MosaicEngine, NullSink, Tile};
    use crate::image::{Color, PixelBuffer};
    use crate::util::{StitchError, StitchResult};
    use std::cell::{Cell, RefCell};
    use std::time::{Duration, Instant};

    /// Clock that advances only when slept on or when a cycle costs time.
    struct FakeClock {
        start: Instant,
        offset: Cell<Duration>,
        sleeps: RefCell<Vec<Duration>>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                offset: Cell::new(Duration::ZERO),
                sleeps: RefCell::new(Vec::new()),
            }
        }

        fn advance(&self, d: Duration) {
            self.offset.set(self.offset.get() + d);
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.start + self.offset.get()
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
            self.advance(duration);
        }
    }

    fn running_engine() -> MosaicEngine {
        let mut engine = MosaicEngine::new(MosaicConfig {
            canvas_width: 16,
            canvas_height: 16,
            ..MosaicConfig::default()
        })
        .unwrap();
        engine
            .initialize(&Tile::new(PixelBuffer::filled(4, 4, Color::BLACK)))
            .unwrap();
        engine.start().unwrap();
        engine
    }

    #[test]
    fn sleeps_remaining_interval_and_drops_overruns() {
        let mut engine = running_engine();
        let clock = FakeClock::new();
        let costs = [Duration::from_millis(10), Duration::from_millis(150)];
        let mut calls = 0usize;
        let mut source = || -> StitchResult<Option<Tile>> {
            clock.advance(costs[calls % 2]);
            calls += 1;
            Err(StitchError::CaptureFailure {
                reason: "no window".into(),
            })
        };

        let report = Scheduler::new(Duration::from_millis(100))
            .with_max_cycles(4)
            .run(&mut engine, &mut source, &mut NullSink, &CancelToken::new(), &clock);

        assert_eq!(report.cycles, 4);
        assert_eq!(report.overruns, 2);
        assert_eq!(
            *clock.sleeps.borrow(),
            vec![Duration::from_millis(90), Duration::from_millis(90)]
        );
        assert_eq!(engine.stats().capture_failures, 4);
    }

    #[test]
    fn cancelled_token_prevents_next_cycle() {
        let mut engine = running_engine();
        let token = CancelToken::new();
        token.cancel();
        let mut source = || -> StitchResult<Option<Tile>> { Ok(None) };
        let report = Scheduler::new(Duration::ZERO).run(
            &mut engine,
            &mut source,
            &mut NullSink,
            &token,
            &FakeClock::new(),
        );
        assert_eq!(report.cycles, 0);
        assert!(!report.exhausted);
    }

    #[test]
    fn exhausted_source_ends_run() {
        let mut engine = running_engine();
        let mut source = || -> StitchResult<Option<Tile>> { Ok(None) };
        let report = Scheduler::new(Duration::ZERO).run(
            &mut engine,
            &mut source,
            &mut NullSink,
            &CancelToken::new(),
            &FakeClock::new(),
        );
        assert!(report.exhausted);
        assert_eq!(report.cycles, 0);
    }
}
