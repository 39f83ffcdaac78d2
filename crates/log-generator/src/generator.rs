//! The generation loop.

use crate::catalog::{Catalog, Severity};
use crate::config::IntervalConfig;
use crate::error::{GeneratorError, Result};
use crate::record::SynthesizedRecord;
use crate::telemetry::{self, EmissionCounters};
use opentelemetry::metrics::Meter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Lifecycle of the loop. `Running` is initial; the only transition is to
/// `Stopped`, once the shutdown token is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Iterations are being produced.
    #[default]
    Running,
    /// The loop has exited and will not start another iteration.
    Stopped,
}

/// Inclusive bounds for the pause drawn after each iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    min: Duration,
    max: Duration,
}

impl Interval {
    /// Creates an interval, rejecting `min > max`.
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(GeneratorError::InvalidInterval { min, max });
        }
        Ok(Self { min, max })
    }

    /// An interval that always yields `pause`.
    pub fn fixed(pause: Duration) -> Self {
        Self {
            min: pause,
            max: pause,
        }
    }

    /// Shortest pause.
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Longest pause.
    pub fn max(&self) -> Duration {
        self.max
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        rng.random_range(self.min..=self.max)
    }
}

impl Default for Interval {
    fn default() -> Self {
        let defaults = IntervalConfig::default();
        Self {
            min: defaults.min,
            max: defaults.max,
        }
    }
}

impl TryFrom<IntervalConfig> for Interval {
    type Error = GeneratorError;

    fn try_from(config: IntervalConfig) -> Result<Self> {
        Self::new(config.min, config.max)
    }
}

/// Totals reported once the loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerationSummary {
    /// Completed iterations, equal to the number of records emitted.
    pub iterations: u64,
    /// Iterations that produced an ERROR record.
    pub errors: u64,
}

/// Produces one record per iteration until told to stop.
pub struct Generator<R = StdRng> {
    catalog: Catalog,
    counters: EmissionCounters,
    interval: Interval,
    rng: R,
    state: LoopState,
    summary: GenerationSummary,
}

impl Generator<StdRng> {
    /// Creates a generator whose random source is seeded from `seed`, or
    /// from the operating system when `seed` is `None`.
    pub fn new(catalog: Catalog, meter: &Meter, interval: Interval, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(catalog, meter, interval, rng)
    }
}

impl<R: Rng> Generator<R> {
    /// Creates a generator drawing from the given random source.
    pub fn with_rng(catalog: Catalog, meter: &Meter, interval: Interval, rng: R) -> Self {
        Self {
            catalog,
            counters: EmissionCounters::new(meter),
            interval,
            rng,
            state: LoopState::Running,
            summary: GenerationSummary::default(),
        }
    }

    /// Runs one complete iteration: opens the span, selects and synthesises a
    /// record, emits it, bumps the counters and tags the span before closing
    /// it.
    pub fn step(&mut self) -> SynthesizedRecord {
        let span = telemetry::iteration_span();
        let _entered = span.enter();

        let template = *self.catalog.choose(&mut self.rng);
        let record = SynthesizedRecord::synthesize(&template, &mut self.rng);

        self.summary.iterations += 1;
        if record.severity() == Severity::Error {
            self.summary.errors += 1;
        }

        telemetry::emit_record(&record);
        self.counters.record(record.severity());
        telemetry::tag_span(&span, record.severity(), self.summary.iterations);

        record
    }

    /// Draws the pause that follows an iteration.
    pub fn next_pause(&mut self) -> Duration {
        self.interval.sample(&mut self.rng)
    }

    /// Loops until `shutdown` is cancelled and returns the totals.
    ///
    /// Cancellation interrupts the pause between iterations; an iteration
    /// already under way always completes.
    pub async fn run(&mut self, shutdown: CancellationToken) -> GenerationSummary {
        while self.state == LoopState::Running {
            if shutdown.is_cancelled() {
                break;
            }

            self.step();
            let pause = self.next_pause();
            tracing::debug!(?pause, iteration = self.summary.iterations, "Pausing");

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        self.state = LoopState::Stopped;
        tracing::info!("Log generator service stopping...");
        self.summary
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of completed iterations.
    pub fn iterations(&self) -> u64 {
        self.summary.iterations
    }

    /// Totals so far.
    pub fn summary(&self) -> GenerationSummary {
        self.summary
    }

    /// The catalog templates are drawn from.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl<R> std::fmt::Debug for Generator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("templates", &self.catalog.len())
            .field("interval", &self.interval)
            .field("state", &self.state)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meter() -> Meter {
        opentelemetry::global::meter("log-generator-test")
    }

    fn pinned(index: usize) -> Catalog {
        Catalog::new(vec![*Catalog::standard().get(index).unwrap()]).unwrap()
    }

    #[test]
    fn test_interval_rejects_inverted_bounds() {
        let err = Interval::new(Duration::from_secs(3), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, GeneratorError::InvalidInterval { .. }));
    }

    #[test]
    fn test_interval_default() {
        let interval = Interval::default();
        assert_eq!(interval.min(), Duration::from_secs(2));
        assert_eq!(interval.max(), Duration::from_secs(5));
    }

    #[test]
    fn test_next_pause_within_bounds() {
        let interval = Interval::default();
        let mut generator = Generator::new(Catalog::standard(), &meter(), interval, Some(1));

        for _ in 0..500 {
            let pause = generator.next_pause();
            assert!(pause >= interval.min() && pause <= interval.max());
        }
    }

    #[test]
    fn test_fixed_interval_is_exact() {
        let mut generator = Generator::new(
            Catalog::standard(),
            &meter(),
            Interval::fixed(Duration::from_millis(750)),
            Some(1),
        );
        assert_eq!(generator.next_pause(), Duration::from_millis(750));
    }

    #[test]
    fn test_step_counts_iterations_and_errors() {
        let mut generator =
            Generator::new(Catalog::standard(), &meter(), Interval::default(), Some(99));

        let mut errors = 0;
        for _ in 0..40 {
            let record = generator.step();
            if record.severity() == Severity::Error {
                errors += 1;
            }
        }

        assert_eq!(
            generator.summary(),
            GenerationSummary {
                iterations: 40,
                errors
            }
        );
        assert_eq!(generator.state(), LoopState::Running);
    }

    #[test]
    fn test_step_uses_catalog_templates() {
        let mut generator =
            Generator::new(Catalog::standard(), &meter(), Interval::default(), Some(5));

        for _ in 0..100 {
            let record = generator.step();
            assert!(
                generator
                    .catalog()
                    .iter()
                    .any(|t| t.message() == record.message() && t.severity() == record.severity())
            );
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Generator::new(Catalog::standard(), &meter(), Interval::default(), Some(17));
        let mut b = Generator::new(Catalog::standard(), &meter(), Interval::default(), Some(17));

        for _ in 0..20 {
            let (left, right) = (a.step(), b.step());
            assert_eq!(left.message(), right.message());
            assert_eq!(left.fields(), right.fields());
            assert_eq!(a.next_pause(), b.next_pause());
        }
    }

    #[test]
    fn test_pinned_error_template() {
        let mut generator = Generator::new(pinned(4), &meter(), Interval::default(), Some(3));

        for _ in 0..3 {
            assert_eq!(generator.step().severity(), Severity::Error);
        }

        assert_eq!(generator.summary().errors, 3);
    }

    #[tokio::test]
    async fn test_run_with_cancelled_token_does_nothing() {
        let mut generator =
            Generator::new(Catalog::standard(), &meter(), Interval::default(), Some(1));
        let token = CancellationToken::new();
        token.cancel();

        let summary = generator.run(token).await;

        assert_eq!(summary, GenerationSummary::default());
        assert_eq!(generator.state(), LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_during_pause() {
        let mut generator = Generator::new(
            Catalog::standard(),
            &meter(),
            Interval::fixed(Duration::from_secs(3)),
            Some(1),
        );
        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(6500)).await;
                token.cancel();
            }
        };

        let (summary, ()) = tokio::join!(generator.run(token.clone()), canceller);

        assert_eq!(summary.iterations, 3);
        assert_eq!(generator.state(), LoopState::Stopped);
        assert_eq!(generator.iterations(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_generator_does_not_restart() {
        let mut generator = Generator::new(
            Catalog::standard(),
            &meter(),
            Interval::fixed(Duration::from_secs(1)),
            Some(1),
        );
        let token = CancellationToken::new();
        token.cancel();
        generator.run(token).await;

        let summary = generator.run(CancellationToken::new()).await;

        assert_eq!(summary.iterations, 0);
        assert_eq!(generator.state(), LoopState::Stopped);
    }
}
