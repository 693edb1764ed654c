use crate::scheduler::{Millis, Scheduler, TimerId};
use rand::Rng;
use std::ops::RangeInclusive;

pub const PULSE_PERIOD_MS: Millis = 2_200;

pub const OSA_BAND: RangeInclusive<f64> = 86.0..=96.0;
pub const DISTRIBUTION_BAND: RangeInclusive<f64> = 78.0..=92.0;
pub const PROMO_BAND: RangeInclusive<f64> = 5.5..=9.5;
pub const RGM_BAND: RangeInclusive<f64> = 0.2..=3.5;

const MISSION_UPDATES: [&str; 5] = [
    "MISSION UPDATE • Field Force hybrid rollout: priority stores + digital execution",
    "MISSION UPDATE • NPD: Health & Premium pipeline in-flight • clear kill-gates",
    "MISSION UPDATE • Foodservice focus: higher probability segments only",
    "MISSION UPDATE • 90% channel coverage model: strongest distributor fit",
    "MISSION UPDATE • Portfolio simplification: fewer SKUs, faster rotation",
];

/// Simulated weekly execution metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveMetricSample {
    pub on_shelf_availability: f64,
    pub distribution: f64,
    pub promo_share: f64,
    pub rgm_delta: f64,
}

impl Default for LiveMetricSample {
    fn default() -> Self {
        Self {
            on_shelf_availability: 90.0,
            distribution: 84.0,
            promo_share: 7.2,
            rgm_delta: 1.6,
        }
    }
}

impl LiveMetricSample {
    pub fn in_bands(&self) -> bool {
        OSA_BAND.contains(&self.on_shelf_availability)
            && DISTRIBUTION_BAND.contains(&self.distribution)
            && PROMO_BAND.contains(&self.promo_share)
            && RGM_BAND.contains(&self.rgm_delta)
    }

    /// Headline tile, e.g. `OSA 90%`.
    pub fn headline(&self) -> String {
        format!("OSA {}%", self.on_shelf_availability.round())
    }

    /// Sub line, e.g. `Dist 84% • Promo 7.2% • RGM +1.6pp`.
    pub fn detail(&self) -> String {
        format!(
            "Dist {}% • Promo {:.1}% • RGM +{:.1}pp",
            self.distribution.round(),
            self.promo_share,
            self.rgm_delta
        )
    }

    pub fn ticker(&self) -> String {
        format!(
            "WEEKLY PULSE • OSA {}% • Dist {}% • Promo {:.1}% • RGM +{:.1}pp",
            self.on_shelf_availability.round(),
            self.distribution.round(),
            self.promo_share,
            self.rgm_delta
        )
    }
}

fn step(value: f64, delta: f64, band: &RangeInclusive<f64>) -> f64 {
    (value + delta).clamp(*band.start(), *band.end())
}

/// Random walk of the live metrics plus the ticker line.
#[derive(Debug, Clone, Default)]
pub struct PulseAnimator {
    sample: LiveMetricSample,
    ticker: Option<String>,
    timer: Option<TimerId>,
}

impl PulseAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&self) -> &LiveMetricSample {
        &self.sample
    }

    /// Last ticker message, `None` until the first tick.
    pub fn ticker(&self) -> Option<&str> {
        self.ticker.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Registers the pulse interval. Does nothing when already running.
    pub fn start<E: Clone>(&mut self, scheduler: &mut Scheduler<E>, event: E) {
        if self.timer.is_some() {
            return;
        }
        self.timer = Some(scheduler.set_interval(PULSE_PERIOD_MS, event));
        tracing::debug!("Pulse started");
    }

    /// Cancels the interval. Metrics keep their current values.
    pub fn stop<E: Clone>(&mut self, scheduler: &mut Scheduler<E>) {
        if let Some(id) = self.timer.take() {
            scheduler.cancel(id);
            tracing::debug!("Pulse stopped");
        }
    }

    pub fn tick(&mut self, rng: &mut impl Rng) {
        let s = &mut self.sample;
        s.on_shelf_availability = step(
            s.on_shelf_availability,
            (rng.r#gen::<f64>() - 0.45) * 1.2,
            &OSA_BAND,
        );
        s.distribution = step(s.distribution, (rng.r#gen::<f64>() - 0.5) * 1.4, &DISTRIBUTION_BAND);
        s.promo_share = step(s.promo_share, (rng.r#gen::<f64>() - 0.5) * 0.35, &PROMO_BAND);
        s.rgm_delta = step(s.rgm_delta, (rng.r#gen::<f64>() - 0.5) * 0.22, &RGM_BAND);

        let pick = rng.gen_range(0..=MISSION_UPDATES.len());
        self.ticker = Some(match pick {
            0 => self.sample.ticker(),
            n => MISSION_UPDATES[n - 1].to_string(),
        });
    }
}
