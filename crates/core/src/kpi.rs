use crate::scheduler::Millis;
use std::collections::BTreeMap;

pub const BASELINE_YEAR: i32 = 2025;
pub const FINAL_YEAR: i32 = 2029;
pub const SALES_EASE_MS: Millis = 900;
pub const GROSS_MARGIN_GATE: &str = "Hard gate: 39.5%";

/// Smoothstep easing between two values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    pub from: f64,
    pub to: f64,
    pub start: Millis,
    pub duration: Millis,
}

impl Tween {
    pub fn new(from: f64, to: f64, start: Millis, duration: Millis) -> Self {
        Self {
            from,
            to,
            start,
            duration,
        }
    }

    /// Already at rest on `value`.
    pub fn fixed(value: f64) -> Self {
        Self::new(value, value, 0, 0)
    }

    pub fn value_at(&self, now: Millis) -> f64 {
        let p = self.progress(now);
        if p >= 1.0 {
            return self.to;
        }
        let s = p * p * (3.0 - 2.0 * p);
        self.from + (self.to - self.from) * s
    }

    pub fn is_done(&self, now: Millis) -> bool {
        self.progress(now) >= 1.0
    }

    fn progress(&self, now: Millis) -> f64 {
        if self.duration == 0 {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start) as f64;
        (elapsed / self.duration as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KpiTimelinePoint {
    pub year: i32,
    pub sales_meur: f64,
    pub ebit_range: String,
    pub gross_margin_pct: f64,
}

impl KpiTimelinePoint {
    pub fn new(year: i32, sales_meur: f64, ebit_range: &str, gross_margin_pct: f64) -> Self {
        Self {
            year,
            sales_meur,
            ebit_range: ebit_range.to_string(),
            gross_margin_pct,
        }
    }
}

/// Yearly targets shown on the HUD.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiTimeline {
    points: BTreeMap<i32, KpiTimelinePoint>,
    baseline_year: i32,
    gross_margin_gate: String,
}

impl Default for KpiTimeline {
    fn default() -> Self {
        Self::new(
            BASELINE_YEAR,
            GROSS_MARGIN_GATE,
            vec![
                KpiTimelinePoint::new(2025, 63.1, "16.0% (2025 base)", 41.3),
                KpiTimelinePoint::new(2026, 71.0, "16–18%", 41.3),
                KpiTimelinePoint::new(2027, 81.0, "18–20%", 41.3),
                KpiTimelinePoint::new(2028, 91.0, "19–21%", 41.3),
                KpiTimelinePoint::new(2029, 100.0, "20–22%", 41.3),
            ],
        )
    }
}

impl KpiTimeline {
    pub fn new(baseline_year: i32, gross_margin_gate: &str, points: Vec<KpiTimelinePoint>) -> Self {
        Self {
            points: points.into_iter().map(|p| (p.year, p)).collect(),
            baseline_year,
            gross_margin_gate: gross_margin_gate.to_string(),
        }
    }

    pub fn baseline_year(&self) -> i32 {
        self.baseline_year
    }

    pub fn gross_margin_gate(&self) -> &str {
        &self.gross_margin_gate
    }

    /// The point for `year`, or the baseline when the year is not on the
    /// timeline.
    pub fn point(&self, year: i32) -> Option<&KpiTimelinePoint> {
        self.points
            .get(&year)
            .or_else(|| self.points.get(&self.baseline_year))
    }

    pub fn baseline(&self) -> Option<&KpiTimelinePoint> {
        self.points.get(&self.baseline_year)
    }
}

/// Year a slide stands for, if it drives the KPI HUD.
pub fn slide_year(key: &str) -> Option<i32> {
    match key {
        "baseline_2025" => Some(2025),
        "year_2026" => Some(2026),
        "year_2027" => Some(2027),
        "year_2028" => Some(2028),
        "year_2029" => Some(2029),
        _ => None,
    }
}

/// Millions of euro, one decimal only when needed: `71M€`, `63.1M€`.
pub fn fmt_meur(value: f64) -> String {
    let v = (value * 10.0).round() / 10.0;
    if v.fract() == 0.0 {
        format!("{v:.0}M€")
    } else {
        format!("{v:.1}M€")
    }
}

/// Fraction of the background clip to seek to for `year`.
pub fn background_cue(year: i32) -> f64 {
    let span = (FINAL_YEAR - BASELINE_YEAR) as f64;
    let pct = (year - BASELINE_YEAR) as f64 / span;
    (0.05 + 0.90 * pct).clamp(0.0, 0.95)
}

/// Texts of the four KPI tiles that follow the year.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiDisplay {
    pub sales: String,
    pub sales_sub: String,
    pub ebit: String,
    pub ebit_sub: String,
    pub gross_margin: String,
    pub gross_margin_sub: String,
}

#[derive(Debug, Clone)]
pub struct KpiAnimator {
    timeline: KpiTimeline,
    year: i32,
    sales: Tween,
}

impl Default for KpiAnimator {
    fn default() -> Self {
        Self::new(KpiTimeline::default())
    }
}

impl KpiAnimator {
    pub fn new(timeline: KpiTimeline) -> Self {
        let year = timeline.baseline_year();
        let sales = timeline.baseline().map(|p| p.sales_meur).unwrap_or_default();
        Self {
            timeline,
            year,
            sales: Tween::fixed(sales),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn timeline(&self) -> &KpiTimeline {
        &self.timeline
    }

    pub fn sales_tween(&self) -> &Tween {
        &self.sales
    }

    /// Switches the HUD to `year`. Sales eases from whatever is on screen at
    /// `now` when `animate` is set and jumps otherwise; the other tiles change
    /// at once.
    pub fn update_for_year(&mut self, year: i32, now: Millis, animate: bool) {
        let target = self
            .timeline
            .point(year)
            .map(|p| p.sales_meur)
            .unwrap_or_default();
        let shown = self.sales.value_at(now);

        self.sales = if animate {
            Tween::new(shown, target, now, SALES_EASE_MS)
        } else {
            Tween::fixed(target)
        };
        tracing::debug!("KPI year {} -> {} (sales {:.1} -> {:.1})", self.year, year, shown, target);
        self.year = year;
    }

    pub fn display(&self, now: Millis) -> KpiDisplay {
        let point = self.timeline.point(self.year);
        let baseline_sales = self
            .timeline
            .baseline()
            .map(|p| p.sales_meur)
            .unwrap_or_default();

        KpiDisplay {
            sales: fmt_meur(self.sales.value_at(now)),
            sales_sub: format!(
                "{} track • baseline {}: {}",
                self.year,
                self.timeline.baseline_year(),
                fmt_meur(baseline_sales)
            ),
            ebit: point.map(|p| p.ebit_range.clone()).unwrap_or_default(),
            ebit_sub: "EBIT ambition by year".to_string(),
            gross_margin: point
                .map(|p| format!("{:.1}%", p.gross_margin_pct))
                .unwrap_or_default(),
            gross_margin_sub: self.timeline.gross_margin_gate().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tween_endpoints_and_midpoint() {
        let t = Tween::new(0.0, 10.0, 100, 900);
        assert_eq!(t.value_at(0), 0.0);
        assert_eq!(t.value_at(100), 0.0);
        assert!((t.value_at(550) - 5.0).abs() < 1e-9);
        assert_eq!(t.value_at(1_000), 10.0);
        assert_eq!(t.value_at(5_000), 10.0);
        assert!(t.is_done(1_000));
        assert!(!t.is_done(999));
    }

    #[test]
    fn sales_eases_from_2025_to_exactly_71() {
        // Arrange
        let mut kpi = KpiAnimator::default();

        // Act
        kpi.update_for_year(2026, 1_000, true);

        // Assert
        let mut last = kpi.sales_tween().value_at(1_000);
        assert_eq!(last, 63.1);
        for now in 1_001..1_900 {
            let v = kpi.sales_tween().value_at(now);
            assert!(v > last, "not increasing at {now}");
            assert!(v < 71.0);
            last = v;
        }
        assert_eq!(kpi.sales_tween().value_at(1_900), 71.0);
        assert_eq!(kpi.display(1_900).sales, "71M€");
    }

    #[test]
    fn live_off_jumps_immediately() {
        let mut kpi = KpiAnimator::default();
        kpi.update_for_year(2028, 0, false);
        assert_eq!(kpi.display(0).sales, "91M€");
        assert_eq!(kpi.display(0).ebit, "19–21%");
    }

    #[test]
    fn retarget_mid_ease_starts_from_shown_value() {
        let mut kpi = KpiAnimator::default();
        kpi.update_for_year(2029, 0, true);
        let shown = kpi.sales_tween().value_at(450);

        kpi.update_for_year(2025, 450, true);

        assert_eq!(kpi.sales_tween().from, shown);
        assert_eq!(kpi.sales_tween().value_at(450), shown);
        assert_eq!(kpi.sales_tween().value_at(1_350), 63.1);
    }

    #[test]
    fn unknown_year_falls_back_to_baseline() {
        let mut kpi = KpiAnimator::default();
        kpi.update_for_year(2031, 0, false);
        let d = kpi.display(0);
        assert_eq!(d.sales, "63.1M€");
        assert_eq!(d.ebit, "16.0% (2025 base)");
        assert_eq!(d.sales_sub, "2031 track • baseline 2025: 63.1M€");
    }

    #[test]
    fn display_texts() {
        let mut kpi = KpiAnimator::default();
        kpi.update_for_year(2027, 0, false);
        let d = kpi.display(0);
        assert_eq!(d.sales, "81M€");
        assert_eq!(d.sales_sub, "2027 track • baseline 2025: 63.1M€");
        assert_eq!(d.ebit, "18–20%");
        assert_eq!(d.ebit_sub, "EBIT ambition by year");
        assert_eq!(d.gross_margin, "41.3%");
        assert_eq!(d.gross_margin_sub, "Hard gate: 39.5%");
    }

    #[test]
    fn meur_formatting() {
        assert_eq!(fmt_meur(71.0), "71M€");
        assert_eq!(fmt_meur(63.1), "63.1M€");
        assert_eq!(fmt_meur(99.96), "100M€");
        assert_eq!(fmt_meur(66.04), "66M€");
    }

    #[test]
    fn slide_keys_map_to_years() {
        assert_eq!(slide_year("baseline_2025"), Some(2025));
        assert_eq!(slide_year("year_2029"), Some(2029));
        assert_eq!(slide_year("gates_2027"), None);
    }

    #[test]
    fn background_cue_spans_clip() {
        assert!((background_cue(2025) - 0.05).abs() < 1e-9);
        assert!((background_cue(2027) - 0.50).abs() < 1e-9);
        assert!((background_cue(2029) - 0.95).abs() < 1e-9);
        assert_eq!(background_cue(2020), 0.0);
    }
}
