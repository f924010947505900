//! Sliding time-window event identification.
//!
//! A window of configurable width slides over the time span of one
//! controller bank's hits. A window position becomes an event candidate when
//! it holds the configured hit multiplicity, carries no duplicate channel,
//! and (when patterns are configured) matches a geometric track pattern.
//! Trigger and beam-center qualifiers gate the final result for the bank.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::frame::RocTimeFrameBank;
use super::hit::FADCHit;

/// How the window hit count is compared against `min_hits_in_window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultiplicityMode {
    /// The window must hold exactly the configured number of hits
    Exact,
    /// The window must hold at least the configured number of hits
    #[default]
    AtLeast,
}

/// Which accepted window wins when several qualify in one bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowSelect {
    /// Stop at the first accepted window
    First,
    /// Keep scanning; the last accepted window is the result
    #[default]
    Last,
}

/// A named geometric combination of `slot * channel` products expected for a
/// physical track. Patterns are immutable; matching never mutates them.
#[derive(Debug, Clone)]
pub struct TrackPattern {
    pub name: String,
    pub products: FxHashSet<u32>,
}

impl TrackPattern {
    pub fn new(name: &str, products: &[u32]) -> Self {
        TrackPattern {
            name: String::from(name),
            products: products.iter().copied().collect(),
        }
    }
}

/// The slot/channel carrying the external trigger signal
#[derive(Debug, Clone, Copy)]
pub struct TriggerChannel {
    pub slot: u32,
    pub channel: u32,
}

/// The beam-center block and its accepted charge range
#[derive(Debug, Clone, Copy)]
pub struct BeamCenter {
    pub slot: u32,
    pub channel: u32,
    pub charge_min: u32,
    pub charge_max: u32,
}

/// Full configuration of the identifier. See `Config` for the YAML surface.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub window_width_ns: i64,
    pub step_ns: i64,
    pub min_hits_in_window: usize,
    pub multiplicity_mode: MultiplicityMode,
    pub window_select: WindowSelect,
    pub track_patterns: Vec<TrackPattern>,
    /// Pattern elements allowed to go unmatched in an accepted window
    pub pattern_residual: usize,
    pub trigger: Option<TriggerChannel>,
    pub beam_center: Option<BeamCenter>,
    /// Channel names summed into the derived pseudo-hit on acceptance
    pub center_blocks: Vec<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            window_width_ns: 40,
            step_ns: 1,
            min_hits_in_window: 2,
            multiplicity_mode: MultiplicityMode::AtLeast,
            window_select: WindowSelect::Last,
            track_patterns: Vec::new(),
            pattern_residual: 0,
            trigger: None,
            beam_center: None,
            center_blocks: Vec::new(),
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_width_ns <= 0 {
            return Err(ConfigError::BadWindowWidth(self.window_width_ns));
        }
        if self.step_ns <= 0 {
            return Err(ConfigError::BadWindowStep(self.step_ns));
        }
        if let Some(bc) = &self.beam_center {
            if bc.charge_min > bc.charge_max {
                return Err(ConfigError::BadChargeRange(bc.charge_min, bc.charge_max));
            }
        }
        Ok(())
    }
}

/// Diagnostic counters, shared across workers with atomic increments.
#[derive(Debug, Default)]
pub struct IdStats {
    frames_seen: AtomicU64,
    empty_frames: AtomicU64,
    identified_events: AtomicU64,
    logical_triggers: AtomicU64,
}

impl IdStats {
    pub fn new() -> Self {
        IdStats::default()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen.load(Ordering::Relaxed)
    }

    pub fn empty_frames(&self) -> u64 {
        self.empty_frames.load(Ordering::Relaxed)
    }

    pub fn identified_events(&self) -> u64 {
        self.identified_events.load(Ordering::Relaxed)
    }

    pub fn logical_triggers(&self) -> u64 {
        self.logical_triggers.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> String {
        let frames = self.frames_seen();
        let empty = self.empty_frames();
        let identified = self.identified_events();
        let populated = frames.saturating_sub(empty).max(1);
        format!(
            "Frames = {frames}; Empty = {empty}; Identified = {identified} ({:.1}% of populated); Logical triggers = {}",
            identified as f64 / populated as f64 * 100.0,
            self.logical_triggers()
        )
    }
}

/// Runs the sliding-window algorithm over one controller bank at a time.
///
/// The identifier itself is immutable; the only shared mutable state is the
/// atomic counter block, so one instance may be shared across worker threads
/// or cloned per worker.
#[derive(Debug, Clone)]
pub struct SlidingWindowEventIdentifier {
    config: WindowConfig,
    stats: Arc<IdStats>,
}

impl SlidingWindowEventIdentifier {
    pub fn new(config: WindowConfig, stats: Arc<IdStats>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(SlidingWindowEventIdentifier { config, stats })
    }

    pub fn stats(&self) -> Arc<IdStats> {
        self.stats.clone()
    }

    /// Identify an event within one controller bank.
    ///
    /// Returns the accepted window's hits, or an empty list when no window
    /// qualifies. An empty result is the normal negative outcome, never an
    /// error.
    pub fn identify(&self, bank: &RocTimeFrameBank) -> Vec<FADCHit> {
        self.stats.frames_seen.fetch_add(1, Ordering::Relaxed);
        if bank.hits.is_empty() {
            self.stats.empty_frames.fetch_add(1, Ordering::Relaxed);
            return Vec::new();
        }

        let (found_trigger, found_center) = self.scan_qualifiers(&bank.hits);

        // min/max are safe: the bank is non-empty here
        let t_start = bank.hits.iter().map(|h| h.time).min().unwrap_or(0);
        let t_end = bank.hits.iter().map(|h| h.time).max().unwrap_or(0);
        if t_start >= t_end {
            // degenerate spread, coincidence is meaningless
            return Vec::new();
        }

        let accepted = self.scan_windows(&bank.hits, t_start, t_end);
        let Some(mut event) = accepted else {
            return Vec::new();
        };

        if !self.qualifiers_satisfied(found_trigger, found_center) {
            return Vec::new();
        }

        self.stats.identified_events.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "Identified event in frame {} (roc {}): {} hits",
            bank.frame_number,
            bank.roc_id,
            event.len()
        );

        if !self.config.center_blocks.is_empty() {
            event.push(self.sum_pseudo_hit(&event));
        }
        event
    }

    /// Slide the window over [t_start, t_end]. Each position is a closed
    /// interval [ts, ts + width]. After an accepted window the next start
    /// jumps past the accepted end so overlapping duplicates are not
    /// re-reported. The window whose trailing edge first passes t_end is
    /// still examined before the scan stops.
    fn scan_windows(&self, hits: &[FADCHit], t_start: i64, t_end: i64) -> Option<Vec<FADCHit>> {
        let width = self.config.window_width_ns;
        let step = self.config.step_ns;
        let mut accepted: Option<Vec<FADCHit>> = None;
        let mut ts = t_start;
        loop {
            let te = ts + width;
            let window: Vec<&FADCHit> = hits
                .iter()
                .filter(|h| h.time >= ts && h.time <= te)
                .collect();

            if self.window_qualifies(&window) {
                accepted = Some(window.into_iter().cloned().collect());
                if self.config.window_select == WindowSelect::First {
                    break;
                }
                ts = te + step;
            } else {
                ts += step;
            }
            if te > t_end {
                break;
            }
        }
        accepted
    }

    fn window_qualifies(&self, window: &[&FADCHit]) -> bool {
        self.multiplicity_ok(window.len())
            && !Self::has_duplicate_channel(window)
            && self.pattern_ok(window)
    }

    fn multiplicity_ok(&self, count: usize) -> bool {
        match self.config.multiplicity_mode {
            MultiplicityMode::Exact => count == self.config.min_hits_in_window,
            MultiplicityMode::AtLeast => count >= self.config.min_hits_in_window,
        }
    }

    /// Two hits with the same (crate, slot, channel) identity invalidate the
    /// whole window, whatever their charge and time.
    fn has_duplicate_channel(window: &[&FADCHit]) -> bool {
        let mut seen: FxHashSet<&FADCHit> = FxHashSet::default();
        for hit in window {
            if !seen.insert(*hit) {
                return true;
            }
        }
        false
    }

    /// Pure pattern check against immutable templates: at least one pattern
    /// must intersect the window's slot*channel products and leave no more
    /// than `pattern_residual` elements unmatched.
    fn pattern_ok(&self, window: &[&FADCHit]) -> bool {
        if self.config.track_patterns.is_empty() {
            return true;
        }
        let products: FxHashSet<u32> = window.iter().map(|h| h.slot * h.channel).collect();
        self.config.track_patterns.iter().any(|pattern| {
            let matched = pattern.products.intersection(&products).count();
            matched > 0 && pattern.products.len() - matched <= self.config.pattern_residual
        })
    }

    /// Scan the whole bank for trigger and beam-center hits. These qualify
    /// the bank, not a single window position.
    fn scan_qualifiers(&self, hits: &[FADCHit]) -> (bool, bool) {
        let mut found_trigger = false;
        let mut found_center = false;
        for hit in hits {
            if let Some(trigger) = &self.config.trigger {
                if hit.slot == trigger.slot && hit.channel == trigger.channel {
                    found_trigger = true;
                    self.stats.logical_triggers.fetch_add(1, Ordering::Relaxed);
                }
            }
            if let Some(bc) = &self.config.beam_center {
                if hit.slot == bc.slot
                    && hit.channel == bc.channel
                    && hit.charge >= bc.charge_min
                    && hit.charge <= bc.charge_max
                {
                    found_center = true;
                }
            }
        }
        (found_trigger, found_center)
    }

    fn qualifiers_satisfied(&self, found_trigger: bool, found_center: bool) -> bool {
        match (&self.config.trigger, &self.config.beam_center) {
            (Some(_), Some(_)) => found_trigger && found_center,
            (Some(_), None) => found_trigger,
            (None, Some(_)) => found_center,
            (None, None) => true,
        }
    }

    /// The derived pseudo-hit aggregating charge over the center blocks
    fn sum_pseudo_hit(&self, event: &[FADCHit]) -> FADCHit {
        let sum = event
            .iter()
            .filter(|h| self.config.center_blocks.iter().any(|n| *n == h.name()))
            .map(|h| h.charge)
            .sum();
        FADCHit::new(0, 0, 0, sum, 0)
    }
}

//Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    fn bank(hits: Vec<FADCHit>) -> RocTimeFrameBank {
        let mut b = RocTimeFrameBank::new(1, 0, 0);
        b.add_hits(hits);
        b
    }

    fn identifier(config: WindowConfig) -> SlidingWindowEventIdentifier {
        SlidingWindowEventIdentifier::new(config, Arc::new(IdStats::new())).unwrap()
    }

    fn wide_window(min_hits: usize, mode: MultiplicityMode) -> WindowConfig {
        WindowConfig {
            window_width_ns: 1000,
            min_hits_in_window: min_hits,
            multiplicity_mode: mode,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_bank_is_empty_result() {
        let id = identifier(WindowConfig::default());
        assert!(id.identify(&bank(vec![])).is_empty());
        assert_eq!(id.stats().empty_frames(), 1);
    }

    #[test]
    fn test_degenerate_spread_is_empty_result() {
        let id = identifier(WindowConfig::default());
        let hits = vec![
            FADCHit::new(1, 17, 0, 10, 100),
            FADCHit::new(1, 17, 1, 20, 100),
        ];
        assert!(id.identify(&bank(hits)).is_empty());
    }

    #[test]
    fn test_coincidence_accepted() {
        let id = identifier(wide_window(2, MultiplicityMode::AtLeast));
        let hits = vec![
            FADCHit::new(1, 17, 0, 10, 100),
            FADCHit::new(1, 19, 1, 20, 130),
        ];
        let event = id.identify(&bank(hits));
        assert_eq!(event.len(), 2);
        assert_eq!(id.stats().identified_events(), 1);
    }

    #[test]
    fn test_duplicate_channel_rejects_window() {
        let id = identifier(wide_window(2, MultiplicityMode::AtLeast));
        // identical identity, different charge and time
        let hits = vec![
            FADCHit::new(1, 17, 0, 10, 100),
            FADCHit::new(1, 17, 0, 999, 130),
        ];
        assert!(id.identify(&bank(hits)).is_empty());
    }

    #[test]
    fn test_exact_multiplicity_boundary() {
        // all hits share t=100 except the last at t=101, so the wide window
        // is examined at exactly one position and sees every hit
        let make_hits = |n: usize| -> Vec<FADCHit> {
            (0..n)
                .map(|i| {
                    let t = if i + 1 == n { 101 } else { 100 };
                    FADCHit::new(1, 17, i as u32, 10, t)
                })
                .collect()
        };
        let id = identifier(wide_window(3, MultiplicityMode::Exact));
        assert!(id.identify(&bank(make_hits(2))).is_empty());
        assert_eq!(id.identify(&bank(make_hits(3))).len(), 3);
        assert!(id.identify(&bank(make_hits(4))).is_empty());

        let id = identifier(wide_window(3, MultiplicityMode::AtLeast));
        assert_eq!(id.identify(&bank(make_hits(4))).len(), 4);
    }

    #[test]
    fn test_narrow_window_separates_hits() {
        // two hits 100 ns apart never share a 10 ns window
        let config = WindowConfig {
            window_width_ns: 10,
            min_hits_in_window: 2,
            ..Default::default()
        };
        let id = identifier(config);
        let hits = vec![
            FADCHit::new(1, 17, 0, 10, 0),
            FADCHit::new(1, 19, 1, 20, 100),
        ];
        assert!(id.identify(&bank(hits)).is_empty());
    }

    #[test]
    fn test_window_select_first_vs_last() {
        // two disjoint coincident pairs; a 20 ns window sees each pair alone
        let hits = vec![
            FADCHit::new(1, 17, 0, 10, 0),
            FADCHit::new(1, 17, 1, 20, 10),
            FADCHit::new(1, 19, 2, 30, 200),
            FADCHit::new(1, 19, 3, 40, 210),
        ];
        let base = WindowConfig {
            window_width_ns: 20,
            min_hits_in_window: 2,
            multiplicity_mode: MultiplicityMode::Exact,
            ..Default::default()
        };

        let first = identifier(WindowConfig {
            window_select: WindowSelect::First,
            ..base.clone()
        });
        let event = first.identify(&bank(hits.clone()));
        assert_eq!(event.len(), 2);
        assert_eq!(event[0].channel, 0);

        let last = identifier(WindowConfig {
            window_select: WindowSelect::Last,
            ..base
        });
        let event = last.identify(&bank(hits));
        assert_eq!(event.len(), 2);
        assert_eq!(event[0].channel, 2);
    }

    #[test]
    fn test_track_pattern_matching() {
        let pattern = TrackPattern::new("v1", &[17 * 1, 19 * 2]);
        let config = WindowConfig {
            track_patterns: vec![pattern],
            pattern_residual: 0,
            ..wide_window(2, MultiplicityMode::AtLeast)
        };
        let id = identifier(config.clone());

        // full pattern present
        let hits = vec![
            FADCHit::new(1, 17, 1, 10, 0),
            FADCHit::new(1, 19, 2, 20, 30),
        ];
        assert_eq!(id.identify(&bank(hits)).len(), 2);

        // only half the pattern, residual 0 rejects
        let hits = vec![
            FADCHit::new(1, 17, 1, 10, 0),
            FADCHit::new(1, 19, 3, 20, 30),
        ];
        assert!(id.identify(&bank(hits.clone())).is_empty());

        // residual 1 tolerates the unmatched element
        let relaxed = identifier(WindowConfig {
            pattern_residual: 1,
            ..config
        });
        assert_eq!(relaxed.identify(&bank(hits)).len(), 2);
    }

    #[test]
    fn test_patterns_are_not_mutated_across_calls() {
        let config = WindowConfig {
            track_patterns: vec![TrackPattern::new("v1", &[17 * 1, 19 * 2])],
            ..wide_window(2, MultiplicityMode::AtLeast)
        };
        let id = identifier(config);
        let hits = vec![
            FADCHit::new(1, 17, 1, 10, 0),
            FADCHit::new(1, 19, 2, 20, 30),
        ];
        // the destructive removeAll of the source would pass the first call
        // and corrupt the template for the second
        assert_eq!(id.identify(&bank(hits.clone())).len(), 2);
        assert_eq!(id.identify(&bank(hits)).len(), 2);
    }

    #[test]
    fn test_trigger_gate() {
        let config = WindowConfig {
            trigger: Some(TriggerChannel {
                slot: 13,
                channel: 5,
            }),
            ..wide_window(2, MultiplicityMode::AtLeast)
        };
        let id = identifier(config);

        let hits = vec![
            FADCHit::new(1, 17, 0, 10, 0),
            FADCHit::new(1, 19, 1, 20, 30),
        ];
        assert!(id.identify(&bank(hits.clone())).is_empty());
        assert_eq!(id.stats().logical_triggers(), 0);

        let mut with_trigger = hits;
        with_trigger.push(FADCHit::new(1, 13, 5, 1, 10));
        assert!(!id.identify(&bank(with_trigger)).is_empty());
        assert_eq!(id.stats().logical_triggers(), 1);
    }

    #[test]
    fn test_beam_center_gate_respects_charge_range() {
        let config = WindowConfig {
            beam_center: Some(BeamCenter {
                slot: 17,
                channel: 7,
                charge_min: 100,
                charge_max: 8000,
            }),
            ..wide_window(2, MultiplicityMode::AtLeast)
        };
        let id = identifier(config);

        // center hit below the charge floor does not qualify
        let hits = vec![
            FADCHit::new(1, 17, 7, 50, 0),
            FADCHit::new(1, 19, 1, 20, 30),
        ];
        assert!(id.identify(&bank(hits)).is_empty());

        let hits = vec![
            FADCHit::new(1, 17, 7, 500, 0),
            FADCHit::new(1, 19, 1, 20, 30),
        ];
        assert!(!id.identify(&bank(hits)).is_empty());
    }

    #[test]
    fn test_trigger_and_center_combined_with_and() {
        let config = WindowConfig {
            trigger: Some(TriggerChannel {
                slot: 13,
                channel: 5,
            }),
            beam_center: Some(BeamCenter {
                slot: 17,
                channel: 7,
                charge_min: 0,
                charge_max: 8000,
            }),
            ..wide_window(2, MultiplicityMode::AtLeast)
        };
        let id = identifier(config);

        // center present, trigger missing
        let hits = vec![
            FADCHit::new(1, 17, 7, 500, 0),
            FADCHit::new(1, 19, 1, 20, 30),
        ];
        assert!(id.identify(&bank(hits.clone())).is_empty());

        let mut both = hits;
        both.push(FADCHit::new(1, 13, 5, 1, 10));
        assert!(!id.identify(&bank(both)).is_empty());
    }

    #[test]
    fn test_sum_pseudo_hit_appended() {
        let config = WindowConfig {
            center_blocks: vec![String::from("1-17-7"), String::from("1-19-0")],
            ..wide_window(2, MultiplicityMode::AtLeast)
        };
        let id = identifier(config);
        let hits = vec![
            FADCHit::new(1, 17, 7, 100, 0),
            FADCHit::new(1, 19, 0, 250, 30),
            FADCHit::new(1, 19, 5, 999, 35),
        ];
        let event = id.identify(&bank(hits));
        assert_eq!(event.len(), 4);
        let sum = event.last().unwrap();
        assert_eq!((sum.crate_id, sum.slot, sum.channel), (0, 0, 0));
        assert_eq!(sum.charge, 350);
        assert_eq!(sum.time, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = WindowConfig {
            step_ns: 0,
            ..Default::default()
        };
        assert!(SlidingWindowEventIdentifier::new(config, Arc::new(IdStats::new())).is_err());
    }
}
