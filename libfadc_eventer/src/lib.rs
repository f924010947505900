//! # fadc_eventer
//!
//! fadc_eventer reconstructs FADC hits from the raw, hierarchically-encoded
//! time frames produced by a streaming data-acquisition front end, identifies
//! physics events with a sliding time-window coincidence algorithm, and moves
//! the reconstructed structures between processes with a compact binary wire
//! codec.
//!
//! ## Pipeline
//!
//! Raw bytes are materialized into a tagged bank hierarchy ([`bank`]), walked
//! by the [`frame_decoder`] (one time-slice segment, then one bank per
//! read-out controller, then one payload bank per hardware slot), producing a
//! [`frame::RocTimeFrameBank`] per controller. The
//! [`event_id::SlidingWindowEventIdentifier`] selects the subset of each
//! bank's hits that constitutes a qualified event, and [`wire::WireCodec`]
//! serializes the result.
//!
//! The whole pipeline is synchronous and single threaded per invocation. A
//! processor holds no cross-frame state besides atomic diagnostic counters,
//! so callers wanting parallelism run one clone per worker thread.
//!
//! ## Configuration
//!
//! Configuration is a flat YAML file read with serde_yaml. The template
//! written by `fadc_eventer_cli new` looks like:
//!
//! ```yml
//! window_width_ns: 40
//! step_ns: 1
//! min_hits_in_window: 2
//! multiplicity_mode: at-least
//! window_select: last
//! time_basis: absolute
//! byte_order: big
//! wire_layout: row-major
//! trigger_slot: 0
//! trigger_channel: 0
//! beam_center_slot: 0
//! beam_center_channel: 0
//! charge_min: 0
//! charge_max: 8000
//! pattern_residual: 0
//! track_patterns: {}
//! center_blocks: []
//! slot_map: null
//! ```
//!
//! Trigger and beam-center slots/channels set to 0 disable those
//! requirements. `track_patterns` maps a pattern name to the list of
//! slot*channel products expected for that track. `slot_map: null` uses the
//! built-in crate wiring table; an empty list is the identity map.
pub mod bank;
pub mod config;
pub mod constants;
pub mod error;
pub mod event_id;
pub mod frame;
pub mod frame_decoder;
pub mod hit;
pub mod payload;
pub mod process;
pub mod slot_map;
pub mod wire;
