use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::bank::ByteOrderKind;
use super::error::ConfigError;
use super::event_id::{
    BeamCenter, MultiplicityMode, TrackPattern, TriggerChannel, WindowConfig, WindowSelect,
};
use super::payload::TimeBasis;
use super::slot_map::SlotMap;
use super::wire::HitLayout;

/// Structure representing the application configuration: decode settings and
/// the event identification surface.
/// Configs are serializable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub window_width_ns: i64,
    pub step_ns: i64,
    pub min_hits_in_window: usize,
    pub multiplicity_mode: MultiplicityMode,
    pub window_select: WindowSelect,
    pub time_basis: TimeBasis,
    pub byte_order: ByteOrderKind,
    pub wire_layout: HitLayout,
    /// 0 means no trigger requirement, matching the front end convention
    pub trigger_slot: u32,
    pub trigger_channel: u32,
    /// 0 means no beam-center requirement
    pub beam_center_slot: u32,
    pub beam_center_channel: u32,
    pub charge_min: u32,
    pub charge_max: u32,
    pub pattern_residual: usize,
    /// Named track patterns, each a list of slot*channel products
    pub track_patterns: BTreeMap<String, Vec<u32>>,
    /// Channel names (crate-slot-channel) summed into the pseudo-hit
    pub center_blocks: Vec<String>,
    /// Payload-id to slot table; absent uses the built-in crate wiring,
    /// an empty list is the identity map
    pub slot_map: Option<Vec<u32>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_width_ns: 40,
            step_ns: 1,
            min_hits_in_window: 2,
            multiplicity_mode: MultiplicityMode::AtLeast,
            window_select: WindowSelect::Last,
            time_basis: TimeBasis::Absolute,
            byte_order: ByteOrderKind::Big,
            wire_layout: HitLayout::RowMajor,
            trigger_slot: 0,
            trigger_channel: 0,
            beam_center_slot: 0,
            beam_center_channel: 0,
            charge_min: 0,
            charge_max: 8000,
            pattern_residual: 0,
            track_patterns: BTreeMap::new(),
            center_blocks: Vec::new(),
            slot_map: None,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// The identifier configuration derived from the flat key set
    pub fn window_config(&self) -> WindowConfig {
        let trigger = (self.trigger_slot > 0 && self.trigger_channel > 0).then(|| TriggerChannel {
            slot: self.trigger_slot,
            channel: self.trigger_channel,
        });
        let beam_center =
            (self.beam_center_slot > 0 && self.beam_center_channel > 0).then(|| BeamCenter {
                slot: self.beam_center_slot,
                channel: self.beam_center_channel,
                charge_min: self.charge_min,
                charge_max: self.charge_max,
            });
        WindowConfig {
            window_width_ns: self.window_width_ns,
            step_ns: self.step_ns,
            min_hits_in_window: self.min_hits_in_window,
            multiplicity_mode: self.multiplicity_mode,
            window_select: self.window_select,
            track_patterns: self
                .track_patterns
                .iter()
                .map(|(name, products)| TrackPattern::new(name, products))
                .collect(),
            pattern_residual: self.pattern_residual,
            trigger,
            beam_center,
            center_blocks: self.center_blocks.clone(),
        }
    }

    pub fn slot_map(&self) -> SlotMap {
        match &self.slot_map {
            Some(table) if table.is_empty() => SlotMap::identity(),
            Some(table) => SlotMap::new(table.clone()),
            None => SlotMap::default(),
        }
    }
}
