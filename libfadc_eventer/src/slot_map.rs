// The payload id in a bank header is the position the aggregator visited,
// NOT the physical VXS slot number. The crate wiring interleaves slots around
// the switch, so payload id 1 is slot 10, payload id 2 is slot 13, and so on.
// This table changes only when the crate is recabled, so it is immutable
// configuration data handed to the decoder at construction rather than a
// process-wide mutable.

use super::constants::DEFAULT_SLOT_TABLE;

/// Maps payload ids from bank headers to physical hardware slot numbers.
///
/// An empty table is the identity map, for front ends that stamp the slot
/// number directly into the payload bank tag.
#[derive(Debug, Clone)]
pub struct SlotMap {
    table: Vec<u32>,
}

impl Default for SlotMap {
    fn default() -> Self {
        SlotMap {
            table: DEFAULT_SLOT_TABLE.to_vec(),
        }
    }
}

impl SlotMap {
    pub fn new(table: Vec<u32>) -> Self {
        SlotMap { table }
    }

    /// The identity map: payload id is already the slot number
    pub fn identity() -> Self {
        SlotMap { table: Vec::new() }
    }

    /// Look up the hardware slot for a payload id.
    ///
    /// Payload ids beyond the table pass through unchanged; an unmapped id
    /// from a well-formed producer means the table is stale, which is worth
    /// a log line but not worth dropping the payload.
    pub fn slot(&self, payload_id: u32) -> u32 {
        if self.table.is_empty() {
            return payload_id;
        }
        match self.table.get(payload_id as usize) {
            Some(slot) => *slot,
            None => {
                log::warn!("Payload id {payload_id} is outside the slot table; passing through");
                payload_id
            }
        }
    }
}
