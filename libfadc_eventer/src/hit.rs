use std::hash::Hash;

/// One digitized FADC hit: the channel address plus the charge and time payload.
///
/// Equality and hashing cover only the channel address `(crate, slot, channel)`.
/// Charge and time are payload, not identity; duplicate detection in the event
/// identifier relies on this exact definition, so do not widen it.
#[derive(Debug, Clone)]
pub struct FADCHit {
    pub crate_id: u32,
    pub slot: u32,
    pub channel: u32,
    pub charge: u32,
    pub time: i64,
}

impl FADCHit {
    pub fn new(crate_id: u32, slot: u32, channel: u32, charge: u32, time: i64) -> Self {
        FADCHit {
            crate_id,
            slot,
            channel,
            charge,
            time,
        }
    }

    /// The channel name used in configuration lists, `crate-slot-channel`
    pub fn name(&self) -> String {
        format!("{}-{}-{}", self.crate_id, self.slot, self.channel)
    }

    /// Full-field comparison, for tests and codec verification. The `==`
    /// operator deliberately ignores charge and time.
    pub fn same_record(&self, other: &FADCHit) -> bool {
        self == other && self.charge == other.charge && self.time == other.time
    }
}

impl PartialEq for FADCHit {
    fn eq(&self, other: &Self) -> bool {
        self.crate_id == other.crate_id
            && self.slot == other.slot
            && self.channel == other.channel
    }
}

impl Eq for FADCHit {}

impl Hash for FADCHit {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.crate_id.hash(state);
        self.slot.hash(state);
        self.channel.hash(state);
    }
}

impl std::fmt::Display for FADCHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FADCHit {{ crate: {}, slot: {}, channel: {}, charge: {}, time: {} }}",
            self.crate_id, self.slot, self.channel, self.charge, self.time
        )
    }
}
