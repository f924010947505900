use super::hit::FADCHit;

/// All hits reported by one read-out controller for one time frame.
///
/// Hit order follows the order the hardware slots were visited, not hit time.
/// Consumers that need time ordering must sort explicitly.
#[derive(Debug, Clone, Default)]
pub struct RocTimeFrameBank {
    pub roc_id: u32,
    pub frame_number: u32,
    pub time_stamp: u64,
    pub hits: Vec<FADCHit>,
}

impl RocTimeFrameBank {
    pub fn new(roc_id: u32, frame_number: u32, time_stamp: u64) -> Self {
        RocTimeFrameBank {
            roc_id,
            frame_number,
            time_stamp,
            hits: Vec::new(),
        }
    }

    pub fn add_hits(&mut self, hits: Vec<FADCHit>) {
        self.hits.extend(hits);
    }
}

/// One aggregated acquisition window spanning all controllers, one
/// RocTimeFrameBank per controller.
#[derive(Debug, Clone, Default)]
pub struct TimeFrame {
    pub banks: Vec<RocTimeFrameBank>,
}

impl TimeFrame {
    pub fn new() -> Self {
        TimeFrame { banks: Vec::new() }
    }

    pub fn push(&mut self, bank: RocTimeFrameBank) {
        self.banks.push(bank);
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    /// Total hit count over all controller banks
    pub fn hit_count(&self) -> usize {
        self.banks.iter().map(|b| b.hits.len()).sum()
    }
}

/// An ordered collection of time frames, the unit the wire codec transports.
#[derive(Debug, Clone, Default)]
pub struct TimeFrameSet {
    pub frames: Vec<TimeFrame>,
}

impl TimeFrameSet {
    pub fn new() -> Self {
        TimeFrameSet { frames: Vec::new() }
    }

    pub fn add_frame(&mut self, frame: TimeFrame) {
        self.frames.push(frame);
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
