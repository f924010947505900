//! The per-buffer processing pipeline: materialize the bank hierarchy,
//! decode the time frame, and run event identification per controller bank.

use std::sync::Arc;

use super::bank::{Bank, ByteOrderKind};
use super::config::Config;
use super::error::ProcessorError;
use super::event_id::{IdStats, SlidingWindowEventIdentifier};
use super::frame::{RocTimeFrameBank, TimeFrame};
use super::frame_decoder::TimeFrameDecoder;

/// Result of processing one raw frame buffer.
#[derive(Debug, Default)]
pub struct FrameOutcome {
    /// The buffer held a control frame (prestart/go/end)
    pub control: bool,
    /// Controller banks reduced to their identified hits; banks with no
    /// identified event are dropped. None when nothing qualified.
    pub identified: Option<TimeFrame>,
}

/// Drives decode and identification for one raw frame buffer at a time.
///
/// Holds no cross-frame state beyond the shared atomic counters, so callers
/// wanting parallelism can clone one processor per worker thread.
#[derive(Debug, Clone)]
pub struct FrameProcessor {
    decoder: TimeFrameDecoder,
    identifier: SlidingWindowEventIdentifier,
    byte_order: ByteOrderKind,
}

impl FrameProcessor {
    pub fn new(config: &Config) -> Result<Self, ProcessorError> {
        let stats = Arc::new(IdStats::new());
        let identifier = SlidingWindowEventIdentifier::new(config.window_config(), stats)?;
        let decoder =
            TimeFrameDecoder::new(config.time_basis, config.slot_map(), config.byte_order);
        Ok(FrameProcessor {
            decoder,
            identifier,
            byte_order: config.byte_order,
        })
    }

    pub fn stats(&self) -> Arc<IdStats> {
        self.identifier.stats()
    }

    /// Process one raw frame buffer.
    ///
    /// Structural errors abort this frame only; the processor stays valid
    /// for the next buffer.
    pub fn process_buffer(&self, raw: &[u8]) -> Result<FrameOutcome, ProcessorError> {
        let (bank, used) = Bank::read_tree(raw, self.byte_order)?;
        if used != raw.len() {
            log::warn!(
                "Frame buffer has {} bytes beyond the top-level bank",
                raw.len() - used
            );
        }

        let Some(frame) = self.decoder.decode_frame(&bank)? else {
            return Ok(FrameOutcome {
                control: true,
                identified: None,
            });
        };
        Ok(self.identify_frame(&frame))
    }

    /// Run identification over an already-decoded frame
    pub fn identify_frame(&self, frame: &TimeFrame) -> FrameOutcome {
        let mut identified = TimeFrame::new();
        for bank in &frame.banks {
            let hits = self.identifier.identify(bank);
            if hits.is_empty() {
                continue;
            }
            let mut out = RocTimeFrameBank::new(bank.roc_id, bank.frame_number, bank.time_stamp);
            out.add_hits(hits);
            identified.push(out);
        }
        FrameOutcome {
            control: false,
            identified: (!identified.is_empty()).then_some(identified),
        }
    }
}
