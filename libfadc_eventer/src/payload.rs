//! Bit-level decoding of FADC hit words and slot payloads.
//!
//! Each 32-bit hit word packs charge (bits 0-12), channel (bits 13-16) and a
//! coarse time code (bits 17-30) counting in 4 ns ticks. Hit words are
//! emitted big endian by the front end regardless of the surrounding
//! container's byte order.

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

use super::constants::*;
use super::error::FrameDecodeError;
use super::hit::FADCHit;

/// Whether hit times carry the frame base timestamp or stay frame-relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeBasis {
    /// `time = frame base + relative`, comparable across frames
    #[default]
    Absolute,
    /// `time = relative`, only meaningful within one frame
    FrameRelative,
}

/// The three fields unpacked from one 32-bit hit word. Any input word is
/// valid; fields are simply masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitWord {
    pub charge: u32,
    pub channel: u32,
    pub relative_time_ns: i64,
}

impl HitWord {
    pub fn unpack(word: u32) -> Self {
        HitWord {
            charge: word & CHARGE_MASK,
            channel: (word >> CHANNEL_SHIFT) & CHANNEL_MASK,
            relative_time_ns: (((word >> TIME_SHIFT) & TIME_MASK) as i64) * TIME_CODE_NS,
        }
    }
}

/// Decodes one hardware slot's raw byte payload into hit records.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadDecoder {
    time_basis: TimeBasis,
}

impl PayloadDecoder {
    pub fn new(time_basis: TimeBasis) -> Self {
        PayloadDecoder { time_basis }
    }

    /// Decode a raw payload into hits for the given crate and slot.
    ///
    /// An empty payload yields an empty list; a payload whose length is not
    /// a multiple of 4 is a structural error.
    pub fn decode(
        &self,
        frame_base_time_ns: i64,
        crate_id: u32,
        slot: u32,
        raw: &[u8],
    ) -> Result<Vec<FADCHit>, FrameDecodeError> {
        if raw.len() % 4 != 0 {
            return Err(FrameDecodeError::PayloadNotWordAligned {
                slot,
                len: raw.len(),
            });
        }
        let mut hits = Vec::with_capacity(raw.len() / 4);
        for chunk in raw.chunks_exact(4) {
            let word = HitWord::unpack(BigEndian::read_u32(chunk));
            let time = match self.time_basis {
                TimeBasis::Absolute => frame_base_time_ns + word.relative_time_ns,
                TimeBasis::FrameRelative => word.relative_time_ns,
            };
            hits.push(FADCHit::new(crate_id, slot, word.channel, word.charge, time));
        }
        Ok(hits)
    }
}
