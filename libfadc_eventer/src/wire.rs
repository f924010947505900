//! Binary wire codec for reconstructed time-frame structures.
//!
//! The layout is big endian, length prefixed, with no padding:
//!
//! ```text
//! i32 time_frame_count
//! per frame:
//!   i32 roc_bank_count
//!   per bank:
//!     i32 roc_id; i32 frame_number; i64 time_stamp; i32 hit_count
//!     hit records
//! ```
//!
//! Hit records come in two layouts: row major (crate, slot, channel, charge,
//! time per hit, the canonical form) and columnar (all crates, then all
//! slots, and so on), kept for compatibility with the historical
//! cross-language producers. The caller picks the layout explicitly when
//! constructing the codec; the two are not interchangeable on the wire.

use byteorder::{BigEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};

use super::constants::WIRE_HIT_SIZE;
use super::error::WireFormatError;
use super::frame::{RocTimeFrameBank, TimeFrame, TimeFrameSet};
use super::hit::FADCHit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HitLayout {
    #[default]
    RowMajor,
    Columnar,
}

/// Serializes and deserializes TimeFrameSets with a fixed hit layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireCodec {
    layout: HitLayout,
}

impl WireCodec {
    pub fn new(layout: HitLayout) -> Self {
        WireCodec { layout }
    }

    pub fn encode(&self, set: &TimeFrameSet) -> Result<Vec<u8>, WireFormatError> {
        let mut out = Vec::new();
        out.write_i32::<BigEndian>(set.frames.len() as i32)?;
        for frame in &set.frames {
            out.write_i32::<BigEndian>(frame.banks.len() as i32)?;
            for bank in &frame.banks {
                self.encode_bank(&mut out, bank)?;
            }
        }
        Ok(out)
    }

    pub fn decode(&self, buf: &[u8]) -> Result<TimeFrameSet, WireFormatError> {
        let mut reader = WireReader::new(buf);
        let frame_count = reader.read_count()?;
        let mut set = TimeFrameSet::new();
        for _ in 0..frame_count {
            let bank_count = reader.read_count()?;
            let mut frame = TimeFrame::new();
            for _ in 0..bank_count {
                frame.push(self.decode_bank(&mut reader)?);
            }
            set.add_frame(frame);
        }
        if reader.remaining() != 0 {
            return Err(WireFormatError::TrailingBytes(reader.remaining()));
        }
        Ok(set)
    }

    fn encode_bank(
        &self,
        out: &mut Vec<u8>,
        bank: &RocTimeFrameBank,
    ) -> Result<(), WireFormatError> {
        out.write_i32::<BigEndian>(bank.roc_id as i32)?;
        out.write_i32::<BigEndian>(bank.frame_number as i32)?;
        out.write_i64::<BigEndian>(bank.time_stamp as i64)?;
        out.write_i32::<BigEndian>(bank.hits.len() as i32)?;
        match self.layout {
            HitLayout::RowMajor => {
                for h in &bank.hits {
                    out.write_i32::<BigEndian>(h.crate_id as i32)?;
                    out.write_i32::<BigEndian>(h.slot as i32)?;
                    out.write_i32::<BigEndian>(h.channel as i32)?;
                    out.write_i32::<BigEndian>(h.charge as i32)?;
                    out.write_i64::<BigEndian>(h.time)?;
                }
            }
            HitLayout::Columnar => {
                for h in &bank.hits {
                    out.write_i32::<BigEndian>(h.crate_id as i32)?;
                }
                for h in &bank.hits {
                    out.write_i32::<BigEndian>(h.slot as i32)?;
                }
                for h in &bank.hits {
                    out.write_i32::<BigEndian>(h.channel as i32)?;
                }
                for h in &bank.hits {
                    out.write_i32::<BigEndian>(h.charge as i32)?;
                }
                for h in &bank.hits {
                    out.write_i64::<BigEndian>(h.time)?;
                }
            }
        }
        Ok(())
    }

    fn decode_bank(&self, reader: &mut WireReader) -> Result<RocTimeFrameBank, WireFormatError> {
        let roc_id = reader.read_i32()? as u32;
        let frame_number = reader.read_i32()? as u32;
        let time_stamp = reader.read_i64()? as u64;
        let hit_count = reader.read_count()?;

        // validate the declared count before allocating anything
        let needed = hit_count * WIRE_HIT_SIZE;
        if reader.remaining() < needed {
            return Err(WireFormatError::Truncated {
                needed,
                remaining: reader.remaining(),
            });
        }

        let mut bank = RocTimeFrameBank::new(roc_id, frame_number, time_stamp);
        match self.layout {
            HitLayout::RowMajor => {
                for _ in 0..hit_count {
                    let crate_id = reader.read_i32()? as u32;
                    let slot = reader.read_i32()? as u32;
                    let channel = reader.read_i32()? as u32;
                    let charge = reader.read_i32()? as u32;
                    let time = reader.read_i64()?;
                    bank.hits
                        .push(FADCHit::new(crate_id, slot, channel, charge, time));
                }
            }
            HitLayout::Columnar => {
                let mut crates = Vec::with_capacity(hit_count);
                let mut slots = Vec::with_capacity(hit_count);
                let mut channels = Vec::with_capacity(hit_count);
                let mut charges = Vec::with_capacity(hit_count);
                let mut times = Vec::with_capacity(hit_count);
                for _ in 0..hit_count {
                    crates.push(reader.read_i32()? as u32);
                }
                for _ in 0..hit_count {
                    slots.push(reader.read_i32()? as u32);
                }
                for _ in 0..hit_count {
                    channels.push(reader.read_i32()? as u32);
                }
                for _ in 0..hit_count {
                    charges.push(reader.read_i32()? as u32);
                }
                for _ in 0..hit_count {
                    times.push(reader.read_i64()?);
                }
                for i in 0..hit_count {
                    bank.hits.push(FADCHit::new(
                        crates[i],
                        slots[i],
                        channels[i],
                        charges[i],
                        times[i],
                    ));
                }
            }
        }
        Ok(bank)
    }
}

/// Cursor over a wire buffer with bounds checking on every read
struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        WireReader { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireFormatError> {
        if self.remaining() < n {
            return Err(WireFormatError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32, WireFormatError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i64(&mut self) -> Result<i64, WireFormatError> {
        let b = self.take(8)?;
        Ok(i64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// A length prefix; negative values are a format error
    fn read_count(&mut self) -> Result<usize, WireFormatError> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(WireFormatError::BadCount(count));
        }
        Ok(count as usize)
    }
}
