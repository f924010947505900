//! Walks the bank hierarchy of one top-level time frame.
//!
//! The layout, top down: the frame bank carries a leading time-slice segment
//! (frame number plus split 64-bit timestamp), then one bank per read-out
//! controller. Each controller bank leads with a stream-info sub-bank that we
//! skip, followed by one payload bank per hardware slot.

use super::bank::{Bank, ByteOrderKind};
use super::error::FrameDecodeError;
use super::frame::{RocTimeFrameBank, TimeFrame};
use super::payload::{PayloadDecoder, TimeBasis};
use super::slot_map::SlotMap;

/// Decodes one materialized frame bank into a TimeFrame.
///
/// Holds only immutable configuration; structural errors abort the current
/// frame and leave the decoder reusable for the next one.
#[derive(Debug, Clone)]
pub struct TimeFrameDecoder {
    payload_decoder: PayloadDecoder,
    slot_map: SlotMap,
    byte_order: ByteOrderKind,
}

impl TimeFrameDecoder {
    pub fn new(time_basis: TimeBasis, slot_map: SlotMap, byte_order: ByteOrderKind) -> Self {
        TimeFrameDecoder {
            payload_decoder: PayloadDecoder::new(time_basis),
            slot_map,
            byte_order,
        }
    }

    /// Decode a frame bank.
    ///
    /// Returns Ok(None) for the recognized control frames (prestart, go,
    /// end); these are a normal input class, not an error.
    pub fn decode_frame(&self, frame: &Bank) -> Result<Option<TimeFrame>, FrameDecodeError> {
        use super::constants::{END_TAG, GO_TAG, PRESTART_TAG};
        match frame.tag {
            PRESTART_TAG => {
                log::debug!("Skipping PRESTART frame (tag {:#06x})", frame.tag);
                return Ok(None);
            }
            GO_TAG => {
                log::debug!("Skipping GO frame (tag {:#06x})", frame.tag);
                return Ok(None);
            }
            END_TAG => {
                log::debug!("Encountered END frame (tag {:#06x})", frame.tag);
                return Ok(None);
            }
            _ => (),
        }

        let children = frame.children();
        if children.len() < 2 {
            return Err(FrameDecodeError::TooFewFrameChildren(children.len()));
        }

        let (frame_number, time_stamp) = self.read_time_slice_segment(&children[0])?;
        log::trace!("Decoding frame {frame_number} with timestamp {time_stamp}");

        let mut time_frame = TimeFrame::new();
        for roc_bank in &children[1..] {
            time_frame.push(self.decode_controller(roc_bank, frame_number, time_stamp)?);
        }
        Ok(Some(time_frame))
    }

    /// The time slice segment holds [frame number, ts low word, ts high word].
    /// Some aggregators wrap the segment in one extra container level.
    fn read_time_slice_segment(&self, bank: &Bank) -> Result<(u32, u64), FrameDecodeError> {
        let segment = match bank.children() {
            [] => bank,
            kids => &kids[0],
        };
        let words = segment.int_data(self.byte_order)?;
        if words.len() < 3 {
            return Err(FrameDecodeError::ShortTimeSliceSegment(words.len()));
        }
        let time_stamp = (words[1] as u64) | ((words[2] as u64) << 32);
        Ok((words[0], time_stamp))
    }

    fn decode_controller(
        &self,
        roc_bank: &Bank,
        frame_number: u32,
        time_stamp: u64,
    ) -> Result<RocTimeFrameBank, FrameDecodeError> {
        let roc_id = roc_bank.tag as u32;
        let kids = roc_bank.children();
        if kids.len() < 2 {
            return Err(FrameDecodeError::TooFewControllerChildren {
                roc_id,
                count: kids.len(),
            });
        }

        let mut bank = RocTimeFrameBank::new(roc_id, frame_number, time_stamp);
        // Index 0 is the stream info sub-bank; payload banks follow
        for payload_bank in &kids[1..] {
            let slot = self.slot_map.slot(payload_bank.tag as u32);
            let raw = payload_bank.raw_bytes()?;
            let hits = self
                .payload_decoder
                .decode(time_stamp as i64, roc_id, slot, raw)?;
            if !hits.is_empty() {
                bank.add_hits(hits);
            }
        }
        Ok(bank)
    }
}

//Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use super::super::constants::{END_TAG, GO_TAG, PRESTART_TAG};
    use super::super::error::BankError;

    fn hit_word(time_code: u32, channel: u32, charge: u32) -> Vec<u8> {
        ((time_code << 17) | (channel << 13) | charge)
            .to_be_bytes()
            .to_vec()
    }

    fn payload(words: &[Vec<u8>]) -> Vec<u8> {
        words.iter().flatten().copied().collect()
    }

    /// One controller (id 2), info sub-bank, payload banks for slots 17 and 19
    fn synthetic_frame() -> Bank {
        let order = ByteOrderKind::Big;
        let slot17 = payload(&[hit_word(10, 1, 100), hit_word(20, 2, 200)]);
        let slot19 = payload(&[hit_word(10, 3, 300), hit_word(30, 4, 400)]);
        Bank::container(
            0xFF60,
            vec![
                Bank::integers(0x01, &[7, 0x0000_8000, 0x0000_0001], order),
                Bank::container(
                    2,
                    vec![
                        Bank::raw(0, vec![]),
                        Bank::raw(17, slot17),
                        Bank::raw(19, slot19),
                    ],
                ),
            ],
        )
    }

    fn decoder(basis: TimeBasis) -> TimeFrameDecoder {
        TimeFrameDecoder::new(basis, SlotMap::identity(), ByteOrderKind::Big)
    }

    #[test]
    fn test_control_frames_skip() {
        let d = decoder(TimeBasis::Absolute);
        for tag in [PRESTART_TAG, GO_TAG, END_TAG] {
            let frame = Bank::container(tag, vec![]);
            assert!(d.decode_frame(&frame).unwrap().is_none());
        }
    }

    #[test]
    fn test_too_few_frame_children() {
        let d = decoder(TimeBasis::Absolute);
        let frame = Bank::container(
            0xFF60,
            vec![Bank::integers(1, &[0, 0, 0], ByteOrderKind::Big)],
        );
        match d.decode_frame(&frame) {
            Err(FrameDecodeError::TooFewFrameChildren(1)) => (),
            other => panic!("expected TooFewFrameChildren, got {other:?}"),
        }
    }

    #[test]
    fn test_too_few_controller_children() {
        let d = decoder(TimeBasis::Absolute);
        let frame = Bank::container(
            0xFF60,
            vec![
                Bank::integers(1, &[0, 0, 0], ByteOrderKind::Big),
                Bank::container(3, vec![Bank::raw(0, vec![])]),
            ],
        );
        match d.decode_frame(&frame) {
            Err(FrameDecodeError::TooFewControllerChildren { roc_id: 3, count: 1 }) => (),
            other => panic!("expected TooFewControllerChildren, got {other:?}"),
        }
    }

    #[test]
    fn test_short_time_slice_segment() {
        let d = decoder(TimeBasis::Absolute);
        let frame = Bank::container(
            0xFF60,
            vec![
                Bank::integers(1, &[7, 8], ByteOrderKind::Big),
                Bank::container(2, vec![Bank::raw(0, vec![]), Bank::raw(17, vec![])]),
            ],
        );
        match d.decode_frame(&frame) {
            Err(FrameDecodeError::ShortTimeSliceSegment(2)) => (),
            other => panic!("expected ShortTimeSliceSegment, got {other:?}"),
        }
    }

    #[test]
    fn test_timestamp_reconstruction() {
        let d = decoder(TimeBasis::Absolute);
        let frame = synthetic_frame();
        let tf = d.decode_frame(&frame).unwrap().unwrap();
        assert_eq!(tf.banks.len(), 1);
        let bank = &tf.banks[0];
        assert_eq!(bank.roc_id, 2);
        assert_eq!(bank.frame_number, 7);
        assert_eq!(bank.time_stamp, 0x0000_0001_0000_8000);
    }

    #[test]
    fn test_frame_decode_relative_basis() {
        let d = decoder(TimeBasis::FrameRelative);
        let tf = d.decode_frame(&synthetic_frame()).unwrap().unwrap();
        let hits = &tf.banks[0].hits;
        assert_eq!(hits.len(), 4);
        // slot visit order, not time order
        let expect = [
            (17, 1, 100, 40),
            (17, 2, 200, 80),
            (19, 3, 300, 40),
            (19, 4, 400, 120),
        ];
        for (hit, (slot, channel, charge, time)) in hits.iter().zip(expect) {
            assert_eq!(hit.crate_id, 2);
            assert_eq!(hit.slot, slot);
            assert_eq!(hit.channel, channel);
            assert_eq!(hit.charge, charge);
            assert_eq!(hit.time, time);
        }
    }

    #[test]
    fn test_absolute_basis_adds_frame_base() {
        let d = decoder(TimeBasis::Absolute);
        let tf = d.decode_frame(&synthetic_frame()).unwrap().unwrap();
        let base = 0x0000_0001_0000_8000i64;
        assert_eq!(tf.banks[0].hits[0].time, base + 40);
        assert_eq!(tf.banks[0].hits[3].time, base + 120);
    }

    #[test]
    fn test_slot_map_applied() {
        let d = TimeFrameDecoder::new(
            TimeBasis::FrameRelative,
            SlotMap::default(),
            ByteOrderKind::Big,
        );
        // payload id 10 maps to slot 17 in the default table
        let frame = Bank::container(
            0xFF60,
            vec![
                Bank::integers(1, &[1, 0, 0], ByteOrderKind::Big),
                Bank::container(
                    1,
                    vec![
                        Bank::raw(0, vec![]),
                        Bank::raw(10, hit_word(1, 1, 50)),
                    ],
                ),
            ],
        );
        let tf = d.decode_frame(&frame).unwrap().unwrap();
        assert_eq!(tf.banks[0].hits[0].slot, 17);
    }

    #[test]
    fn test_container_payload_is_structural_error() {
        let d = decoder(TimeBasis::Absolute);
        let frame = Bank::container(
            0xFF60,
            vec![
                Bank::integers(1, &[1, 0, 0], ByteOrderKind::Big),
                Bank::container(
                    2,
                    vec![Bank::raw(0, vec![]), Bank::container(17, vec![])],
                ),
            ],
        );
        match d.decode_frame(&frame) {
            Err(FrameDecodeError::BadBank(BankError::NotRawData(17))) => (),
            other => panic!("expected NotRawData, got {other:?}"),
        }
    }
}
