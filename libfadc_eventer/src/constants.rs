//! Constants describing the streamed time-frame format and the FADC hit word.

/// Tag of a PRESTART control frame emitted at session start
pub const PRESTART_TAG: u16 = 0xFFD1;
/// Tag of a GO control frame emitted at run start
pub const GO_TAG: u16 = 0xFFD2;
/// Tag of an END control frame emitted at run end
pub const END_TAG: u16 = 0xFFD4;

/// Low 13 bits of a hit word hold the integrated charge
pub const CHARGE_MASK: u32 = 0x1FFF;
pub const CHANNEL_SHIFT: u32 = 13;
/// 4 bits of channel number within the slot
pub const CHANNEL_MASK: u32 = 0xF;
pub const TIME_SHIFT: u32 = 17;
/// 14 bits of coarse time code
pub const TIME_MASK: u32 = 0x3FFF;
/// The FADC time code counts in units of 4 ns
pub const TIME_CODE_NS: i64 = 4;

/// Size of a bank node header: u32 payload length, u16 tag, u8 type, u8 num
pub const BANK_HEADER_SIZE: usize = 8;
/// Bank type indicating the payload is a sequence of child banks
pub const BANK_TYPE_CONTAINER: u8 = 0x10;
/// Bank type indicating the payload is 32-bit integer data
pub const BANK_TYPE_UINT32: u8 = 0x01;
/// Bank type the front end stamps on raw FADC payloads
pub const BANK_TYPE_RAW: u8 = 0x0F;

/// Bytes taken by one hit record on the wire (4 x i32 + i64)
pub const WIRE_HIT_SIZE: usize = 24;

/// Default payload-id to hardware-slot table of the VXS crate. Payload ids
/// index into this table; the values are the physical slot numbers the
/// aggregator visits.
pub const DEFAULT_SLOT_TABLE: [u32; 17] = [
    0, 10, 13, 9, 14, 8, 15, 7, 16, 6, 17, 5, 18, 4, 19, 3, 20,
];
