use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BankError {
    #[error("Buffer too short for bank header; {0} bytes remaining")]
    TruncatedHeader(usize),
    #[error("Bank payload declares {declared} bytes but only {remaining} remain")]
    PayloadOverrun { declared: usize, remaining: usize },
    #[error("Bank with tag {0:#06x} holds child banks, not integer data")]
    NotIntegerData(u16),
    #[error("Bank with tag {0:#06x} holds child banks, not raw bytes")]
    NotRawData(u16),
    #[error("Integer bank payload length {0} is not a multiple of 4")]
    IntPayloadAlignment(usize),
}

#[derive(Debug, Clone, Error)]
pub enum FrameDecodeError {
    #[error("Too few children for time frame ({0}); expected at least 2")]
    TooFewFrameChildren(usize),
    #[error("Too few children for controller bank {roc_id} ({count}); expected at least 2")]
    TooFewControllerChildren { roc_id: u32, count: usize },
    #[error("Time slice segment holds {0} words; expected frame number plus 64-bit timestamp")]
    ShortTimeSliceSegment(usize),
    #[error("Payload for slot {slot} has length {len}, not a multiple of 4")]
    PayloadNotWordAligned { slot: u32, len: usize },
    #[error("Failed to walk bank hierarchy: {0}")]
    BadBank(#[from] BankError),
}

#[derive(Debug, Error)]
pub enum WireFormatError {
    #[error("Wire buffer truncated; needed {needed} bytes but {remaining} remain")]
    Truncated { needed: usize, remaining: usize },
    #[error("Invalid count {0} found in wire buffer")]
    BadCount(i32),
    #[error("Wire buffer has {0} trailing bytes after a complete read")]
    TrailingBytes(usize),
    #[error("Wire codec failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Sliding window width must be positive; got {0}")]
    BadWindowWidth(i64),
    #[error("Sliding window step must be positive; got {0}")]
    BadWindowStep(i64),
    #[error("Beam center charge range is inverted: min {0} > max {1}")]
    BadChargeRange(u32, u32),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to frame decode error: {0}")]
    DecodeError(#[from] FrameDecodeError),
    #[error("Processor failed due to bank error: {0}")]
    BankError(#[from] BankError),
    #[error("Processor failed due to wire format error: {0}")]
    WireError(#[from] WireFormatError),
    #[error("Processor failed due to configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}
