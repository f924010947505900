//! Data model for the tagged, nested bank hierarchy the aggregator streams,
//! plus a reader/writer for the small container subset this crate actually
//! consumes. This is not a general bank-format library; it materializes just
//! enough structure for the time-frame decoder to walk.
//!
//! Each node on the wire is an 8-byte header (u32 payload length in bytes,
//! u16 tag, u8 type, u8 num) followed by the payload. A container node
//! (type 0x10) holds a sequence of child nodes; an integer node (type 0x01)
//! holds 32-bit words; any other type is treated as opaque raw bytes, since
//! the front end stamps FADC payloads with an improper type value.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::constants::*;
use super::error::BankError;

/// Byte order of bank headers and integer payloads. The stream default is
/// big endian; hit-word payloads are big endian regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ByteOrderKind {
    #[default]
    Big,
    Little,
}

impl ByteOrderKind {
    pub fn read_u16(&self, buf: &[u8]) -> u16 {
        match self {
            ByteOrderKind::Big => BigEndian::read_u16(buf),
            ByteOrderKind::Little => LittleEndian::read_u16(buf),
        }
    }

    pub fn read_u32(&self, buf: &[u8]) -> u32 {
        match self {
            ByteOrderKind::Big => BigEndian::read_u32(buf),
            ByteOrderKind::Little => LittleEndian::read_u32(buf),
        }
    }

    pub fn write_u16(&self, out: &mut Vec<u8>, value: u16) {
        let mut b = [0u8; 2];
        match self {
            ByteOrderKind::Big => BigEndian::write_u16(&mut b, value),
            ByteOrderKind::Little => LittleEndian::write_u16(&mut b, value),
        }
        out.extend_from_slice(&b);
    }

    pub fn write_u32(&self, out: &mut Vec<u8>, value: u32) {
        let mut b = [0u8; 4];
        match self {
            ByteOrderKind::Big => BigEndian::write_u32(&mut b, value),
            ByteOrderKind::Little => LittleEndian::write_u32(&mut b, value),
        }
        out.extend_from_slice(&b);
    }
}

#[derive(Debug, Clone)]
pub enum BankContent {
    Children(Vec<Bank>),
    Data(Vec<u8>),
}

/// One node of the bank hierarchy
#[derive(Debug, Clone)]
pub struct Bank {
    pub tag: u16,
    pub data_type: u8,
    pub num: u8,
    pub content: BankContent,
}

impl Bank {
    /// Make a container bank holding child banks
    pub fn container(tag: u16, children: Vec<Bank>) -> Self {
        Bank {
            tag,
            data_type: BANK_TYPE_CONTAINER,
            num: 0,
            content: BankContent::Children(children),
        }
    }

    /// Make a leaf bank of 32-bit integer data
    pub fn integers(tag: u16, words: &[u32], order: ByteOrderKind) -> Self {
        let mut data = Vec::with_capacity(words.len() * 4);
        for w in words {
            order.write_u32(&mut data, *w);
        }
        Bank {
            tag,
            data_type: BANK_TYPE_UINT32,
            num: 0,
            content: BankContent::Data(data),
        }
    }

    /// Make a leaf bank of opaque bytes, stamped with the front end's raw type
    pub fn raw(tag: u16, data: Vec<u8>) -> Self {
        Bank {
            tag,
            data_type: BANK_TYPE_RAW,
            num: 0,
            content: BankContent::Data(data),
        }
    }

    pub fn children(&self) -> &[Bank] {
        match &self.content {
            BankContent::Children(kids) => kids,
            BankContent::Data(_) => &[],
        }
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// The raw byte payload of a leaf bank
    pub fn raw_bytes(&self) -> Result<&[u8], BankError> {
        match &self.content {
            BankContent::Data(data) => Ok(data),
            BankContent::Children(_) => Err(BankError::NotRawData(self.tag)),
        }
    }

    /// The payload interpreted as 32-bit words in the given byte order
    pub fn int_data(&self, order: ByteOrderKind) -> Result<Vec<u32>, BankError> {
        let data = match &self.content {
            BankContent::Data(data) => data,
            BankContent::Children(_) => return Err(BankError::NotIntegerData(self.tag)),
        };
        if data.len() % 4 != 0 {
            return Err(BankError::IntPayloadAlignment(data.len()));
        }
        Ok(data.chunks_exact(4).map(|c| order.read_u32(c)).collect())
    }

    /// Read one bank tree from the front of a buffer.
    ///
    /// Returns the bank and the number of bytes consumed. Child banks are
    /// parsed recursively; declared lengths are validated against the
    /// remaining buffer before any payload is touched.
    pub fn read_tree(buf: &[u8], order: ByteOrderKind) -> Result<(Bank, usize), BankError> {
        if buf.len() < BANK_HEADER_SIZE {
            return Err(BankError::TruncatedHeader(buf.len()));
        }
        let payload_len = order.read_u32(&buf[0..4]) as usize;
        let tag = order.read_u16(&buf[4..6]);
        let data_type = buf[6];
        let num = buf[7];

        let remaining = buf.len() - BANK_HEADER_SIZE;
        if payload_len > remaining {
            return Err(BankError::PayloadOverrun {
                declared: payload_len,
                remaining,
            });
        }
        let payload = &buf[BANK_HEADER_SIZE..BANK_HEADER_SIZE + payload_len];

        let content = if data_type == BANK_TYPE_CONTAINER {
            let mut children = Vec::new();
            let mut offset = 0;
            while offset < payload.len() {
                let (child, used) = Bank::read_tree(&payload[offset..], order)?;
                children.push(child);
                offset += used;
            }
            BankContent::Children(children)
        } else {
            BankContent::Data(payload.to_vec())
        };

        Ok((
            Bank {
                tag,
                data_type,
                num,
                content,
            },
            BANK_HEADER_SIZE + payload_len,
        ))
    }

    /// Append this bank tree to a buffer in wire form
    pub fn write_tree(&self, out: &mut Vec<u8>, order: ByteOrderKind) {
        order.write_u32(out, self.payload_len() as u32);
        order.write_u16(out, self.tag);
        out.push(self.data_type);
        out.push(self.num);
        match &self.content {
            BankContent::Children(kids) => {
                for child in kids {
                    child.write_tree(out, order);
                }
            }
            BankContent::Data(data) => out.extend_from_slice(data),
        }
    }

    fn payload_len(&self) -> usize {
        match &self.content {
            BankContent::Children(kids) => kids
                .iter()
                .map(|c| BANK_HEADER_SIZE + c.payload_len())
                .sum(),
            BankContent::Data(data) => data.len(),
        }
    }
}
