//! Fixed-width node records
//!
//! Every node is a 16-byte record; integers are big-endian.
//!
//! ```text
//!              0     1..3          3..8                 8..12     12..16
//! document     tag   0             text ref             size      rank
//! element      tag   packed name   [3] attr size,       size      rank
//!                                  [4..8] distance
//! attribute    tag   packed name   value ref            distance  rank
//! text/comm/pi tag   0             value ref            distance  rank
//! ```
//!
//! A value ref is five bytes. With bit 39 set the low 32 bits hold an
//! inlined `i32`; otherwise it is a byte offset into the overflow store that
//! matches the node kind.

use super::errors::{StorageError, StorageResult};
use super::layout::Stream;

/// Width of one record in bytes
pub const RECORD_SIZE: usize = 16;
/// Record-relative offset of the five-byte value ref
pub const VALUE_OFFSET: usize = 3;
/// Record-relative offset of the subtree size (documents and elements)
pub const SIZE_OFFSET: usize = 8;

/// Marks an inlined integer inside a value ref
pub const INLINE_FLAG: u64 = 1 << 39;
/// Largest overflow offset a value ref can address
pub const MAX_OVERFLOW_OFFSET: u64 = INLINE_FLAG - 1;

/// Distinct element names the packed field can address
pub const MAX_ELEMENT_NAMES: u64 = 1 << 11;
/// Distinct attribute names the packed field can address
pub const MAX_ATTRIBUTE_NAMES: u64 = 1 << 12;
/// Distinct namespace prefixes the packed field can address
pub const MAX_NAMESPACES: u64 = 1 << 4;

const NS_FLAG: u16 = 1 << 11;

/// Node kind, stored in the first byte of every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document = 0,
    Element = 1,
    Text = 2,
    Attribute = 3,
    Comment = 4,
    ProcessingInstruction = 5,
}

impl NodeKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(NodeKind::Document),
            1 => Some(NodeKind::Element),
            2 => Some(NodeKind::Text),
            3 => Some(NodeKind::Attribute),
            4 => Some(NodeKind::Comment),
            5 => Some(NodeKind::ProcessingInstruction),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Whether the kind is a leaf carrying character content
    pub fn is_text_like(self) -> bool {
        matches!(
            self,
            NodeKind::Text | NodeKind::Comment | NodeKind::ProcessingInstruction
        )
    }

    /// Whether the record carries a subtree size at `SIZE_OFFSET`
    pub fn has_size(self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Element)
    }

    /// Whether the record carries a value ref at `VALUE_OFFSET`
    pub fn has_value(self) -> bool {
        self != NodeKind::Element
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element => "element",
            NodeKind::Text => "text",
            NodeKind::Attribute => "attribute",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing-instruction",
        }
    }
}

/// Name reference packed into two bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedName {
    pub name_id: u16,
    pub ns_id: u8,
    /// Element declares namespaces (elements only)
    pub has_namespaces: bool,
}

impl PackedName {
    pub fn pack(&self) -> u16 {
        let flag = if self.has_namespaces { NS_FLAG } else { 0 };
        (self.name_id & 0x0FFF) | flag | ((self.ns_id as u16 & 0x0F) << 12)
    }

    pub fn unpack(raw: u16, kind: NodeKind) -> Self {
        if kind == NodeKind::Element {
            Self {
                name_id: raw & 0x07FF,
                ns_id: (raw >> 12) as u8,
                has_namespaces: raw & NS_FLAG != 0,
            }
        } else {
            Self {
                name_id: raw & 0x0FFF,
                ns_id: (raw >> 12) as u8,
                has_namespaces: false,
            }
        }
    }
}

/// Either an inlined integer or an overflow store offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRef {
    Inline(i32),
    Offset(u64),
}

impl ValueRef {
    /// Five-byte field representation
    pub fn to_field(self) -> u64 {
        match self {
            ValueRef::Inline(v) => INLINE_FLAG | v as u32 as u64,
            ValueRef::Offset(offset) => offset & MAX_OVERFLOW_OFFSET,
        }
    }

    pub fn from_field(field: u64) -> Self {
        if field & INLINE_FLAG != 0 {
            ValueRef::Inline(field as u32 as i32)
        } else {
            ValueRef::Offset(field & MAX_OVERFLOW_OFFSET)
        }
    }
}

/// Decoded node record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRecord {
    Document {
        text: ValueRef,
        size: u32,
        rank: u32,
    },
    Element {
        name: PackedName,
        attr_size: u8,
        dist: u32,
        size: u32,
        rank: u32,
    },
    Attribute {
        name: PackedName,
        value: ValueRef,
        dist: u32,
        rank: u32,
    },
    /// Text, comment or processing instruction
    Leaf {
        kind: NodeKind,
        value: ValueRef,
        dist: u32,
        rank: u32,
    },
}

fn u32_at(bytes: &[u8; RECORD_SIZE], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn u40_at(bytes: &[u8; RECORD_SIZE], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf[3..].copy_from_slice(&bytes[offset..offset + 5]);
    u64::from_be_bytes(buf)
}

impl NodeRecord {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRecord::Document { .. } => NodeKind::Document,
            NodeRecord::Element { .. } => NodeKind::Element,
            NodeRecord::Attribute { .. } => NodeKind::Attribute,
            NodeRecord::Leaf { kind, .. } => *kind,
        }
    }

    pub fn rank(&self) -> u32 {
        match self {
            NodeRecord::Document { rank, .. }
            | NodeRecord::Element { rank, .. }
            | NodeRecord::Attribute { rank, .. }
            | NodeRecord::Leaf { rank, .. } => *rank,
        }
    }

    /// Distance to the parent; zero for the document node
    pub fn dist(&self) -> u32 {
        match self {
            NodeRecord::Document { .. } => 0,
            NodeRecord::Element { dist, .. }
            | NodeRecord::Attribute { dist, .. }
            | NodeRecord::Leaf { dist, .. } => *dist,
        }
    }

    pub fn name(&self) -> Option<PackedName> {
        match self {
            NodeRecord::Element { name, .. } | NodeRecord::Attribute { name, .. } => Some(*name),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<ValueRef> {
        match self {
            NodeRecord::Document { text, .. } => Some(*text),
            NodeRecord::Attribute { value, .. } | NodeRecord::Leaf { value, .. } => Some(*value),
            NodeRecord::Element { .. } => None,
        }
    }

    /// Subtree size including the node itself
    pub fn size(&self) -> u32 {
        match self {
            NodeRecord::Document { size, .. } | NodeRecord::Element { size, .. } => *size,
            _ => 1,
        }
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0] = self.kind().tag();
        match *self {
            NodeRecord::Document { text, size, rank } => {
                buf[3..8].copy_from_slice(&text.to_field().to_be_bytes()[3..]);
                buf[8..12].copy_from_slice(&size.to_be_bytes());
                buf[12..16].copy_from_slice(&rank.to_be_bytes());
            }
            NodeRecord::Element {
                name,
                attr_size,
                dist,
                size,
                rank,
            } => {
                buf[1..3].copy_from_slice(&name.pack().to_be_bytes());
                buf[3] = attr_size;
                buf[4..8].copy_from_slice(&dist.to_be_bytes());
                buf[8..12].copy_from_slice(&size.to_be_bytes());
                buf[12..16].copy_from_slice(&rank.to_be_bytes());
            }
            NodeRecord::Attribute {
                name,
                value,
                dist,
                rank,
            } => {
                buf[1..3].copy_from_slice(&name.pack().to_be_bytes());
                buf[3..8].copy_from_slice(&value.to_field().to_be_bytes()[3..]);
                buf[8..12].copy_from_slice(&dist.to_be_bytes());
                buf[12..16].copy_from_slice(&rank.to_be_bytes());
            }
            NodeRecord::Leaf {
                value, dist, rank, ..
            } => {
                buf[3..8].copy_from_slice(&value.to_field().to_be_bytes()[3..]);
                buf[8..12].copy_from_slice(&dist.to_be_bytes());
                buf[12..16].copy_from_slice(&rank.to_be_bytes());
            }
        }
        buf
    }

    /// Decodes a record read from position `position` of the table.
    pub fn decode(bytes: &[u8; RECORD_SIZE], position: u32) -> StorageResult<Self> {
        let kind = NodeKind::from_tag(bytes[0]).ok_or_else(|| {
            StorageError::corruption_at_rank(
                Stream::Table,
                position,
                format!("unknown kind tag 0x{:02x}", bytes[0]),
            )
        })?;
        let packed = u16::from_be_bytes([bytes[1], bytes[2]]);
        let rank = u32_at(bytes, 12);

        let record = match kind {
            NodeKind::Document => NodeRecord::Document {
                text: ValueRef::from_field(u40_at(bytes, VALUE_OFFSET)),
                size: u32_at(bytes, SIZE_OFFSET),
                rank,
            },
            NodeKind::Element => NodeRecord::Element {
                name: PackedName::unpack(packed, kind),
                attr_size: bytes[3],
                dist: u32_at(bytes, 4),
                size: u32_at(bytes, SIZE_OFFSET),
                rank,
            },
            NodeKind::Attribute => NodeRecord::Attribute {
                name: PackedName::unpack(packed, kind),
                value: ValueRef::from_field(u40_at(bytes, VALUE_OFFSET)),
                dist: u32_at(bytes, 8),
                rank,
            },
            _ => NodeRecord::Leaf {
                kind,
                value: ValueRef::from_field(u40_at(bytes, VALUE_OFFSET)),
                dist: u32_at(bytes, 8),
                rank,
            },
        };
        Ok(record)
    }
}
