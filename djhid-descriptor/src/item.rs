//! Short item tokenizer
//!
//! A report descriptor is a stream of items. Each item starts with a prefix
//! byte holding the tag (bits 7-4), the type (bits 3-2) and the payload size
//! (bits 1-0, where `3` means four bytes). Payloads are little-endian.
//! See HID class definition 1.11, section 6.2.2.2.

use crate::error::DescriptorError;

/// Mask selecting tag and type bits of an item prefix
pub const TAG_MASK: u8 = 0xFC;

/// Mask selecting the payload size bits of an item prefix
pub const SIZE_MASK: u8 = 0x03;

/// Prefix byte of a long item (tag 0xF, type reserved, size 2)
pub const LONG_ITEM_PREFIX: u8 = 0xFE;

/// Collection type value for an Application collection
pub const COLLECTION_APPLICATION: u32 = 0x01;

/// Item tags with type bits included, as they appear in the prefix byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemTag {
    // Main items
    Input,
    Output,
    Feature,
    Collection,
    EndCollection,

    // Global items
    UsagePage,
    LogicalMinimum,
    LogicalMaximum,
    PhysicalMinimum,
    PhysicalMaximum,
    UnitExponent,
    Unit,
    ReportSize,
    ReportId,
    ReportCount,
    Push,
    Pop,

    // Local items
    Usage,
    UsageMinimum,
    UsageMaximum,
    DesignatorIndex,
    DesignatorMinimum,
    DesignatorMaximum,
    StringIndex,
    StringMinimum,
    StringMaximum,
    Delimiter,
}

impl ItemTag {
    /// Decode the tag from a prefix byte, ignoring the size bits
    ///
    /// Returns `None` for reserved tags.
    pub fn from_prefix(prefix: u8) -> Option<Self> {
        Some(match prefix & TAG_MASK {
            0x80 => Self::Input,
            0x90 => Self::Output,
            0xB0 => Self::Feature,
            0xA0 => Self::Collection,
            0xC0 => Self::EndCollection,

            0x04 => Self::UsagePage,
            0x14 => Self::LogicalMinimum,
            0x24 => Self::LogicalMaximum,
            0x34 => Self::PhysicalMinimum,
            0x44 => Self::PhysicalMaximum,
            0x54 => Self::UnitExponent,
            0x64 => Self::Unit,
            0x74 => Self::ReportSize,
            0x84 => Self::ReportId,
            0x94 => Self::ReportCount,
            0xA4 => Self::Push,
            0xB4 => Self::Pop,

            0x08 => Self::Usage,
            0x18 => Self::UsageMinimum,
            0x28 => Self::UsageMaximum,
            0x38 => Self::DesignatorIndex,
            0x48 => Self::DesignatorMinimum,
            0x58 => Self::DesignatorMaximum,
            0x78 => Self::StringIndex,
            0x88 => Self::StringMinimum,
            0x98 => Self::StringMaximum,
            0xA8 => Self::Delimiter,

            _ => return None,
        })
    }
}

/// Declared payload width of a short item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSize {
    Zero,
    One,
    Two,
    Four,
}

impl PayloadSize {
    /// Decode the size bits of a prefix byte
    pub fn from_prefix(prefix: u8) -> Self {
        match prefix & SIZE_MASK {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Two,
            _ => Self::Four,
        }
    }

    /// Number of payload bytes following the prefix
    pub fn len(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Self::Zero
    }
}

/// One decoded short item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    /// Offset of the prefix byte within the descriptor
    pub offset: usize,
    /// Raw prefix byte
    pub prefix: u8,
    /// Decoded tag, `None` for reserved tags
    pub tag: Option<ItemTag>,
    /// Declared payload width
    pub size: PayloadSize,
    /// Payload, zero-extended to 32 bits
    pub payload: u32,
}

impl Item {
    /// Payload interpreted as a signed value of its declared width
    ///
    /// One and two byte payloads are sign-extended; four byte payloads
    /// already span the full `i32` range.
    pub fn signed(&self) -> i32 {
        match self.size {
            PayloadSize::Zero => 0,
            PayloadSize::One => self.payload as u8 as i8 as i32,
            PayloadSize::Two => self.payload as u16 as i16 as i32,
            PayloadSize::Four => self.payload as i32,
        }
    }

    /// Payload interpreted as a usage in the context of `usage_page`
    ///
    /// A four byte usage carries its own page in the upper 16 bits and
    /// supersedes the current Usage Page.
    pub fn usage(&self, usage_page: u16) -> u32 {
        match self.size {
            PayloadSize::Four => self.payload,
            _ => (u32::from(usage_page) << 16) | (self.payload & 0xFFFF),
        }
    }
}

/// Iterator over the short items of a descriptor
///
/// Yields an error and stops on a long item or a truncated payload.
pub struct ItemReader<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> ItemReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            failed: false,
        }
    }

    /// Offset of the next prefix byte
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_item(&mut self, prefix: u8) -> Result<Item, DescriptorError> {
        let offset = self.pos;
        if prefix == LONG_ITEM_PREFIX {
            return Err(DescriptorError::LongItem { offset });
        }

        let size = PayloadSize::from_prefix(prefix);
        let start = offset + 1;
        let bytes = self
            .data
            .get(start..start + size.len())
            .ok_or(DescriptorError::TruncatedItem {
                offset,
                needed: size.len(),
                available: self.data.len().saturating_sub(start),
            })?;

        let payload = bytes
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));

        self.pos = start + size.len();
        Ok(Item {
            offset,
            prefix,
            tag: ItemTag::from_prefix(prefix),
            size,
            payload,
        })
    }
}

impl Iterator for ItemReader<'_> {
    type Item = Result<Item, DescriptorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let prefix = *self.data.get(self.pos)?;
        let result = self.read_item(prefix);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}
