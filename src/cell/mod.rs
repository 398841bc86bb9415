//! Ordinary TON cells and their Bag-of-Cells serialization.
//!
//! A cell holds up to 1023 data bits and up to 4 references to other cells.
//! Message bodies, internal messages and signed external messages are all
//! trees of cells, and the remote API accepts them as base64-encoded BOCs.
//!
//! Only ordinary (non-exotic, level 0) cells are supported. That is all a
//! wallet transfer needs; Merkle proofs and pruned branches never reach this
//! crate.
//!
//! # Example
//!
//! ```
//! use tonsend::cell::{CellBuilder, deserialize_boc, serialize_boc};
//!
//! # fn example() -> Result<(), tonsend::cell::CellError> {
//! let mut builder = CellBuilder::new();
//! builder.store_u32(0)?.store_snake_bytes(b"hello")?;
//! let cell = builder.build()?;
//!
//! let boc = serialize_boc(&cell, true)?;
//! let parsed = deserialize_boc(&boc)?;
//! assert_eq!(parsed.hash(), cell.hash());
//! # Ok(())
//! # }
//! ```

mod boc;
mod builder;
mod slice;

use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;

pub use boc::{deserialize_boc, deserialize_boc_base64, serialize_boc, serialize_boc_base64};
pub use builder::CellBuilder;
pub use slice::CellSlice;

/// Maximum number of data bits in a cell.
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references in a cell.
pub const MAX_CELL_REFS: usize = 4;

/// Magic prefix of the generic BOC format.
pub(crate) const BOC_GENERIC_MAGIC: u32 = 0xb5ee_9c72;

#[derive(Debug, Error)]
pub enum CellError {
    #[error("Cell data too long: {0} bits (max 1023)")]
    DataTooLong(usize),

    #[error("Too many cell references: {0} (max 4)")]
    TooManyRefs(usize),

    #[error("Invalid bit length: {0}")]
    InvalidBitLength(usize),

    #[error("Unexpected end of cell data")]
    UnexpectedEof,

    #[error("No reference left to load")]
    NoMoreRefs,

    #[error("Invalid BoC format: {0}")]
    InvalidBoc(String),

    #[error("BoC has {0} roots, expected exactly one")]
    NotSingleRoot(usize),

    #[error("CRC32 mismatch: expected 0x{expected:08x}, got 0x{actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("Unsupported cell: {0}")]
    Unsupported(String),

    #[error("Invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

pub type CellResult<T> = Result<T, CellError>;

/// An ordinary TON cell.
///
/// The representation hash and depth are computed once on construction, so
/// cells are cheap to compare and to reference from several parents.
#[derive(Debug, Clone)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<Arc<Cell>>,
    hash: [u8; 32],
    depth: u16,
}

impl Cell {
    /// Builds a cell from raw parts. Bits past `bit_len` must be zero.
    pub(crate) fn new(data: Vec<u8>, bit_len: usize, references: Vec<Arc<Cell>>) -> Self {
        debug_assert!(bit_len <= MAX_CELL_BITS);
        debug_assert!(references.len() <= MAX_CELL_REFS);

        let depth = references
            .iter()
            .map(|r| r.depth.saturating_add(1))
            .max()
            .unwrap_or(0);

        let mut cell = Cell {
            data,
            bit_len,
            references,
            hash: [0u8; 32],
            depth,
        };
        cell.hash = cell.representation_hash();
        cell
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, Vec::new())
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn references(&self) -> &[Arc<Cell>] {
        &self.references
    }

    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.references.get(index)
    }

    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Returns a reader positioned at the first bit and first reference.
    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    /// The two descriptor bytes: reference count, then the data length code.
    pub(crate) fn descriptors(&self) -> [u8; 2] {
        let d1 = self.references.len() as u8;
        let d2 = (self.bit_len / 8 + self.bit_len.div_ceil(8)) as u8;
        [d1, d2]
    }

    /// Data bytes with the completion tag appended when the last byte is partial.
    pub(crate) fn padded_data(&self) -> Vec<u8> {
        let byte_len = self.bit_len.div_ceil(8);
        let mut padded = self.data[..byte_len].to_vec();
        let rem = self.bit_len % 8;
        if rem != 0 {
            padded[byte_len - 1] |= 1 << (7 - rem);
        }
        padded
    }

    fn representation_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.descriptors());
        hasher.update(self.padded_data());
        for reference in &self.references {
            hasher.update(reference.depth.to_be_bytes());
        }
        for reference in &self.references {
            hasher.update(reference.hash);
        }
        hasher.finalize().into()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

pub(crate) fn crc32c(data: &[u8]) -> u32 {
    const CRC32C: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);
    CRC32C.checksum(data)
}
