use std::sync::Arc;

use super::{Cell, CellError, CellResult, MAX_CELL_BITS, MAX_CELL_REFS};
use crate::address::TonAddress;

/// Builder for ordinary cells.
///
/// All `store_*` methods return `&mut Self` so calls can be chained with `?`.
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        CellBuilder {
            data: Vec::with_capacity(128),
            bit_len: 0,
            references: Vec::new(),
        }
    }

    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        if self.bit_len >= MAX_CELL_BITS {
            return Err(CellError::DataTooLong(self.bit_len + 1));
        }

        let byte_index = self.bit_len / 8;
        if byte_index >= self.data.len() {
            self.data.push(0);
        }
        if bit {
            self.data[byte_index] |= 1 << (7 - (self.bit_len % 8));
        }

        self.bit_len += 1;
        Ok(self)
    }

    /// Stores the low `bits` bits of `value`, most significant first.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        if self.bit_len + bits > MAX_CELL_BITS {
            return Err(CellError::DataTooLong(self.bit_len + bits));
        }

        for i in (0..bits).rev() {
            self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    /// Stores a two's complement integer in `bits` bits.
    pub fn store_int(&mut self, value: i64, bits: usize) -> CellResult<&mut Self> {
        self.store_uint(value as u64, bits)
    }

    pub fn store_u8(&mut self, value: u8) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 8)
    }

    pub fn store_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 32)
    }

    pub fn store_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.store_uint(value, 64)
    }

    pub fn store_i8(&mut self, value: i8) -> CellResult<&mut Self> {
        self.store_int(value as i64, 8)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        if self.bit_len + bytes.len() * 8 > MAX_CELL_BITS {
            return Err(CellError::DataTooLong(self.bit_len + bytes.len() * 8));
        }

        if self.bit_len % 8 == 0 {
            self.data.truncate(self.bit_len / 8);
            self.data.extend_from_slice(bytes);
            self.bit_len += bytes.len() * 8;
            return Ok(self);
        }

        for &byte in bytes {
            self.store_u8(byte)?;
        }
        Ok(self)
    }

    /// Stores `bytes` in this cell and chains the remainder through the
    /// first reference of each following cell (the "snake" layout).
    pub fn store_snake_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        let fit = (self.bits_left() / 8).min(bytes.len());
        let (head, tail) = bytes.split_at(fit);
        self.store_bytes(head)?;

        if !tail.is_empty() {
            let mut next = CellBuilder::new();
            next.store_snake_bytes(tail)?;
            self.store_ref(Arc::new(next.build()?))?;
        }
        Ok(self)
    }

    /// Stores an amount as `VarUInteger 16`: a 4-bit byte length, then the bytes.
    pub fn store_coins(&mut self, nanotons: u128) -> CellResult<&mut Self> {
        let byte_len = (128 - nanotons.leading_zeros() as usize).div_ceil(8);
        if byte_len > 15 {
            return Err(CellError::DataTooLong(byte_len * 8 + 4));
        }

        self.store_uint(byte_len as u64, 4)?;
        for i in (0..byte_len).rev() {
            self.store_u8((nanotons >> (i * 8)) as u8)?;
        }
        Ok(self)
    }

    /// Stores `addr_std$10` with no anycast.
    pub fn store_address(&mut self, address: &TonAddress) -> CellResult<&mut Self> {
        self.store_uint(0b10, 2)?;
        self.store_bit(false)?;
        self.store_i8(address.workchain())?;
        self.store_bytes(address.hash_part())
    }

    /// Stores `addr_none$00`.
    pub fn store_null_address(&mut self) -> CellResult<&mut Self> {
        self.store_uint(0b00, 2)
    }

    pub fn store_ref(&mut self, cell: Arc<Cell>) -> CellResult<&mut Self> {
        if self.references.len() >= MAX_CELL_REFS {
            return Err(CellError::TooManyRefs(self.references.len() + 1));
        }
        self.references.push(cell);
        Ok(self)
    }

    /// Appends all bits and references of `cell`.
    pub fn store_cell_contents(&mut self, cell: &Cell) -> CellResult<&mut Self> {
        let mut slice = cell.parse();
        while slice.bits_left() > 0 {
            let bit = slice.load_bit()?;
            self.store_bit(bit)?;
        }
        for reference in cell.references() {
            self.store_ref(reference.clone())?;
        }
        Ok(self)
    }

    pub fn bits_left(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    pub fn build(self) -> CellResult<Cell> {
        Ok(Cell::new(self.data, self.bit_len, self.references))
    }
}
