use std::sync::Arc;

use super::{Cell, CellError, CellResult};

/// Sequential reader over a cell's bits and references.
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_offset: usize,
    ref_offset: usize,
}

impl<'a> CellSlice<'a> {
    pub fn new(cell: &'a Cell) -> Self {
        CellSlice {
            cell,
            bit_offset: 0,
            ref_offset: 0,
        }
    }

    pub fn bits_left(&self) -> usize {
        self.cell.bit_len() - self.bit_offset
    }

    pub fn refs_left(&self) -> usize {
        self.cell.references().len() - self.ref_offset
    }

    pub fn load_bit(&mut self) -> CellResult<bool> {
        if self.bits_left() == 0 {
            return Err(CellError::UnexpectedEof);
        }
        let byte = self.cell.data()[self.bit_offset / 8];
        let bit = (byte >> (7 - (self.bit_offset % 8))) & 1 == 1;
        self.bit_offset += 1;
        Ok(bit)
    }

    pub fn load_uint(&mut self, bits: usize) -> CellResult<u64> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        if self.bits_left() < bits {
            return Err(CellError::UnexpectedEof);
        }

        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | self.load_bit()? as u64;
        }
        Ok(value)
    }

    pub fn load_u8(&mut self) -> CellResult<u8> {
        Ok(self.load_uint(8)? as u8)
    }

    pub fn load_u32(&mut self) -> CellResult<u32> {
        Ok(self.load_uint(32)? as u32)
    }

    pub fn load_bytes(&mut self, len: usize) -> CellResult<Vec<u8>> {
        if self.bits_left() < len * 8 {
            return Err(CellError::UnexpectedEof);
        }
        if self.bit_offset % 8 == 0 {
            let start = self.bit_offset / 8;
            self.bit_offset += len * 8;
            return Ok(self.cell.data()[start..start + len].to_vec());
        }
        (0..len).map(|_| self.load_u8()).collect()
    }

    pub fn load_coins(&mut self) -> CellResult<u128> {
        let len = self.load_uint(4)? as usize;
        let mut value = 0u128;
        for byte in self.load_bytes(len)? {
            value = (value << 8) | byte as u128;
        }
        Ok(value)
    }

    pub fn load_ref(&mut self) -> CellResult<&'a Arc<Cell>> {
        let reference = self
            .cell
            .reference(self.ref_offset)
            .ok_or(CellError::NoMoreRefs)?;
        self.ref_offset += 1;
        Ok(reference)
    }

    /// Reads the remaining whole bytes of this cell and of every cell chained
    /// through the first reference.
    pub fn load_snake_bytes(&mut self) -> CellResult<Vec<u8>> {
        if self.bits_left() % 8 != 0 {
            return Err(CellError::Unsupported(format!(
                "snake data is not byte aligned ({} bits left)",
                self.bits_left()
            )));
        }

        let mut out = self.load_bytes(self.bits_left() / 8)?;
        let mut next = if self.refs_left() > 0 {
            Some(self.load_ref()?.clone())
        } else {
            None
        };

        while let Some(cell) = next {
            let mut slice = cell.parse();
            if slice.bits_left() % 8 != 0 {
                return Err(CellError::Unsupported("snake tail is not byte aligned".to_string()));
            }
            out.extend(slice.load_bytes(slice.bits_left() / 8)?);
            next = cell.reference(0).cloned();
        }

        Ok(out)
    }
}
