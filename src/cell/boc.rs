//! Bag of Cells (BoC) serialization.
//!
//! Layout of the generic format written here:
//!
//! ```text
//! magic:u32 flags:u8 off_bytes:u8 cells:size roots:size absent:size
//! tot_cells_size:off_bytes root_idx:size [cell...] [crc32c:u32 LE]
//! ```
//!
//! Cells are ordered so every reference points to a higher index, with the
//! root at index 0.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::{BOC_GENERIC_MAGIC, Cell, CellError, CellResult, crc32c};

pub fn serialize_boc(root: &Cell, with_crc: bool) -> CellResult<Vec<u8>> {
    let cells = collect_cells(root);
    let index_of: HashMap<[u8; 32], usize> = cells.iter().enumerate().map(|(i, c)| (c.hash(), i)).collect();

    let size_bytes = bytes_needed(cells.len());
    let mut serialized_cells = Vec::with_capacity(cells.len());
    for cell in &cells {
        let mut raw = Vec::with_capacity(2 + cell.bit_len().div_ceil(8) + cell.references().len() * size_bytes);
        raw.extend_from_slice(&cell.descriptors());
        raw.extend_from_slice(&cell.padded_data());
        for reference in cell.references() {
            let idx = index_of
                .get(&reference.hash())
                .ok_or_else(|| CellError::InvalidBoc("reference missing from cell list".to_string()))?;
            write_uint(&mut raw, *idx as u64, size_bytes);
        }
        serialized_cells.push(raw);
    }

    let total_size: usize = serialized_cells.iter().map(Vec::len).sum();
    let off_bytes = bytes_needed(total_size);

    let mut out = Vec::with_capacity(16 + total_size);
    out.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());
    let flags = (if with_crc { 1u8 << 6 } else { 0 }) | size_bytes as u8;
    out.push(flags);
    out.push(off_bytes as u8);
    write_uint(&mut out, cells.len() as u64, size_bytes);
    write_uint(&mut out, 1, size_bytes);
    write_uint(&mut out, 0, size_bytes);
    write_uint(&mut out, total_size as u64, off_bytes);
    write_uint(&mut out, 0, size_bytes);
    for raw in serialized_cells {
        out.extend_from_slice(&raw);
    }

    if with_crc {
        let crc = crc32c(&out);
        out.extend_from_slice(&crc.to_le_bytes());
    }

    Ok(out)
}

pub fn serialize_boc_base64(root: &Cell) -> CellResult<String> {
    Ok(STANDARD.encode(serialize_boc(root, true)?))
}

/// Parses a single-root BoC in the generic format.
pub fn deserialize_boc(data: &[u8]) -> CellResult<Arc<Cell>> {
    let mut reader = Reader { data, pos: 0 };

    let magic = reader.read_uint(4)? as u32;
    if magic != BOC_GENERIC_MAGIC {
        return Err(CellError::InvalidBoc(format!("unknown magic 0x{magic:08x}")));
    }

    let flags = reader.read_uint(1)? as u8;
    let has_idx = flags & 0x80 != 0;
    let has_crc = flags & 0x40 != 0;
    let size_bytes = (flags & 0x07) as usize;
    if size_bytes == 0 || size_bytes > 4 {
        return Err(CellError::InvalidBoc(format!("invalid size_bytes {size_bytes}")));
    }

    let off_bytes = reader.read_uint(1)? as usize;
    if off_bytes == 0 || off_bytes > 8 {
        return Err(CellError::InvalidBoc(format!("invalid off_bytes {off_bytes}")));
    }

    let cell_count = reader.read_uint(size_bytes)? as usize;
    let root_count = reader.read_uint(size_bytes)? as usize;
    let _absent = reader.read_uint(size_bytes)?;
    let total_size = reader.read_uint(off_bytes)? as usize;

    if root_count != 1 {
        return Err(CellError::NotSingleRoot(root_count));
    }
    let root_index = reader.read_uint(size_bytes)? as usize;

    // every cell takes at least its two descriptor bytes
    if cell_count > reader.remaining() / 2 || total_size > reader.remaining() {
        return Err(CellError::InvalidBoc(format!(
            "header claims {cell_count} cells in {total_size} bytes, only {} left",
            reader.remaining()
        )));
    }

    if has_idx {
        let index_len = cell_count
            .checked_mul(off_bytes)
            .filter(|len| *len <= reader.remaining())
            .ok_or_else(|| CellError::InvalidBoc(format!("index of {cell_count} cells exceeds input")))?;
        reader.skip(index_len)?;
    }

    let cells_start = reader.pos;
    let mut raw_cells = Vec::with_capacity(cell_count);
    for _ in 0..cell_count {
        raw_cells.push(read_raw_cell(&mut reader, size_bytes)?);
    }
    if reader.pos - cells_start != total_size {
        return Err(CellError::InvalidBoc(format!(
            "cell data size mismatch: header says {total_size}, read {}",
            reader.pos - cells_start
        )));
    }

    if has_crc {
        let body_end = reader.pos;
        let expected = reader.read_u32_le()?;
        let actual = crc32c(&data[..body_end]);
        if expected != actual {
            return Err(CellError::CrcMismatch { expected, actual });
        }
    }

    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
    for (i, raw) in raw_cells.into_iter().enumerate().rev() {
        let mut references = Vec::with_capacity(raw.refs.len());
        for idx in raw.refs {
            if idx <= i || idx >= cell_count {
                return Err(CellError::InvalidBoc(format!("cell {i} has invalid reference {idx}")));
            }
            let child = built[idx]
                .clone()
                .ok_or_else(|| CellError::InvalidBoc(format!("cell {idx} not built")))?;
            references.push(child);
        }
        built[i] = Some(Arc::new(Cell::new(raw.data, raw.bit_len, references)));
    }

    built
        .get(root_index)
        .cloned()
        .flatten()
        .ok_or_else(|| CellError::InvalidBoc(format!("root index {root_index} out of range")))
}

pub fn deserialize_boc_base64(encoded: &str) -> CellResult<Arc<Cell>> {
    let bytes = STANDARD.decode(encoded.trim())?;
    deserialize_boc(&bytes)
}

struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
}

fn read_raw_cell(reader: &mut Reader<'_>, size_bytes: usize) -> CellResult<RawCell> {
    let d1 = reader.read_uint(1)? as u8;
    let d2 = reader.read_uint(1)? as u8;

    if d1 & 0x08 != 0 {
        return Err(CellError::Unsupported("exotic cell".to_string()));
    }
    if d1 >> 5 != 0 {
        return Err(CellError::Unsupported("cell with non-zero level".to_string()));
    }
    if d1 & 0x10 != 0 {
        return Err(CellError::Unsupported("cell with stored hashes".to_string()));
    }

    let ref_count = (d1 & 0x07) as usize;
    if ref_count > super::MAX_CELL_REFS {
        return Err(CellError::TooManyRefs(ref_count));
    }

    let byte_len = (d2 as usize).div_ceil(2);
    let mut data = reader.take(byte_len)?.to_vec();
    let bit_len = if d2 % 2 == 0 {
        byte_len * 8
    } else {
        strip_completion_tag(&mut data)?
    };

    let mut refs = Vec::with_capacity(ref_count);
    for _ in 0..ref_count {
        refs.push(reader.read_uint(size_bytes)? as usize);
    }

    Ok(RawCell { data, bit_len, refs })
}

/// Clears the trailing `1` tag of a partial last byte and returns the bit length.
fn strip_completion_tag(data: &mut [u8]) -> CellResult<usize> {
    let full_bytes = data.len().saturating_sub(1);
    let last = data
        .last_mut()
        .ok_or_else(|| CellError::InvalidBoc("empty data with partial-byte descriptor".to_string()))?;
    if *last == 0 {
        return Err(CellError::InvalidBoc("missing completion tag".to_string()));
    }
    let trailing = last.trailing_zeros() as usize;
    *last &= !(1u8 << trailing);
    Ok(full_bytes * 8 + (7 - trailing))
}

/// Cells in reverse post-order: parents before children, duplicates removed.
fn collect_cells(root: &Cell) -> Vec<&Cell> {
    fn visit<'c>(cell: &'c Cell, seen: &mut HashSet<[u8; 32]>, order: &mut Vec<&'c Cell>) {
        if !seen.insert(cell.hash()) {
            return;
        }
        for reference in cell.references() {
            visit(reference, seen, order);
        }
        order.push(cell);
    }

    let mut seen = HashSet::new();
    let mut order = Vec::new();
    visit(root, &mut seen, &mut order);
    order.reverse();
    order
}

fn bytes_needed(value: usize) -> usize {
    let bits = usize::BITS as usize - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

fn write_uint(out: &mut Vec<u8>, value: u64, bytes: usize) {
    for i in (0..bytes).rev() {
        out.push((value >> (i * 8)) as u8);
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize) -> CellResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(CellError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(CellError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> CellResult<()> {
        self.take(len).map(|_| ())
    }

    fn read_uint(&mut self, bytes: usize) -> CellResult<u64> {
        Ok(self
            .take(bytes)?
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    fn read_u32_le(&mut self) -> CellResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
