use roaring::RoaringTreemap;
use crate::core::error::{Error, Result};
use crate::core::types::MAX_ROW_ID;

/// Number of bytes needed for `universe` bits
pub fn byte_len(universe: u64) -> usize {
    universe.div_ceil(8) as usize
}

/// Pack a row set into bytes: bit `i % 8` of byte `i / 8` is set iff row
/// ordinal `i` is in the set.
pub fn encode(rows: &RoaringTreemap, universe: u64) -> Result<Vec<u8>> {
    if let Some(max) = rows.max() {
        if max >= universe {
            return Err(Error::invalid_input(format!(
                "row {} is outside a universe of {} rows",
                max, universe
            )));
        }
    }

    if universe > MAX_ROW_ID + 1 {
        return Err(Error::invalid_input(format!(
            "a universe of {} rows exceeds the bitmap limit of {} rows",
            universe,
            MAX_ROW_ID + 1
        )));
    }

    let len = byte_len(universe);
    let mut bytes = Vec::new();
    bytes.try_reserve_exact(len)
        .map_err(|e| Error::internal(format!("cannot allocate a {} byte bitmap: {}", len, e)))?;
    bytes.resize(len, 0u8);
    for row in rows.iter() {
        bytes[(row / 8) as usize] |= 1 << (row % 8);
    }
    Ok(bytes)
}

/// Inverse of `encode`. The length must be exactly `ceil(universe / 8)`;
/// padding bits past `universe` in the last byte are ignored.
pub fn decode(bytes: &[u8], universe: u64) -> Result<RoaringTreemap> {
    let expected = byte_len(universe);
    if bytes.len() != expected {
        return Err(Error::invalid_input(format!(
            "bitmap has {} bytes, a universe of {} rows needs {}",
            bytes.len(),
            universe,
            expected
        )));
    }

    let mut rows = RoaringTreemap::new();
    for (i, &byte) in bytes.iter().enumerate() {
        if byte == 0 {
            continue;
        }
        for bit in 0..8u64 {
            let row = i as u64 * 8 + bit;
            if row < universe && byte & (1 << bit) != 0 {
                rows.insert(row);
            }
        }
    }
    Ok(rows)
}

/// Caller-supplied restriction on which rows may be returned
#[derive(Debug, Clone, PartialEq)]
pub enum AliveFilter {
    All,
    Only(RoaringTreemap),
}

impl AliveFilter {
    /// Interpret a caller bitmap. Without `use_filter` the bytes are ignored.
    /// With it, the bitmap covers `bytes.len() * 8` rows and every row past
    /// its end is filtered out, so an empty slice filters out everything.
    pub fn from_bitmap(bytes: &[u8], use_filter: bool) -> Result<Self> {
        if !use_filter {
            return Ok(AliveFilter::All);
        }
        Ok(AliveFilter::Only(decode(bytes, bytes.len() as u64 * 8)?))
    }

    pub fn allows(&self, row_id: u64) -> bool {
        match self {
            AliveFilter::All => true,
            AliveFilter::Only(rows) => rows.contains(row_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AliveFilter::Only(rows) if rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn set(rows: &[u64]) -> RoaringTreemap {
        rows.iter().copied().collect()
    }

    #[test]
    fn test_bit_layout() {
        let bytes = encode(&set(&[0, 3, 9]), 10).unwrap();
        assert_eq!(bytes, vec![0b0000_1001, 0b0000_0010]);
    }

    #[test]
    fn test_empty_universe() {
        assert!(encode(&RoaringTreemap::new(), 0).unwrap().is_empty());
        assert!(decode(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_universe_row_rejected() {
        assert!(encode(&set(&[8]), 8).is_err());
    }

    #[test]
    fn test_oversized_universe_rejected() {
        let err = encode(&set(&[1]), 1 << 62).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(decode(&[0xFF], 9).is_err());
        assert!(decode(&[0xFF, 0x00], 8).is_err());
    }

    #[test]
    fn test_padding_bits_ignored() {
        let rows = decode(&[0xFF], 3).unwrap();
        assert_eq!(rows, set(&[0, 1, 2]));
    }

    #[test]
    fn test_alive_filter_modes() {
        assert_eq!(AliveFilter::from_bitmap(&[0x01], false).unwrap(), AliveFilter::All);
        assert!(AliveFilter::from_bitmap(&[], true).unwrap().is_empty());
        assert!(AliveFilter::from_bitmap(&[0x00, 0x00], true).unwrap().is_empty());

        let filter = AliveFilter::from_bitmap(&[0b0000_0100], true).unwrap();
        assert!(filter.allows(2));
        assert!(!filter.allows(3));
        assert!(!filter.allows(64));
    }
}
