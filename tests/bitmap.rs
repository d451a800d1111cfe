use rand::Rng;
use roaring::RoaringTreemap;
use rowsearch::search::bitmap::{byte_len, decode, encode};
use rowsearch::{AliveFilter, ErrorKind};

#[test]
fn test_random_row_sets_survive_encoding() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let universe: u64 = rng.gen_range(0..2_000);
        let mut rows = RoaringTreemap::new();
        if universe > 0 {
            for _ in 0..rng.gen_range(0..200) {
                rows.insert(rng.gen_range(0..universe));
            }
        }

        let bytes = encode(&rows, universe).unwrap();
        assert_eq!(bytes.len(), byte_len(universe));
        assert_eq!(decode(&bytes, universe).unwrap(), rows);
    }
}

#[test]
fn test_bit_layout_is_little_endian_within_bytes() {
    let rows: RoaringTreemap = [0u64, 9, 15].into_iter().collect();
    assert_eq!(encode(&rows, 17).unwrap(), vec![0b0000_0001, 0b1000_0010, 0]);
}

#[test]
fn test_padding_bits_are_ignored_and_length_is_strict() {
    let decoded = decode(&[0xff], 3).unwrap();
    assert_eq!(decoded.iter().collect::<Vec<_>>(), vec![0, 1, 2]);

    assert_eq!(decode(&[0, 0], 3).unwrap_err().kind, ErrorKind::InvalidInput);
    let rows: RoaringTreemap = [4u64].into_iter().collect();
    assert_eq!(encode(&rows, 4).unwrap_err().kind, ErrorKind::InvalidInput);
}

#[test]
fn test_alive_filter_from_caller_bytes() {
    assert_eq!(AliveFilter::from_bitmap(&[], false).unwrap(), AliveFilter::All);
    assert!(AliveFilter::from_bitmap(&[], true).unwrap().is_empty());

    let filter = AliveFilter::from_bitmap(&[0b0000_0100], true).unwrap();
    assert!(filter.allows(2));
    assert!(!filter.allows(3));
    assert!(!filter.allows(8));
}
