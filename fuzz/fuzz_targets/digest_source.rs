#![no_main]

use libfuzzer_sys::fuzz_target;
use md5chk::{BlockHasher, DigestConfig, Md5Hasher, Md5Session, ReadSource};

fuzz_target!(|input: (u8, u8, bool, Vec<u8>)| {
    let (max_size, block_size, overlap, data) = input;

    let config = DigestConfig::default()
        .with_block_size(block_size as usize + 1)
        .with_max_size(max_size as u64)
        .with_overlap(overlap);
    let mut session = Md5Session::new(config).unwrap();
    let expr = session.digest("fuzz", ReadSource::new(&data[..])).unwrap();

    // Verify: the whole digest does not depend on segmentation
    assert_eq!(expr.whole(), Some(Md5Hasher::digest(&data)));

    // Verify: one block digest per block without overlap
    let max = config_max(max_size, overlap);
    if !overlap && !data.is_empty() {
        let blocks: Vec<_> = data.chunks(max).map(Md5Hasher::digest).collect();
        assert_eq!(expr.block_digests().collect::<Vec<_>>(), blocks);
    }

    // Verify: the text form parses back
    let parsed: md5chk::DigestExpr = expr.to_string().parse().unwrap();
    assert_eq!(parsed, expr);
});

fn config_max(max_size: u8, overlap: bool) -> usize {
    match (max_size, overlap) {
        (0, true) => md5chk::DEFAULT_SEGMENT_SIZE as usize,
        (0, false) => usize::MAX,
        (n, _) => n as usize,
    }
}
