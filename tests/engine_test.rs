// Integration tests for the digesting Session
// Tests cover: expression shapes, windows, salting, prefixes, failures, properties

use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

use md5chk::{
    BlockDigest, BlockHasher, ByteSource, ChkError, DigestConfig, DigestExpr, Marker, Md5Hasher,
    Md5Session, ReadSource, Salting, SeekSource, Separator, Term, Window,
};
use proptest::prelude::*;

fn md5(data: &[u8]) -> BlockDigest {
    Md5Hasher::digest(data)
}

fn md5_parts(parts: &[&[u8]]) -> BlockDigest {
    let mut hasher = Md5Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

fn session(config: DigestConfig) -> Md5Session {
    Md5Session::new(config).unwrap()
}

fn label(n: u32) -> Vec<u8> {
    format!("{:020}", n).into_bytes()
}

/// Source over a byte slice that reports errors where told to.
struct FaultySource<'a> {
    data: &'a [u8],
    fail_read_at: Option<usize>,
    fail_close: bool,
}

impl ByteSource for FaultySource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail_read_at == Some(0) {
            return Err(io::Error::other("device went away"));
        }
        let mut n = buf.len().min(self.data.len());
        if let Some(at) = self.fail_read_at.as_mut() {
            n = n.min(*at);
            *at -= n;
        }
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }

    fn close(self) -> io::Result<()> {
        if self.fail_close {
            Err(io::Error::other("close failed"))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that accepts a number of writes, then fails like a closed pipe.
struct ClosingPipe {
    writes_left: usize,
}

impl Write for ClosingPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.writes_left == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        }
        self.writes_left -= 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Expression Shapes
// ============================================================================

#[test]
fn test_thirty_bytes_in_blocks_of_ten() {
    let mut s = session(DigestConfig::default().with_max_size(10));
    let expr = s.digest("a", ReadSource::new(&[b'A'; 30][..])).unwrap();

    let d = md5(&[b'A'; 10]).to_hex();
    let w = md5(&[b'A'; 30]).to_hex();
    assert_eq!(expr.to_string(), format!("{d}+{d}+{d}={w}"));
}

#[test]
fn test_thirty_bytes_overlapping() {
    let mut s = session(DigestConfig::default().with_max_size(10).with_overlap(true));
    let expr = s.digest("a", ReadSource::new(&[b'A'; 30][..])).unwrap();

    let d = md5(&[b'A'; 10]).to_hex();
    let p = md5(&[b'A'; 20]).to_hex();
    let w = md5(&[b'A'; 30]).to_hex();
    assert_eq!(expr.to_string(), format!("{d}-{p}-{p}={w}"));
}

#[test]
fn test_single_block_is_single_term() {
    for overlap in [false, true] {
        let config = DigestConfig::default()
            .with_max_size(10)
            .with_overlap(overlap);
        let mut s = session(config);
        let expr = s.digest("a", ReadSource::new(&b"0123456789"[..])).unwrap();
        assert_eq!(expr.terms(), &[Term::first(md5(b"0123456789"))]);
    }
}

#[test]
fn test_expression_parses_back() {
    let mut s = session(DigestConfig::default().with_max_size(7).with_overlap(true));
    let data: Vec<u8> = (0..50).collect();
    let expr = s.digest("a", ReadSource::new(&data[..])).unwrap();

    let parsed: DigestExpr = expr.to_string().parse().unwrap();
    assert_eq!(parsed, expr);
}

#[test]
fn test_sessions_are_reusable() {
    let mut s = session(DigestConfig::default().with_max_size(4));
    let first = s.digest("a", ReadSource::new(&b"abcdefgh"[..])).unwrap();
    let second = s.digest("b", ReadSource::new(&b"abcdefgh"[..])).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Windows
// ============================================================================

#[test]
fn test_window_on_stream_and_file_agree() {
    let data: Vec<u8> = (0..20).collect();
    let config = DigestConfig::default().with_window(Window::new(5, 10));

    let mut s = session(config);
    let streamed = s.digest("s", ReadSource::new(&data[..])).unwrap();
    let seeked = s.digest("f", SeekSource::new(Cursor::new(data.clone()))).unwrap();

    assert_eq!(streamed, seeked);
    assert_eq!(streamed.whole(), Some(md5(&data[5..15])));
}

#[test]
fn test_window_too_large_for_file() {
    let data: Vec<u8> = (0..20).collect();
    let config = DigestConfig::default().with_window(Window::new(15, 10));
    let mut s = session(config);

    let mut expr = DigestExpr::new();
    let err = s
        .digest_source("f", SeekSource::new(Cursor::new(data)), &mut expr)
        .unwrap_err();

    assert!(matches!(err, ChkError::ShortRead { .. }));
    assert!(expr.is_empty());
}

#[test]
fn test_exact_on_stream_reads_no_further() {
    let data: Vec<u8> = (0..20).collect();
    let config = DigestConfig::default().with_window(Window::new(0, 8));
    let mut s = session(config);

    let mut reader = &data[..];
    let expr = s.digest("s", ReadSource::new(&mut reader)).unwrap();

    assert_eq!(expr.whole(), Some(md5(&data[..8])));
    assert_eq!(reader.len(), 12);
}

#[test]
fn test_offset_only_reads_to_end() {
    let data: Vec<u8> = (0..20).collect();
    let config = DigestConfig::default()
        .with_max_size(4)
        .with_window(Window::new(6, 0));
    let mut s = session(config);

    let expr = s.digest("s", ReadSource::new(&data[..])).unwrap();
    assert_eq!(expr.whole(), Some(md5(&data[6..])));
    assert_eq!(expr.block_digests().count(), 4);
}

// ============================================================================
// Salting And Prefix
// ============================================================================

#[test]
fn test_salted_blocks_differ() {
    let config = DigestConfig::default().with_salting(Salting::Continuous);
    assert_eq!(config.max_size(), md5chk::DEFAULT_SEGMENT_SIZE);

    let config = config.with_max_size(10);
    let mut s = session(config);
    let a10 = [b'A'; 10];
    let expr = s.digest("a", ReadSource::new(&[b'A'; 30][..])).unwrap();

    let blocks: Vec<_> = expr.block_digests().collect();
    assert_eq!(
        blocks,
        vec![
            md5_parts(&[&label(1), &a10]),
            md5_parts(&[&label(2), &a10]),
            md5_parts(&[&label(3), &a10]),
        ]
    );
    assert_eq!(expr.whole(), Some(md5_parts(&[&label(1), &[b'A'; 30]])));
}

#[test]
fn test_continuous_salt_carries_over() {
    let config = DigestConfig::default()
        .with_max_size(10)
        .with_salting(Salting::Continuous);
    let mut s = session(config);

    let first = s.digest("a", ReadSource::new(&[b'A'; 30][..])).unwrap();
    let second = s.digest("b", ReadSource::new(&[b'A'; 30][..])).unwrap();
    assert_ne!(first, second);

    // The first item used numbers 1 to 4, the next starts at 5.
    assert_eq!(
        second.terms()[0],
        Term::first(md5_parts(&[&label(5), &[b'A'; 10]]))
    );
}

#[test]
fn test_per_item_salt_restarts() {
    let config = DigestConfig::default()
        .with_max_size(10)
        .with_salting(Salting::PerItem);
    let mut s = session(config);

    let first = s.digest("a", ReadSource::new(&[b'A'; 30][..])).unwrap();
    let second = s.digest("b", ReadSource::new(&[b'A'; 30][..])).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_salted_overlap_uses_salt_of_earlier_block() {
    let config = DigestConfig::default()
        .with_max_size(4)
        .with_overlap(true)
        .with_salting(Salting::PerItem);
    let mut s = session(config);
    let expr = s.digest("a", ReadSource::new(&b"abcdefghijkl"[..])).unwrap();

    assert_eq!(
        expr.terms(),
        &[
            Term::first(md5_parts(&[&label(1), b"abcd"])),
            Term::joined(Separator::Overlap, md5_parts(&[&label(1), b"abcdefgh"])),
            Term::joined(Separator::Overlap, md5_parts(&[&label(2), b"efghijkl"])),
            Term::joined(Separator::Whole, md5_parts(&[&label(1), b"abcdefghijkl"])),
        ]
    );
}

#[test]
fn test_prefix_follows_salt() {
    let config = DigestConfig::default()
        .with_max_size(4)
        .with_salting(Salting::PerItem)
        .with_prefix(Some("px"));
    let mut s = session(config);

    let expr = s.digest("a", ReadSource::new(&b"abcd"[..])).unwrap();
    assert_eq!(
        expr.terms(),
        &[Term::first(md5_parts(&[&label(1), b"px", b"abcd"]))]
    );
}

#[test]
fn test_prefix_without_segmentation() {
    let config = DigestConfig::default().with_prefix(Some(&b"secret"[..]));
    let mut s = session(config);

    let expr = s.digest("a", ReadSource::new(&b"data"[..])).unwrap();
    assert_eq!(expr.whole(), Some(md5(b"secretdata")));
}

// ============================================================================
// Pass-through
// ============================================================================

#[test]
fn test_pass_through_echoes_window() {
    let buf = SharedBuf::default();
    let config = DigestConfig::default()
        .with_max_size(3)
        .with_overlap(true)
        .with_window(Window::new(2, 7));
    let mut s = Md5Session::with_pass_through(config, buf.clone()).unwrap();

    s.digest("a", ReadSource::new(&b"0123456789"[..])).unwrap();
    assert_eq!(buf.0.borrow().as_slice(), b"2345678");
}

#[test]
fn test_pass_through_failure_marks_err() {
    let config = DigestConfig::default().with_max_size(4);
    let mut s = Md5Session::with_pass_through(config, ClosingPipe { writes_left: 2 }).unwrap();

    let mut expr = DigestExpr::new();
    let err = s
        .digest_source("p", ReadSource::new(&b"aaaabbbbcccc"[..]), &mut expr)
        .unwrap_err();

    assert!(matches!(err, ChkError::StreamRead { .. }), "{:?}", err);
    assert_eq!(
        expr.block_digests().collect::<Vec<_>>(),
        vec![md5(b"aaaa"), md5(b"bbbb")]
    );
    assert_eq!(expr.whole(), None);
    assert_eq!(expr.marker(), Some(Marker::Err));
}

#[test]
fn test_literal_pass_through_failure_is_stream_error() {
    let mut s =
        Md5Session::with_pass_through(DigestConfig::default(), ClosingPipe { writes_left: 0 })
            .unwrap();

    let mut expr = DigestExpr::new();
    let err = s.digest_literal(&b"abc"[..], &mut expr).unwrap_err();

    assert!(matches!(err, ChkError::StreamRead { .. }), "{:?}", err);
    assert!(expr.is_empty());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_read_error_after_blocks_marks_err() {
    let data = [7u8; 32];
    let source = FaultySource {
        data: &data,
        fail_read_at: Some(12),
        fail_close: false,
    };
    let mut s = session(DigestConfig::default().with_max_size(5));

    let mut expr = DigestExpr::new();
    let err = s.digest_source("x", source, &mut expr).unwrap_err();

    assert!(matches!(err, ChkError::StreamRead { .. }));
    assert_eq!(expr.block_digests().count(), 2);
    assert_eq!(expr.marker(), Some(Marker::Err));
    assert_eq!(expr.whole(), None);
    assert!(expr.to_string().ends_with("[ERR]"));
}

#[test]
fn test_read_error_without_blocks_has_no_marker() {
    let source = FaultySource {
        data: &[1, 2, 3],
        fail_read_at: Some(0),
        fail_close: false,
    };
    let mut s = Md5Session::default();

    let mut expr = DigestExpr::new();
    let err = s.digest_source("x", source, &mut expr).unwrap_err();

    assert!(matches!(err, ChkError::StreamRead { .. }));
    assert!(expr.is_empty());
    assert_eq!(expr.marker(), None);
}

#[test]
fn test_close_error_after_blocks_marks_err() {
    let data = [1u8; 12];
    let source = FaultySource {
        data: &data,
        fail_read_at: None,
        fail_close: true,
    };
    let mut s = session(DigestConfig::default().with_max_size(4));

    let mut expr = DigestExpr::new();
    let err = s.digest_source("x", source, &mut expr).unwrap_err();

    assert!(matches!(err, ChkError::Close { .. }));
    assert_eq!(err.to_string(), "cannot close: x");
    assert_eq!(expr.block_digests().count(), 3);
    assert_eq!(expr.marker(), Some(Marker::Err));
}

#[test]
fn test_short_stream_marks_eof() {
    let config = DigestConfig::default()
        .with_max_size(4)
        .with_window(Window::new(2, 20));
    let mut s = session(config);

    let mut expr = DigestExpr::new();
    let err = s
        .digest_source("x", ReadSource::new(&[0u8; 12][..]), &mut expr)
        .unwrap_err();

    assert!(matches!(err, ChkError::ShortRead { wanted: 22, got: 12, .. }));
    assert_eq!(expr.marker(), Some(Marker::Eof));
    assert!(expr.to_string().ends_with("[EOF]"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = Md5Session::new(DigestConfig::default().with_block_size(0)).unwrap_err();
    assert!(matches!(err, ChkError::InvalidConfig { .. }));

    let config = DigestConfig::default().with_window(Window::new(u64::MAX, 1));
    assert!(Md5Session::new(config).is_err());
}

// ============================================================================
// Properties
// ============================================================================

fn any_layout() -> impl Strategy<Value = (Vec<u8>, u64, usize)> {
    (
        proptest::collection::vec(any::<u8>(), 1..600),
        1u64..64,
        1usize..40,
    )
}

proptest! {
    #[test]
    fn prop_whole_digest_ignores_segmentation(
        data in proptest::collection::vec(any::<u8>(), 0..600),
        max_size in 0u64..64,
        block_size in 1usize..40,
        overlap in any::<bool>(),
    ) {
        let config = DigestConfig::default()
            .with_block_size(block_size)
            .with_max_size(max_size)
            .with_overlap(overlap);
        let mut s = session(config);
        let expr = s.digest("p", ReadSource::new(&data[..])).unwrap();

        prop_assert_eq!(expr.whole(), Some(md5(&data)));
    }

    #[test]
    fn prop_block_digests_match_blocks((data, max_size, block_size) in any_layout()) {
        let config = DigestConfig::default()
            .with_block_size(block_size)
            .with_max_size(max_size);
        let mut s = session(config);
        let expr = s.digest("p", ReadSource::new(&data[..])).unwrap();

        let expected: Vec<_> = data.chunks(max_size as usize).map(md5).collect();
        let got: Vec<_> = expr.block_digests().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_overlap_digests_cover_adjacent_blocks((data, max_size, block_size) in any_layout()) {
        let config = DigestConfig::default()
            .with_block_size(block_size)
            .with_max_size(max_size)
            .with_overlap(true);
        let mut s = session(config);
        let expr = s.digest("p", ReadSource::new(&data[..])).unwrap();

        let blocks: Vec<_> = data.chunks(max_size as usize).collect();
        let expected: Vec<_> = blocks.windows(2).map(|w| md5_parts(&[w[0], w[1]])).collect();
        let got: Vec<_> = expr.overlap_digests().collect();

        prop_assert_eq!(expr.terms()[0], Term::first(md5(blocks[0])));
        prop_assert_eq!(got, expected);
        if blocks.len() == 2 {
            prop_assert_eq!(
                expr.terms()[2],
                Term::joined(Separator::Block, md5(blocks[1]))
            );
        }
    }

    #[test]
    fn prop_seek_and_stream_windows_agree(
        data in proptest::collection::vec(any::<u8>(), 0..300),
        offset in 0u64..100,
        exact in 0u64..100,
    ) {
        let config = DigestConfig::default()
            .with_max_size(16)
            .with_window(Window::new(offset, exact));
        let mut s = session(config);

        let streamed = s.digest("s", ReadSource::new(&data[..]));
        let seeked = s.digest("f", SeekSource::new(Cursor::new(data.clone())));

        match (streamed, seeked) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(ChkError::ShortRead { .. }), Err(ChkError::ShortRead { .. })) => {
                prop_assert!((data.len() as u64) < offset + exact);
            }
            (a, b) => prop_assert!(false, "mismatch: {:?} vs {:?}", a, b),
        }
    }
}
