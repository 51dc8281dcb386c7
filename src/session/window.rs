//! Positioning a source at the start of the window.

use tracing::trace;

use crate::config::Window;
use crate::error::ChkError;
use crate::source::ByteSource;

/// Moves `source` past `window.offset()`.
///
/// Seekable sources are checked up front to hold the whole window and then
/// seek. Everything else is read and discarded through `scratch`.
pub(super) fn skip_to_window<S: ByteSource>(
    name: &str,
    source: &mut S,
    window: Window,
    scratch: &mut [u8],
) -> Result<(), ChkError> {
    let offset = window.offset();
    if offset == 0 {
        return Ok(());
    }

    if let Some(available) = source.remaining_len() {
        if available < window.required_len() {
            return Err(ChkError::ShortRead {
                name: name.to_owned(),
                wanted: window.required_len(),
                got: available,
            });
        }
        trace!(offset, "seeking to window");
        return source.seek_forward(offset).map_err(|e| ChkError::Seek {
            name: name.to_owned(),
            offset,
            source: e,
        });
    }

    trace!(offset, "discarding up to window");
    let mut skipped = 0u64;
    while skipped < offset {
        let want = (offset - skipped).min(scratch.len() as u64) as usize;
        let n = source
            .read(&mut scratch[..want])
            .map_err(|e| ChkError::StreamRead {
                name: name.to_owned(),
                source: e,
            })?;
        if n == 0 {
            return Err(ChkError::ShortRead {
                name: name.to_owned(),
                wanted: window.required_len(),
                got: skipped,
            });
        }
        skipped += n as u64;
    }
    Ok(())
}
