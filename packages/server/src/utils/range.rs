use common::storage::ByteRange;

/// Parse a single-range `Range` header value against an object of `size`
/// bytes.
///
/// Accepts `bytes=start-end`, `bytes=start-` and `bytes=-suffix`. An end
/// past the object is clamped to `size - 1`, a suffix longer than the object
/// to the whole object. Returns `None` when the header is malformed or the
/// range cannot be satisfied.
pub fn parse_range(header: &str, size: u64) -> Option<ByteRange> {
    let spec = header.trim().strip_prefix("bytes=")?.trim();
    if size == 0 || spec.contains(',') {
        return None;
    }
    let (start, end) = spec.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());
    let last = size - 1;

    if start.is_empty() {
        let suffix: u64 = end.parse().ok()?;
        if suffix == 0 {
            return None;
        }
        let suffix = suffix.min(size);
        return Some(ByteRange::new(size - suffix, last));
    }

    let start: u64 = start.parse().ok()?;
    let end = if end.is_empty() {
        last
    } else {
        end.parse::<u64>().ok()?
    };
    if start > end || start > last {
        return None;
    }
    Some(ByteRange::new(start, end.min(last)))
}
