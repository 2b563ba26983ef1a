//! Relative index resolution shared by filter and layout commands
//!
//! Commands address positions with a signed index where `-1` means
//! "the end of the list".

/// Index value meaning "at the end"
pub const END_INDEX: i64 = -1;

/// Resolve an insertion index into a list of `len` elements
///
/// Valid inputs are `-1` (append) and `0..=len`.
pub fn resolve_insert_index(index: i64, len: usize) -> Option<usize> {
    if index == END_INDEX {
        return Some(len);
    }
    usize::try_from(index).ok().filter(|i| *i <= len)
}

/// Resolve an index addressing an existing element of a list of `len` elements
///
/// Valid inputs are `-1` (last element) and `0..len`.
pub fn resolve_existing_index(index: i64, len: usize) -> Option<usize> {
    if index == END_INDEX {
        return len.checked_sub(1);
    }
    usize::try_from(index).ok().filter(|i| *i < len)
}
