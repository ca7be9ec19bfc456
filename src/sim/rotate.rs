//! Row block rotation
//!
//! Rotates a slice made of equally sized blocks (grid rows) left by a whole
//! number of blocks, swapping block contents pairwise. The result is the same
//! as `slice.rotate_left(by * block_len)`.

/// Swap two non-overlapping blocks of `block_len` items
fn swap_blocks<T>(items: &mut [T], a: usize, b: usize, block_len: usize) {
    debug_assert_ne!(a, b);
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let (head, tail) = items.split_at_mut(hi * block_len);
    head[lo * block_len..(lo + 1) * block_len].swap_with_slice(&mut tail[..block_len]);
}

/// Rotate `items` left by `by` blocks of `block_len` items each
///
/// `items.len()` must be a multiple of `block_len`.
pub fn rotate_blocks_left<T>(items: &mut [T], block_len: usize, by: usize) {
    if block_len == 0 {
        return;
    }
    debug_assert_eq!(items.len() % block_len, 0);
    let last = items.len() / block_len;
    if last == 0 {
        return;
    }
    let mut middle = by % last;
    if middle == 0 {
        return;
    }

    // Forward swap chain: `first` walks the output, `next` the pending input.
    let mut first = 0;
    let mut next = middle;
    while first != next {
        swap_blocks(items, first, next, block_len);
        first += 1;
        next += 1;
        if next == last {
            next = middle;
        } else if first == middle {
            middle = next;
        }
    }
}
