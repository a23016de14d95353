use super::{Block, Owner};
use crate::command::{MAX_BLOCK_LEN, MIN_BLOCK_LEN};
use memchr::memmem;
use std::collections::HashSet;

/// Sources past this offset cannot be encoded in a token.
const MAX_SOURCE_OFFSET: usize = u16::MAX as usize;

/// Scans the whole image for the repeated run that saves the most bytes.
///
/// Occurrences touching an owned byte are never used, so literal sources and tokens
/// already written stay intact. A candidate's own source may overlap other sources but
/// never a token, since a token's offset bytes change whenever its source moves.
/// Ties go to the earliest start, then the shortest run.
pub(super) fn find_best_block(image: &[u8], owners: &[Option<Owner>]) -> Option<Block> {
    let mut seen: HashSet<&[u8]> = HashSet::new();
    let mut best: Option<Block> = None;

    let last_start = image.len().saturating_sub(MIN_BLOCK_LEN);
    for start in 0..last_start.min(MAX_SOURCE_OFFSET + 1) {
        for len in (MIN_BLOCK_LEN..=MAX_BLOCK_LEN).take_while(|len| start + len < image.len()) {
            if owners[start..start + len].iter().any(is_token) {
                break;
            }

            let needle = &image[start..start + len];
            if seen.contains(needle) {
                continue;
            }

            let at = find_occurrences(image, owners, needle, start + len);
            if at.is_empty() {
                // a longer run starting here cannot occur more often
                break;
            }

            seen.insert(needle);

            let block = Block { len, start, at };
            if best.as_ref().map_or(true, |best| block.score() > best.score()) {
                best = Some(block);
            }
        }
    }

    log::debug!("found {} repeated blocks", seen.len());

    best
}

fn is_token(owner: &Option<Owner>) -> bool {
    matches!(owner, Some(Owner::Token))
}

/// Non-overlapping occurrences of `needle` at or after `from` that lie entirely in
/// unowned bytes.
fn find_occurrences(
    image: &[u8],
    owners: &[Option<Owner>],
    needle: &[u8],
    mut from: usize,
) -> Vec<usize> {
    let finder = memmem::Finder::new(needle);
    let mut found = Vec::new();

    while let Some(offset) = finder.find(&image[from..]) {
        let at = from + offset;

        if owners[at..at + needle.len()].iter().any(Option::is_some) {
            from = at + 1;
        } else {
            found.push(at);
            from = at + needle.len();
        }
    }

    found
}
