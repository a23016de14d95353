use crate::command::{BackReference, TOKEN_LEN};

mod decompress;
pub use decompress::Decompressor;

mod search;

/// Index of a committed block in the compressor's block list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockId(usize);

/// What a protected byte of the image is part of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    /// literal copy a block's tokens point at
    Source,
    /// token bytes, rewritten whenever their source moves
    Token,
}

/// A repeated run of bytes. `start` keeps the literal copy, every offset in `at` gets
/// replaced by a token pointing back at it.
#[derive(Debug, Clone)]
struct Block {
    len: usize,
    start: usize,
    at: Vec<usize>,
}

impl Block {
    /// Bytes saved if every occurrence gets replaced.
    fn score(&self) -> usize {
        self.at.len() * (self.len - TOKEN_LEN)
    }

    fn token(&self) -> BackReference {
        debug_assert!(self.start <= usize::from(u16::MAX));

        BackReference {
            length: self.len as u8,
            from: self.start as u16,
        }
    }
}

pub struct Compressor {
    /// working copy of the data, shrinks with every replacement
    image: Vec<u8>,
    /// which committed block (if any) owns each byte of `image`
    owners: Vec<Option<Owner>>,
    blocks: Vec<Block>,
}

impl Compressor {
    pub fn new(src: &[u8]) -> Self {
        Self {
            image: src.to_vec(),
            owners: vec![None; src.len()],
            blocks: Vec::new(),
        }
    }

    pub fn compress(mut self) -> Vec<u8> {
        log::debug!("uncompressed size = {} bytes", self.image.len());

        while let Some(block) = search::find_best_block(&self.image, &self.owners) {
            log::debug!(
                "best block is at {:#06x}, length {} with score {} ({:02x?})",
                block.start,
                block.len,
                block.score(),
                &self.image[block.start..block.start + block.len]
            );

            self.commit(block);
        }

        log::debug!(
            "compressed size = {} bytes using {} blocks",
            self.image.len(),
            self.blocks.len()
        );

        self.image
    }

    fn commit(&mut self, block: Block) {
        let id = BlockId(self.blocks.len());
        let (start, len, count) = (block.start, block.len, block.at.len());

        self.owners[start..start + len].fill(Some(Owner::Source));
        self.blocks.push(block);

        // offsets of later occurrences move with every splice, so always read them back
        for index in 0..count {
            let at = self.blocks[id.0].at[index];
            let token = self.blocks[id.0].token();

            log::trace!(
                "replacing {} bytes at {:#06x} with reference to {:#06x}, saving {} bytes",
                len,
                at,
                start,
                len - TOKEN_LEN
            );

            self.image[at..at + TOKEN_LEN].copy_from_slice(&token.encode());
            self.image.drain(at + TOKEN_LEN..at + len);

            self.owners[at..at + TOKEN_LEN].fill(Some(Owner::Token));
            self.owners.drain(at + TOKEN_LEN..at + len);

            self.rebase(at + TOKEN_LEN, len - TOKEN_LEN);
        }
    }

    /// Shifts every committed block left of a splice that removed `removed` bytes at
    /// `splice_at`, rewriting the tokens of blocks whose literal copy moved.
    fn rebase(&mut self, splice_at: usize, removed: usize) {
        for block in &mut self.blocks {
            let moved = block.start > splice_at;
            if moved {
                block.start -= removed;
            }

            for at in block.at.iter_mut().filter(|at| **at > splice_at) {
                *at -= removed;
            }

            if moved {
                let token = block.token().encode();
                for &at in &block.at {
                    log::trace!(
                        "correcting reference at {:#06x} from {:02x?} to {:02x?}",
                        at,
                        &self.image[at..at + TOKEN_LEN],
                        token
                    );
                    self.image[at..at + TOKEN_LEN].copy_from_slice(&token);
                }
            }
        }
    }
}
