use crate::command::{BackReference, FormatError, TOKEN_LEN};

/// Expands back-references in a single pass.
///
/// Sources of back-references are never touched by the compressor, so they can be
/// copied straight out of the compressed data itself.
#[derive(Debug, Clone)]
pub struct Decompressor<'a> {
    src: &'a [u8],
    dst: Vec<u8>,

    /// index to read from
    read_index: usize,
}

impl<'a> Decompressor<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Self {
            src,
            dst: Vec::with_capacity(src.len()),
            read_index: 0,
        }
    }

    pub fn decompress(mut self) -> Result<Vec<u8>, FormatError> {
        while let Some(&value) = self.src.get(self.read_index) {
            if BackReference::is_token(value) {
                let token = BackReference::decode(self.src, self.read_index)?;
                self.copy_reference(token)?;
                self.read_index += TOKEN_LEN;
            } else {
                self.dst.push(value);
                self.read_index += 1;
            }
        }

        Ok(self.dst)
    }

    fn copy_reference(&mut self, token: BackReference) -> Result<(), FormatError> {
        let source = token.source();
        let data = self
            .src
            .get(source.clone())
            .ok_or(FormatError::SourceOutOfBounds {
                offset: self.read_index,
                from: source.start,
                end: source.end,
            })?;

        log::trace!(
            "expanding {} bytes from {:#06x} at {:#06x}",
            data.len(),
            source.start,
            self.read_index
        );

        self.dst.extend_from_slice(data);

        Ok(())
    }
}
