mod command;
pub use command::{
    BackReference, Command, FormatError, MAX_BLOCK_LEN, MIN_BLOCK_LEN, TOKEN_LEN,
};

mod compression;
pub use compression::{Compressor, Decompressor};

mod disassemble;
pub use disassemble::{
    Clock, DisassembleError, DisassembleOptions, Disassembler, NTSC_CLOCK, PAL_CLOCK,
};

/// Replaces repeated runs of 4 to 51 bytes with back-references. Never grows the data.
pub fn compress(src: &[u8]) -> Vec<u8> {
    Compressor::new(src).compress()
}

pub fn decompress(src: &[u8]) -> Result<Vec<u8>, FormatError> {
    Decompressor::new(src).decompress()
}

pub fn disassemble(src: &[u8], options: &DisassembleOptions) -> Result<String, FormatError> {
    Disassembler::new(src, *options).disassemble()
}
