use thiserror::Error;

/// Size of an encoded back-reference on the wire.
pub const TOKEN_LEN: usize = 3;

/// Shortest run worth replacing. Anything shorter would not save a byte.
pub const MIN_BLOCK_LEN: usize = 4;
/// Longest run a single token can describe (`0x37 - 4`).
pub const MAX_BLOCK_LEN: usize = 51;

const TOKEN_LEN_BIAS: u8 = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unexpected end of data at {offset:#06x}, {expected} more byte(s) needed")]
    Truncated { offset: usize, expected: usize },
    /// Never produced by [`Command::read`]; only [`BackReference::decode`] called
    /// directly on a byte outside 0x08..=0x37 returns it.
    #[error("Back-reference at {offset:#06x} has invalid length {length}")]
    InvalidTokenSize { offset: usize, length: usize },
    #[error("Invalid control byte {byte:#04x} at {offset:#06x}")]
    InvalidControlByte { offset: usize, byte: u8 },
    #[error("Back-reference at {offset:#06x} points outside the data ({from:#06x}..{end:#06x})")]
    SourceOutOfBounds {
        offset: usize,
        from: usize,
        end: usize,
    },
}

/// "Copy `length` literal bytes from `from` in the compressed stream."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackReference {
    pub length: u8,
    pub from: u16,
}

impl BackReference {
    pub fn is_token(byte: u8) -> bool {
        (0x08..0x38).contains(&byte)
    }

    pub fn encode(&self) -> [u8; TOKEN_LEN] {
        let [lower, upper] = self.from.to_le_bytes();
        [self.length + TOKEN_LEN_BIAS, lower, upper]
    }

    /// Decodes the 3-byte token starting at `offset` in `src`.
    pub fn decode(src: &[u8], offset: usize) -> Result<Self, FormatError> {
        let token = src
            .get(offset..offset + TOKEN_LEN)
            .ok_or_else(|| FormatError::Truncated {
                offset: src.len(),
                expected: offset + TOKEN_LEN - src.len(),
            })?;

        let length = usize::from(token[0]).wrapping_sub(usize::from(TOKEN_LEN_BIAS));
        if !(MIN_BLOCK_LEN..=MAX_BLOCK_LEN).contains(&length) {
            return Err(FormatError::InvalidTokenSize { offset, length });
        }

        Ok(Self {
            length: length as u8,
            from: u16::from_le_bytes([token[1], token[2]]),
        })
    }

    /// Range of the compressed data this token copies.
    pub fn source(&self) -> std::ops::Range<usize> {
        let from = usize::from(self.from);
        from..from + usize::from(self.length)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `1rrr dddd`: select register `r` and set its low nibble
    Latch { register: u8, data: u8 },
    /// `01dd dddd`: upper bits for the latched register
    Data(u8),
    Wait(u8),
    End,
    Loop,
    BackReference(BackReference),
}

impl Command {
    /// Decodes the command at `offset`, returning it with its encoded size.
    pub fn read(src: &[u8], offset: usize) -> Result<(Self, usize), FormatError> {
        let op = *src.get(offset).ok_or(FormatError::Truncated {
            offset,
            expected: 1,
        })?;

        let command = match op {
            n @ 0x80..=0xff => Self::Latch {
                register: (n >> 4) & 0x07,
                data: n & 0x0f,
            },
            n @ 0x40..0x80 => Self::Data(n & 0x3f),
            n @ 0x38..0x40 => Self::Wait(n & 0x07),
            0x00 => Self::End,
            0x01 => Self::Loop,
            0x08..0x38 => Self::BackReference(BackReference::decode(src, offset)?),
            byte @ 0x02..0x08 => return Err(FormatError::InvalidControlByte { offset, byte }),
        };

        Ok((command, command.encoded_len()))
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            Self::BackReference(_) => TOKEN_LEN,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_layout() {
        let token = BackReference {
            length: 6,
            from: 0x0104,
        };
        assert_eq!(token.encode(), [0x0a, 0x04, 0x01]);
        assert_eq!(BackReference::decode(&token.encode(), 0), Ok(token));
        assert_eq!(token.source(), 0x0104..0x010a);
    }

    #[test]
    fn truncated_token() {
        assert_eq!(
            BackReference::decode(&[0x0a, 0x04], 0),
            Err(FormatError::Truncated {
                offset: 2,
                expected: 1
            })
        );
        assert_eq!(
            Command::read(&[0x3a, 0x0a], 1),
            Err(FormatError::Truncated {
                offset: 2,
                expected: 2
            })
        );
    }

    #[test]
    fn decode_rejects_non_token_length() {
        assert_eq!(
            BackReference::decode(&[0x05, 0x00, 0x00], 0),
            Err(FormatError::InvalidTokenSize {
                offset: 0,
                length: 1
            })
        );
        assert_eq!(
            BackReference::decode(&[0x9f, 0x38, 0x00, 0x00], 1),
            Err(FormatError::InvalidTokenSize {
                offset: 1,
                length: 52
            })
        );
    }

    #[test]
    fn control_byte_priority() {
        assert_eq!(
            Command::read(&[0x9f], 0),
            Ok((
                Command::Latch {
                    register: 1,
                    data: 0x0f
                },
                1
            ))
        );
        assert_eq!(Command::read(&[0x7f], 0), Ok((Command::Data(0x3f), 1)));
        assert_eq!(Command::read(&[0x3d], 0), Ok((Command::Wait(5), 1)));
        assert_eq!(Command::read(&[0x00], 0), Ok((Command::End, 1)));
        assert_eq!(Command::read(&[0x01], 0), Ok((Command::Loop, 1)));
        assert_eq!(
            Command::read(&[0x05], 0),
            Err(FormatError::InvalidControlByte {
                offset: 0,
                byte: 0x05
            })
        );
    }
}
