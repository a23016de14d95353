mod common;

use psgpack::{compress, decompress, Command, Decompressor, FormatError};

#[test]
fn test_uncompressed_passes_through() -> anyhow::Result<()> {
    let src = common::tune(6, 11);
    assert_eq!(decompress(&src)?, src);

    assert_eq!(decompress(&[])?, Vec::<u8>::new());

    Ok(())
}

#[test]
fn test_expands_references() -> anyhow::Result<()> {
    // both references share a source, the second one only copies part of it
    let compressed = [
        0x9f, 0x80, 0x45, 0x39, 0x81, 0x46, 0x39, 0x0a, 0x01, 0x00, 0xbf, 0x08, 0x01, 0x00,
        0x00,
    ];
    let expected = [
        0x9f, 0x80, 0x45, 0x39, 0x81, 0x46, 0x39, 0x80, 0x45, 0x39, 0x81, 0x46, 0x39, 0xbf, 0x80,
        0x45, 0x39, 0x81, 0x00,
    ];

    assert_eq!(Decompressor::new(&compressed).decompress()?, expected);

    Ok(())
}

#[test]
fn test_truncated_reference() {
    let src = common::tune(12, 8);
    let compressed = compress(&src);

    let mut last = None;
    let mut offset = 0;
    while offset < compressed.len() {
        let (command, len) = Command::read(&compressed, offset).expect("valid command");
        if matches!(command, Command::BackReference(_)) {
            last = Some(offset);
        }
        offset += len;
    }
    let last = last.expect("compressed tune contains a back-reference");

    for missing in 1..=2 {
        let truncated = &compressed[..last + 3 - missing];
        assert_eq!(
            decompress(truncated),
            Err(FormatError::Truncated {
                offset: truncated.len(),
                expected: missing
            })
        );
    }

    assert_eq!(
        decompress(&[0x9f, 0x0a]),
        Err(FormatError::Truncated {
            offset: 2,
            expected: 2
        })
    );
}

#[test]
fn test_reference_out_of_bounds() {
    let src = [0x9f, 0x80, 0x45, 0x39, 0x37, 0x00, 0x00];

    assert_eq!(
        decompress(&src),
        Err(FormatError::SourceOutOfBounds {
            offset: 4,
            from: 0,
            end: 51
        })
    );
}
