#![allow(dead_code)]

/// Tone periods for one octave starting at A4 (NTSC).
const NOTES: [u16; 8] = [254, 226, 202, 190, 169, 151, 134, 127];

/// Builds a valid command stream that resembles real music data: a few recurring bars
/// with the occasional random variation, so there is something to compress but not
/// everything repeats.
pub fn tune(bars: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    let mut random = move || {
        // xorshift
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let mut data = Vec::new();
    for bar in 0..bars {
        let pattern = bar % 3;

        for step in 0..8 {
            let note = NOTES[(step * (pattern + 1) + pattern) % NOTES.len()];
            let volume = (step % 4) as u8;

            data.push(0x80 | (note & 0x0f) as u8);
            data.push(0x40 | (note >> 4) as u8);
            data.push(0x90 | volume);

            if random() % 5 == 0 {
                data.push(0xe0 | (random() % 8) as u8);
                data.push(0xf0 | (random() % 16) as u8);
            }

            data.push(0x38 | (step % 3) as u8 + 1);
        }

        if bar % 8 == 7 {
            data.push(0x01);
        }
    }

    data.push(0x00);
    data
}

/// Random bytes restricted to commands that are not back-references.
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;

    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;

            match state % 3 {
                0 => 0x80 | (state >> 8) as u8,
                1 => 0x40 | ((state >> 8) as u8 & 0x3f),
                _ => 0x38 | ((state >> 8) as u8 & 0x07),
            }
        })
        .collect()
}

/// A handful of commands that share a lot of bytes, so repeats overlap each other.
const ECHO_COMMANDS: [u8; 5] = [0x01, 0x00, 0x9f, 0x41, 0x39];

/// Stream built by copying random earlier slices of itself, interleaved with single
/// commands. Blocks found in it tend to start inside or right after other blocks.
pub fn echoes(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    let mut random = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let mut data: Vec<u8> = Vec::with_capacity(len);
    while data.len() < len {
        if data.len() >= 8 && random() % 2 == 0 {
            let copy_len = 4 + (random() % 17) as usize;
            let from = (random() % (data.len() as u64 - 3)) as usize;
            data.extend_from_within(from..(from + copy_len).min(data.len()));
        } else {
            data.push(ECHO_COMMANDS[(random() % 5) as usize]);
        }
    }

    data.truncate(len);
    data
}
