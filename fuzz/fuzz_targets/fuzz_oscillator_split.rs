//! Fuzz target: `Oscillator::fill`
//!
//! Splits one audio request at arbitrary frame boundaries and asserts that the
//! pieces concatenate to exactly the bytes of a single request.
//!
//! cargo fuzz run fuzz_oscillator_split

#![no_main]

use btserver::oscillator::Oscillator;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&tone, cuts)) = data.split_first() else {
        return;
    };
    let tone_hz = 20 + u32::from(tone) * 70;
    let sizes: Vec<usize> = cuts.iter().map(|c| usize::from(*c) & !3).collect();
    let total: usize = sizes.iter().sum();

    let mut whole = vec![0u8; total];
    Oscillator::new(tone_hz, 44_100, 8_000).fill(&mut whole);

    let mut osc = Oscillator::new(tone_hz, 44_100, 8_000);
    let mut joined = Vec::with_capacity(total);
    for size in sizes {
        let mut part = vec![0u8; size];
        osc.fill(&mut part);
        joined.extend_from_slice(&part);
    }
    assert_eq!(whole, joined);
});
