//! Test utilities for pipeline tests.

pub mod mock_generator;

#[allow(unused_imports)]
pub use mock_generator::{FixedPicker, MockGenerator, MockResponse};

/// Alternating `A`/`B` turns, each `chars` characters of text ending in `。`,
/// separated by blank lines. No closing line.
#[allow(dead_code)]
pub fn dialogue(turns: usize, chars: usize) -> String {
    (0..turns)
        .map(|i| {
            let speaker = if i % 2 == 0 { "A" } else { "B" };
            format!("{speaker}: {}。", "ネ".repeat(chars.saturating_sub(1)))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
