//! Test utilities for HTTP tests.

pub mod mock_generator;

#[allow(unused_imports)]
pub use mock_generator::{FixedPicker, MockGenerator, MockResponse};

/// A titled, in-band script for a 350-character target: 339 characters
/// of body including the closing line.
#[allow(dead_code)]
pub fn titled_script() -> String {
    let turns: Vec<String> = (0..10)
        .map(|i| {
            let speaker = if i % 2 == 0 { "A" } else { "B" };
            format!("{speaker}: {}。", "ネ".repeat(27))
        })
        .collect();
    format!("【満員電車】\n\n{}\n\nB: もういいよ！", turns.join("\n\n"))
}
