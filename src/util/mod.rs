//! Small text helpers shared by the feed parser and the binary.

mod text;

pub use text::{clean_title, strip_control_chars};
