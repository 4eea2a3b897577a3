//! Core normalization engine
//!
//! Pure per-file passes: character classification, byte/line repair, markup
//! de-escaping, and the driver that composes them. No disk I/O happens here.

pub mod byteline;
pub mod charmap;
pub mod deescape;
pub mod pipeline;
