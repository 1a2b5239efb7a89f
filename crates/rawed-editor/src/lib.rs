//! # rawed-editor: editor core for rawed
//!
//! Everything the editor knows about text, independent of the terminal:
//!
//! - **[`position`]**: `Position` (line, col), 0-indexed
//! - **[`buffer`]**: `Buffer` wrapping a rope, with file load/save
//! - **[`cursor`]**: the cursor model; every edit goes through it
//! - **[`highlight`]**: keyword and string coloring with SGR markers
//! - **[`clipboard`]**: system clipboard through helper programs
//! - **[`error`]**: typed file errors

pub mod buffer;
pub mod clipboard;
pub mod cursor;
pub mod error;
pub mod highlight;
pub mod position;
