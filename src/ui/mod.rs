//! Terminal presentation helpers.

mod colors;

pub use colors::{Paint, Theme};
