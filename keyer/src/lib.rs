//! Chroma-key background removal for short clips turned into frame sequences.
//!
//! [`detect`] guesses the background colour from the border of the first
//! frame, [`chroma`] keys it out of each frame, and [`pipeline`] runs both
//! across a clip. [`source`] and [`export`] move frames to and from disk.

pub mod chroma;
pub mod detect;
pub mod export;
pub mod pick;
pub mod pipeline;
pub mod source;
