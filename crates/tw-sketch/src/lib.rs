//! Sliding-window Top-K sketch.
//!
//! This crate provides the probabilistic frequency structure behind topwatch:
//! - A count-min grid with heavy-keeper decay: colliding items probabilistically
//!   erode a bucket's counter before they can claim it, so heavy hitters keep
//!   their buckets while one-off items wash out.
//! - Per-bucket rings of per-tick counts, so estimates cover only the last
//!   `window` of time and expire as the window slides.
//! - A bounded min-heap of the current Top-K candidates.
//! - A thin sliding shell that converts timestamps into tick advances.
//!
//! The structure never fails on input and never allocates per event beyond
//! Top-K candidate strings. Memory is fixed at `depth x width` buckets of
//! `window / tick` slots each, plus the heap.

pub mod hash;
pub mod heap;
pub mod sketch;
pub mod sliding;

pub use heap::{TopItem, TopKHeap};
pub use sketch::{Sketch, SketchParams};
pub use sliding::SlidingTopK;
