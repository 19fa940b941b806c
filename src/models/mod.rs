//! Data entities carried through the pipeline.

pub mod datum;

pub use datum::Datum;
