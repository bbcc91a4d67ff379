//! Ready-made experiments.

mod uncoded;

pub use uncoded::UncodedAwgn;
