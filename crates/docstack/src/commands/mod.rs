pub mod context;
pub mod names;
pub mod plan;
pub mod synth;
pub mod validate;
