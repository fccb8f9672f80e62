//! Recipe parsing and interpretation

pub mod chunks;
pub mod interp;
pub mod literal;

pub use chunks::chunks;
pub use interp::Interpreter;
