pub mod aggregate;
pub mod equity;

pub use aggregate::*;
pub use equity::*;
