pub mod settings;
pub mod trade;

pub use settings::*;
pub use trade::*;
