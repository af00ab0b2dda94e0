pub mod import;
pub mod settings;
pub mod trades;

pub use import::*;
pub use settings::*;
pub use trades::*;
