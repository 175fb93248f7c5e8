pub mod health;
pub mod diagnostics;

pub use health::*;
pub use diagnostics::*;
