pub mod diagnostics;
pub mod fallback;
pub mod health;
pub mod presence;

pub use diagnostics::*;
pub use fallback::*;
pub use health::*;
pub use presence::*;
