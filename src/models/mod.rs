pub mod coaching;
pub mod daily_plan;
pub mod settings;
pub mod trade;

pub use coaching::*;
pub use daily_plan::*;
pub use settings::*;
pub use trade::*;
