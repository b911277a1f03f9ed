mod amount;
mod types;


pub use amount::*;
pub use types::*;
