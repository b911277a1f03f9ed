mod error;
mod model;
mod number;
mod reader;
mod records;
pub mod shape;
mod snapshot;


pub use error::*;
pub use model::*;
pub use number::*;
pub use reader::*;
pub use records::*;
pub use snapshot::*;


pub use serde_json::Value as JsonValue;
