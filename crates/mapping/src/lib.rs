mod cache;
mod config;
pub mod correlate;
mod entity;
pub mod epoch;
mod mapper;
pub mod nominator;
pub mod share_price;
mod store;


pub use cache::*;
pub use config::*;
pub use entity::*;
pub use mapper::*;
pub use store::*;
