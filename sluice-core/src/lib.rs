mod adapter;
mod as_value;
mod bridge;
mod config;
mod driver;
mod error;
mod persistence;
mod query;
mod shape;
mod util;
mod value;

pub use ::anyhow::Context;
pub use adapter::*;
pub use as_value::*;
pub use bridge::*;
pub use config::*;
pub use driver::*;
pub use error::*;
pub use persistence::*;
pub use query::*;
pub use shape::*;
pub use util::*;
pub use value::*;
pub mod future {
    pub use ::futures::future::*;
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type Error = anyhow::Error;
