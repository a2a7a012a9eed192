mod cbox;
mod client;
mod connection;
mod database;
mod driver;
mod extract;

pub(crate) use cbox::*;
pub use client::*;
pub use connection::*;
pub(crate) use database::*;
pub use driver::*;
