mod errors;
mod lifecycle;
mod mock;
mod simple;
mod transaction;

use crate::{errors::errors, lifecycle::lifecycle, simple::simple, transaction::transaction};
use log::LevelFilter;
use sluice_core::{Config, Driver};
use std::env;

pub use mock::*;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Runs the driver independent suite. Each scenario uses its own adapter built with `make`.
pub async fn execute_tests<D: Driver, F: Fn() -> D>(make: F, config: Config) {
    lifecycle(make(), &config).await;
    simple(make(), &config).await;
    errors(make(), &config).await;
    transaction(make(), &config).await;
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
