pub mod condition;
pub mod headers;
mod helper;
pub mod transport;

#[cfg(test)]
mod stub;

pub use condition::{evaluate, Error};

#[cfg(test)]
pub(crate) fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
