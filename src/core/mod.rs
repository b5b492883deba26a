pub mod config;
pub mod error;
pub mod routes;
pub mod startup;
pub mod state;
#[cfg(test)]
pub mod test_support;
pub mod tracing_init;
