pub mod board;
pub mod bootstrap;
pub mod cli;
pub mod coordinator;
pub mod drag;
pub mod logging;
pub mod registry;
pub mod session;
pub mod settings;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;
