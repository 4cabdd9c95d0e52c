pub mod app_state;
pub mod config;
pub mod constants;
pub mod errors;
pub mod handlers;
pub mod mock_server;
pub mod models;
pub mod services;

#[cfg(test)]
pub mod test_utils;
