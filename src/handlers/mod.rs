pub mod health_handler;
pub mod quiz_handler;

pub use health_handler::{health_check, root};
pub use quiz_handler::start_quiz;
