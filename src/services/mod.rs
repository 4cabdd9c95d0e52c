pub mod answer_resolver;
pub mod chain_controller;
pub mod heuristic_resolvers;
pub mod model_service;
pub mod page_fetcher;
pub mod submission_client;
pub mod task_classifier;
