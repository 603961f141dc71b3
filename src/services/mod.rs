pub mod block_builder;
pub mod block_planner;
pub mod constraint_checker;
pub mod deduplicator;
pub mod generation_cache;
pub mod generation_client;
pub mod question_validator;
pub mod set_orchestrator;
pub mod text_normalizer;
