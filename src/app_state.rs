use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{MongoQuestionSetRepository, QuestionSetRepository},
    services::{
        block_builder::BlockBuilder,
        constraint_checker::{ConstraintChecker, KeywordWordProblemClassifier},
        generation_cache::GenerationCache,
        generation_client::OpenAiGenerationClient,
        set_orchestrator::SetOrchestrator,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SetOrchestrator>,
    pub question_set_repository: Arc<dyn QuestionSetRepository>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let repository = Arc::new(MongoQuestionSetRepository::new(
            &db,
            &config.question_sets_collection,
        ));
        repository.ensure_indexes().await?;
        let repository: Arc<dyn QuestionSetRepository> = repository;

        let client = Arc::new(OpenAiGenerationClient::new(&config));
        let builder = BlockBuilder::new(client);
        let checker = ConstraintChecker::new(Arc::new(KeywordWordProblemClassifier));
        let cache = Arc::new(GenerationCache::new(config.cache_capacity));

        let orchestrator = Arc::new(SetOrchestrator::new(
            builder,
            checker,
            cache,
            repository.clone(),
        ));

        Ok(Self {
            orchestrator,
            question_set_repository: repository,
            config: Arc::new(config),
        })
    }
}
