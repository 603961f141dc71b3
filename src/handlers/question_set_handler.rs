use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::request::GenerateQuestionSetRequest,
    models::dto::response::QuestionSetResponse,
};

#[post("/api/question-sets/generate")]
async fn generate_question_set(
    state: web::Data<AppState>,
    request: web::Json<GenerateQuestionSetRequest>,
) -> Result<HttpResponse, AppError> {
    let result = state.orchestrator.generate(&request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(QuestionSetResponse::from(result)))
}

#[get("/api/question-sets/{id}")]
async fn get_question_set(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let set = state
        .question_set_repository
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("question set {} not found", id)))?;
    Ok(HttpResponse::Ok().json(set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use crate::config::Config;
    use crate::errors::AppResult;
    use crate::models::domain::question::AnswerLetter;
    use crate::models::domain::question_set::QuestionSet;
    use crate::models::dto::upstream::{CandidateQuestion, GenerationPayload};
    use crate::repositories::QuestionSetRepository;
    use crate::services::{
        block_builder::BlockBuilder,
        constraint_checker::{ConstraintChecker, KeywordWordProblemClassifier},
        generation_cache::GenerationCache,
        generation_client::MockGenerationClient,
        set_orchestrator::SetOrchestrator,
    };

    struct InMemoryRepository {
        sets: RwLock<HashMap<String, QuestionSet>>,
    }

    #[async_trait]
    impl QuestionSetRepository for InMemoryRepository {
        async fn find_by_id(&self, id: &str) -> AppResult<Option<QuestionSet>> {
            Ok(self.sets.read().await.get(id).cloned())
        }

        async fn insert(&self, set: QuestionSet) -> AppResult<QuestionSet> {
            self.sets.write().await.insert(set.id.clone(), set.clone());
            Ok(set)
        }

        async fn update(&self, set: QuestionSet) -> AppResult<QuestionSet> {
            self.sets.write().await.insert(set.id.clone(), set.clone());
            Ok(set)
        }
    }

    fn word_problem_payload(call_index: usize, item_count: usize) -> GenerationPayload {
        let nouns = ["bakery", "harbor", "orchard", "stadium", "library", "market"];
        let questions = (0..item_count)
            .map(|i| CandidateQuestion {
                question: format!(
                    "A {} sold 40 tickets at 5 dollars each; what was the total cost?",
                    nouns[(call_index * item_count + i) % nouns.len()]
                ),
                options: vec![
                    "100 dollars".into(),
                    "200 dollars".into(),
                    "300 dollars".into(),
                    "400 dollars".into(),
                ],
                correct_answer: Some(AnswerLetter::B),
                explanation: "Multiply the count by the price.".into(),
                explanation_incorrect: BTreeMap::new(),
                strategy_tip: None,
                difficulty: None,
                skill_category: Some("Heart of Algebra".into()),
                passage: None,
            })
            .collect();
        GenerationPayload {
            passage: None,
            questions,
        }
    }

    fn state_with_client(client: MockGenerationClient) -> AppState {
        let repository: Arc<dyn QuestionSetRepository> = Arc::new(InMemoryRepository {
            sets: RwLock::new(HashMap::new()),
        });
        let orchestrator = Arc::new(SetOrchestrator::new(
            BlockBuilder::new(Arc::new(client)),
            ConstraintChecker::new(Arc::new(KeywordWordProblemClassifier)),
            Arc::new(GenerationCache::new(4)),
            repository.clone(),
        ));
        AppState {
            orchestrator,
            question_set_repository: repository,
            config: Arc::new(Config::test_config()),
        }
    }

    #[actix_rt::test]
    async fn generate_endpoint_returns_a_question_set() {
        let mut client = MockGenerationClient::new();
        let counter = AtomicUsize::new(0);
        client.expect_generate().returning(move |call| {
            let index = counter.fetch_add(1, Ordering::SeqCst);
            Ok(word_problem_payload(index, call.item_count))
        });

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with_client(client)))
                .service(generate_question_set),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/api/question-sets/generate")
            .set_json(serde_json::json!({
                "section": "math",
                "question_count": 5
            }))
            .to_request();

        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["questions"].as_array().map(Vec::len), Some(5));
        assert_eq!(body["outcome"]["kind"], "strict");
        assert!(body["id"].as_str().is_some());
    }

    #[actix_rt::test]
    async fn generate_endpoint_rejects_invalid_counts() {
        let mut client = MockGenerationClient::new();
        client.expect_generate().never();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with_client(client)))
                .service(generate_question_set),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/api/question-sets/generate")
            .set_json(serde_json::json!({
                "section": "math",
                "question_count": 0
            }))
            .to_request();

        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn get_endpoint_returns_not_found_for_unknown_id() {
        let client = MockGenerationClient::new();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state_with_client(client)))
                .service(get_question_set),
        )
        .await;

        let request = test::TestRequest::get()
            .uri("/api/question-sets/absent-id")
            .to_request();

        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
