use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::QuestionSet};

#[async_trait]
pub trait QuestionSetRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuestionSet>>;
    async fn insert(&self, set: QuestionSet) -> AppResult<QuestionSet>;
    async fn update(&self, set: QuestionSet) -> AppResult<QuestionSet>;
}

pub struct MongoQuestionSetRepository {
    collection: Collection<QuestionSet>,
}

impl MongoQuestionSetRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for question sets collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;

        log::info!("Successfully created indexes for question sets collection");
        Ok(())
    }
}

#[async_trait]
impl QuestionSetRepository for MongoQuestionSetRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuestionSet>> {
        let set = self.collection.find_one(doc! { "id": id }).await?;
        Ok(set)
    }

    async fn insert(&self, set: QuestionSet) -> AppResult<QuestionSet> {
        self.collection.insert_one(&set).await?;
        Ok(set)
    }

    async fn update(&self, set: QuestionSet) -> AppResult<QuestionSet> {
        self.collection
            .replace_one(doc! { "id": &set.id }, &set)
            .await?;
        Ok(set)
    }
}
