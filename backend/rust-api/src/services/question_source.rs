use anyhow::Context;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::{Collection, Database};

use crate::errors::GameError;
use crate::metrics::track_db_operation;
use crate::models::question::{Question, QUESTION_LEVELS};

pub const QUESTIONS_COLLECTION: &str = "questions";

/// Upper bound on candidates pulled per level; the factory picks one of them.
const CANDIDATES_PER_LEVEL: i64 = 32;

#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Candidate questions for one difficulty level. Empty if there are none.
    async fn questions_at_level(&self, level: u8) -> Result<Vec<Question>, GameError>;
}

pub struct MongoQuestionSource {
    questions: Collection<Document>,
}

impl MongoQuestionSource {
    pub fn new(db: &Database) -> Self {
        Self {
            questions: db.collection::<Document>(QUESTIONS_COLLECTION),
        }
    }
}

/// Reads a question document, accepting both ObjectId and string `_id`s.
fn question_from_document(mut document: Document) -> anyhow::Result<Question> {
    let id = match document.get("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(value)) => value.clone(),
        _ => anyhow::bail!("Question has unsupported _id type"),
    };
    document.insert("_id", id);

    bson::from_document(document).context("Malformed question document")
}

#[async_trait]
impl QuestionSource for MongoQuestionSource {
    async fn questions_at_level(&self, level: u8) -> Result<Vec<Question>, GameError> {
        let documents = track_db_operation("aggregate", QUESTIONS_COLLECTION, async {
            let pipeline = vec![
                doc! { "$match": { "level": i32::from(level) } },
                doc! { "$sample": { "size": CANDIDATES_PER_LEVEL } },
            ];

            let mut cursor = self
                .questions
                .aggregate(pipeline)
                .await
                .context("Failed to query questions")?;

            let mut documents = Vec::new();
            while let Some(document) = cursor
                .try_next()
                .await
                .context("Failed to iterate questions")?
            {
                documents.push(document);
            }
            Ok(documents)
        })
        .await?;

        let mut questions = Vec::with_capacity(documents.len());
        for document in documents {
            match question_from_document(document) {
                Ok(question) if question.is_well_formed() && question.level == level => {
                    questions.push(question)
                }
                Ok(question) => {
                    tracing::warn!(question_id = %question.id, level, "Skipping malformed question")
                }
                Err(e) => tracing::warn!(level, "Skipping unreadable question: {:#}", e),
            }
        }

        Ok(questions)
    }
}

/// Fixed question bank held in memory.
pub struct InMemoryQuestionSource {
    questions: Vec<Question>,
}

impl InMemoryQuestionSource {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// `per_level` synthetic questions for every level. The correct answer
    /// cycles through the four slots.
    pub fn generated(per_level: usize) -> Self {
        let questions = QUESTION_LEVELS
            .flat_map(|level| {
                (0..per_level).map(move |n| Question {
                    id: format!("generated-{}-{}", level, n),
                    level,
                    text: format!("Question {} for level {}", n + 1, level),
                    answer1: format!("Answer 1 ({}/{})", level, n),
                    answer2: format!("Answer 2 ({}/{})", level, n),
                    answer3: format!("Answer 3 ({}/{})", level, n),
                    answer4: format!("Answer 4 ({}/{})", level, n),
                    correct_answer: (n % 4) as u8 + 1,
                })
            })
            .collect();

        Self { questions }
    }
}

#[async_trait]
impl QuestionSource for InMemoryQuestionSource {
    async fn questions_at_level(&self, level: u8) -> Result<Vec<Question>, GameError> {
        Ok(self
            .questions
            .iter()
            .filter(|question| question.level == level && question.is_well_formed())
            .cloned()
            .collect())
    }
}
