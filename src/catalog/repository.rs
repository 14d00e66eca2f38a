//! Repository layer for catalog tables

use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;

use super::error::{CatalogError, map_category_delete, map_question_write};
use super::models::{
    AnswerOptionInput, AnswerOptionOut, Category, Difficulty, QuestionDetail, QuestionInput,
    QuestionListItem, Video, VideoInput,
};

/// Category CRUD
pub struct CategoryRepository;

impl CategoryRepository {
    pub async fn create(pool: &PgPool, name: &str) -> Result<Category, CatalogError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (category_name) VALUES ($1) RETURNING id, category_name",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(CatalogError::from_write)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Category>, CatalogError> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT id, category_name FROM categories ORDER BY id")
                .fetch_all(pool)
                .await?,
        )
    }

    pub async fn get(pool: &PgPool, id: i64) -> Result<Category, CatalogError> {
        sqlx::query_as::<_, Category>("SELECT id, category_name FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(CatalogError::CategoryNotFound)
    }

    pub async fn rename(pool: &PgPool, id: i64, name: &str) -> Result<(), CatalogError> {
        let result = sqlx::query("UPDATE categories SET category_name = $1 WHERE id = $2")
            .bind(name)
            .bind(id)
            .execute(pool)
            .await
            .map_err(CatalogError::from_write)?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::CategoryNotFound);
        }
        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(map_category_delete)?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::CategoryNotFound);
        }
        Ok(())
    }
}

/// Video CRUD
pub struct VideoRepository;

impl VideoRepository {
    pub async fn create(pool: &PgPool, input: &VideoInput) -> Result<Video, CatalogError> {
        Ok(sqlx::query_as::<_, Video>(
            r#"INSERT INTO videos (title, description, url) VALUES ($1, $2, $3)
               RETURNING id, title, description, url"#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.url)
        .fetch_one(pool)
        .await?)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Video>, CatalogError> {
        Ok(
            sqlx::query_as::<_, Video>("SELECT id, title, description, url FROM videos ORDER BY id")
                .fetch_all(pool)
                .await?,
        )
    }

    pub async fn get(pool: &PgPool, id: i64) -> Result<Video, CatalogError> {
        sqlx::query_as::<_, Video>("SELECT id, title, description, url FROM videos WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(CatalogError::VideoNotFound)
    }

    pub async fn update(pool: &PgPool, id: i64, input: &VideoInput) -> Result<(), CatalogError> {
        let result =
            sqlx::query("UPDATE videos SET title = $1, description = $2, url = $3 WHERE id = $4")
                .bind(&input.title)
                .bind(&input.description)
                .bind(&input.url)
                .bind(id)
                .execute(pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::VideoNotFound);
        }
        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::VideoNotFound);
        }
        Ok(())
    }
}

/// Questions and their answer options
pub struct QuestionRepository;

impl QuestionRepository {
    /// Questions with their options, optionally filtered by category name
    /// and difficulty.
    pub async fn list(
        pool: &PgPool,
        category: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<QuestionListItem>, CatalogError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT q.id, q.text FROM questions q");
        if category.is_some() {
            qb.push(" JOIN categories c ON c.id = q.category_id");
        }
        qb.push(" WHERE TRUE");
        if let Some(name) = category {
            qb.push(" AND c.category_name = ").push_bind(name);
        }
        if let Some(d) = difficulty {
            qb.push(" AND q.difficulty = ").push_bind(d.as_str());
        }
        qb.push(" ORDER BY q.id");

        let rows = qb.build().fetch_all(pool).await?;
        let mut questions = Vec::with_capacity(rows.len());
        for row in &rows {
            questions.push((row.try_get::<i64, _>("id")?, row.try_get::<String, _>("text")?));
        }
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = questions.iter().map(|(id, _)| *id).collect();
        let option_rows = sqlx::query(
            r#"SELECT id, text, question_id FROM answer_options
               WHERE question_id = ANY($1) ORDER BY id"#,
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut options: HashMap<i64, Vec<AnswerOptionOut>> = HashMap::new();
        for row in &option_rows {
            let question_id: i64 = row.try_get("question_id")?;
            options.entry(question_id).or_default().push(AnswerOptionOut {
                id: row.try_get::<i64, _>("id")?.to_string(),
                text: row.try_get("text")?,
            });
        }

        Ok(questions
            .into_iter()
            .map(|(id, text)| QuestionListItem {
                id: id.to_string(),
                text,
                image: None,
                options: options.remove(&id).unwrap_or_default(),
            })
            .collect())
    }

    pub async fn detail(pool: &PgPool, id: i64) -> Result<QuestionDetail, CatalogError> {
        let row = sqlx::query("SELECT id, text, explanation FROM questions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(CatalogError::QuestionNotFound)?;

        let correct: Option<i64> = sqlx::query_scalar(
            r#"SELECT id FROM answer_options
               WHERE question_id = $1 AND is_correct ORDER BY id LIMIT 1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        let Some(correct_option_id) = correct else {
            tracing::error!(question_id = id, "Question has no correct option");
            return Err(CatalogError::NoCorrectOption);
        };

        Ok(QuestionDetail {
            id: row.try_get::<i64, _>("id")?.to_string(),
            text: row.try_get("text")?,
            explanation: row.try_get("explanation")?,
            correct_option_id: correct_option_id.to_string(),
        })
    }

    /// Insert a question and its options in one transaction.
    pub async fn create(pool: &PgPool, input: &QuestionInput) -> Result<i64, CatalogError> {
        let mut tx = pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = $1")
            .bind(input.category_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(CatalogError::UnknownCategory(input.category_id));
        }

        let question_id: i64 = sqlx::query_scalar(
            r#"INSERT INTO questions (text, difficulty, explanation, category_id)
               VALUES ($1, $2, $3, $4) RETURNING id"#,
        )
        .bind(&input.text)
        .bind(input.difficulty.as_str())
        .bind(&input.explanation)
        .bind(input.category_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_question_write(input.category_id))?;

        insert_options(&mut tx, question_id, &input.answer_options).await?;
        tx.commit().await?;

        Ok(question_id)
    }

    /// Replace every field and the full option list of a question.
    pub async fn replace(pool: &PgPool, id: i64, input: &QuestionInput) -> Result<(), CatalogError> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            r#"UPDATE questions SET text = $1, difficulty = $2, explanation = $3, category_id = $4
               WHERE id = $5"#,
        )
        .bind(&input.text)
        .bind(input.difficulty.as_str())
        .bind(&input.explanation)
        .bind(input.category_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_question_write(input.category_id))?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::QuestionNotFound);
        }

        sqlx::query("DELETE FROM answer_options WHERE question_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_options(&mut tx, id, &input.answer_options).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Answer options go with the question (ON DELETE CASCADE).
    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::QuestionNotFound);
        }
        Ok(())
    }
}

async fn insert_options(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    question_id: i64,
    options: &[AnswerOptionInput],
) -> Result<(), sqlx::Error> {
    for opt in options {
        sqlx::query("INSERT INTO answer_options (text, is_correct, question_id) VALUES ($1, $2, $3)")
            .bind(&opt.text)
            .bind(opt.is_correct)
            .bind(question_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}
