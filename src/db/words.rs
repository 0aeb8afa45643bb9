use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::StoreError;

/// Tag / level-name filters for candidate resolution. Empty vectors mean
/// "no constraint on that axis".
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub tag_ids: Vec<Uuid>,
    pub level_name_ids: Vec<Uuid>,
}

/// A label carries both supported translations; display language is
/// resolved at the DTO layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelText {
    pub en: String,
    pub fr: String,
}

impl LabelText {
    pub fn text(&self, lang: &str) -> &str {
        match lang {
            "fr" => &self.fr,
            _ => &self.en,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LevelRecord {
    pub category: LabelText,
    pub names: Vec<LabelText>,
}

#[derive(Debug, Clone, Default)]
pub struct WordRecord {
    pub id: Uuid,
    pub kanji: String,
    pub yomi: String,
    pub yomi_type: String,
    pub image_url: String,
    pub translation: LabelText,
    pub tags: Vec<LabelText>,
    pub levels: Vec<LevelRecord>,
}

/// Read-only catalog collaborator. Resolution is unfiltered by user; a
/// word deleted between the filter query and a later read is tolerated by
/// callers as simply absent.
#[async_trait]
pub trait WordCatalog: Send + Sync {
    async fn candidate_word_ids(&self, filter: &CandidateFilter) -> Result<Vec<Uuid>, StoreError>;

    async fn words_by_ids(&self, ids: &[Uuid]) -> Result<Vec<WordRecord>, StoreError>;
}

pub struct PgWordCatalog {
    pool: PgPool,
}

impl PgWordCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WordCatalog for PgWordCatalog {
    async fn candidate_word_ids(&self, filter: &CandidateFilter) -> Result<Vec<Uuid>, StoreError> {
        let rows = match (filter.tag_ids.is_empty(), filter.level_name_ids.is_empty()) {
            (true, true) => {
                sqlx::query(r#"SELECT "id" FROM "words""#)
                    .fetch_all(&self.pool)
                    .await?
            }
            (false, true) => {
                sqlx::query(
                    r#"
                    SELECT DISTINCT w."id"
                    FROM "words" w
                    JOIN "word_tag" wt ON wt."word_id" = w."id"
                    WHERE wt."label_id" = ANY($1)
                    "#,
                )
                .bind(&filter.tag_ids)
                .fetch_all(&self.pool)
                .await?
            }
            (true, false) => {
                sqlx::query(
                    r#"
                    SELECT DISTINCT w."id"
                    FROM "words" w
                    JOIN "word_level" wl ON wl."word_id" = w."id"
                    JOIN "level_values" lv ON lv."level_id" = wl."level_id"
                    WHERE lv."label_id" = ANY($1)
                    "#,
                )
                .bind(&filter.level_name_ids)
                .fetch_all(&self.pool)
                .await?
            }
            (false, false) => {
                sqlx::query(
                    r#"
                    SELECT DISTINCT w."id"
                    FROM "words" w
                    JOIN "word_tag" wt ON wt."word_id" = w."id"
                    JOIN "word_level" wl ON wl."word_id" = w."id"
                    JOIN "level_values" lv ON lv."level_id" = wl."level_id"
                    WHERE wt."label_id" = ANY($1) AND lv."label_id" = ANY($2)
                    "#,
                )
                .bind(&filter.tag_ids)
                .bind(&filter.level_name_ids)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    async fn words_by_ids(&self, ids: &[Uuid]) -> Result<Vec<WordRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let word_rows = sqlx::query(
            r#"
            SELECT w."id", w."kanji", w."yomi", w."yomi_type", w."image_url",
                   t."en" AS "translation_en", t."fr" AS "translation_fr"
            FROM "words" w
            LEFT JOIN "labels" t ON t."id" = w."translation_id"
            WHERE w."id" = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut words: HashMap<Uuid, WordRecord> = word_rows
            .iter()
            .map(|row| {
                let record = map_word_row(row);
                (record.id, record)
            })
            .collect();

        let tag_rows = sqlx::query(
            r#"
            SELECT wt."word_id", l."en", l."fr"
            FROM "word_tag" wt
            JOIN "labels" l ON l."id" = wt."label_id"
            WHERE wt."word_id" = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &tag_rows {
            let word_id: Uuid = row.get("word_id");
            if let Some(word) = words.get_mut(&word_id) {
                word.tags.push(LabelText {
                    en: row.get("en"),
                    fr: row.get("fr"),
                });
            }
        }

        let level_rows = sqlx::query(
            r#"
            SELECT wl."word_id", wl."level_id",
                   c."en" AS "category_en", c."fr" AS "category_fr",
                   n."en" AS "name_en", n."fr" AS "name_fr"
            FROM "word_level" wl
            JOIN "levels" lv ON lv."id" = wl."level_id"
            JOIN "labels" c ON c."id" = lv."category_id"
            JOIN "level_values" lvv ON lvv."level_id" = lv."id"
            JOIN "labels" n ON n."id" = lvv."label_id"
            WHERE wl."word_id" = ANY($1)
            ORDER BY wl."word_id", wl."level_id"
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &level_rows {
            let word_id: Uuid = row.get("word_id");
            let Some(word) = words.get_mut(&word_id) else {
                continue;
            };

            let category = LabelText {
                en: row.get("category_en"),
                fr: row.get("category_fr"),
            };
            let name = LabelText {
                en: row.get("name_en"),
                fr: row.get("name_fr"),
            };

            match word.levels.iter_mut().find(|lv| lv.category == category) {
                Some(level) => level.names.push(name),
                None => word.levels.push(LevelRecord {
                    category,
                    names: vec![name],
                }),
            }
        }

        // Preserve the caller's id order; ids without a catalog row are
        // silently skipped.
        Ok(ids.iter().filter_map(|id| words.remove(id)).collect())
    }
}

fn map_word_row(row: &PgRow) -> WordRecord {
    WordRecord {
        id: row.get("id"),
        kanji: row.get("kanji"),
        yomi: row.get("yomi"),
        yomi_type: row.get("yomi_type"),
        image_url: row.get("image_url"),
        translation: LabelText {
            en: row.try_get("translation_en").unwrap_or_default(),
            fr: row.try_get("translation_fr").unwrap_or_default(),
        },
        tags: Vec::new(),
        levels: Vec::new(),
    }
}
