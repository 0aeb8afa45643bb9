use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::db::words::{WordCatalog, WordRecord};
use crate::services::ServiceError;

pub const DEFAULT_LANG: &str = "en";

/// Client-facing word shape: labels flattened to the requested language.
#[derive(Debug, Clone, Serialize)]
pub struct WordDto {
    pub id: Uuid,
    pub kanji: String,
    pub yomi: String,
    #[serde(rename = "yomiType")]
    pub yomi_type: String,
    pub image_url: String,
    pub translation: String,
    pub tags: Vec<String>,
    pub levels: Vec<LevelDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDto {
    pub category: String,
    pub level_names: Vec<String>,
}

pub struct WordDtoService {
    catalog: Arc<dyn WordCatalog>,
}

impl WordDtoService {
    pub fn new(catalog: Arc<dyn WordCatalog>) -> Self {
        Self { catalog }
    }

    /// Hydrates ids into DTOs, preserving id order. Ids that no longer
    /// exist in the catalog are skipped.
    pub async fn list_words(&self, ids: &[Uuid], lang: &str) -> Result<Vec<WordDto>, ServiceError> {
        let records = self.catalog.words_by_ids(ids).await?;
        Ok(records
            .into_iter()
            .map(|record| map_word_dto(record, lang))
            .collect())
    }

    pub async fn read_word(&self, id: Uuid, lang: &str) -> Result<Option<WordDto>, ServiceError> {
        let mut words = self.list_words(&[id], lang).await?;
        Ok(if words.is_empty() {
            None
        } else {
            Some(words.swap_remove(0))
        })
    }
}

fn map_word_dto(record: WordRecord, lang: &str) -> WordDto {
    WordDto {
        id: record.id,
        kanji: record.kanji,
        yomi: record.yomi,
        yomi_type: record.yomi_type,
        image_url: record.image_url,
        translation: record.translation.text(lang).to_string(),
        tags: record
            .tags
            .iter()
            .map(|tag| tag.text(lang).to_string())
            .collect(),
        levels: record
            .levels
            .iter()
            .map(|level| LevelDto {
                category: level.category.text(lang).to_string(),
                level_names: level
                    .names
                    .iter()
                    .map(|name| name.text(lang).to_string())
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{CatalogEntry, MemoryWordCatalog};
    use crate::db::words::{LabelText, LevelRecord};

    fn sample_entry(id: Uuid) -> CatalogEntry {
        CatalogEntry {
            record: WordRecord {
                id,
                kanji: "水".to_string(),
                yomi: "みず".to_string(),
                yomi_type: "KUNYOMI".to_string(),
                image_url: String::new(),
                translation: LabelText {
                    en: "water".to_string(),
                    fr: "eau".to_string(),
                },
                tags: vec![LabelText {
                    en: "nature".to_string(),
                    fr: "nature".to_string(),
                }],
                levels: vec![LevelRecord {
                    category: LabelText {
                        en: "JLPT".to_string(),
                        fr: "JLPT".to_string(),
                    },
                    names: vec![LabelText {
                        en: "N5".to_string(),
                        fr: "N5".to_string(),
                    }],
                }],
            },
            ..CatalogEntry::default()
        }
    }

    #[tokio::test]
    async fn labels_resolve_for_the_requested_language() {
        let id = Uuid::new_v4();
        let service = WordDtoService::new(Arc::new(MemoryWordCatalog::new(vec![sample_entry(id)])));

        let english = service.read_word(id, "en").await.unwrap().unwrap();
        assert_eq!(english.translation, "water");

        let french = service.read_word(id, "fr").await.unwrap().unwrap();
        assert_eq!(french.translation, "eau");

        // Unknown languages fall back to English.
        let fallback = service.read_word(id, "de").await.unwrap().unwrap();
        assert_eq!(fallback.translation, "water");
    }

    #[tokio::test]
    async fn missing_words_are_skipped() {
        let id = Uuid::new_v4();
        let service = WordDtoService::new(Arc::new(MemoryWordCatalog::new(vec![sample_entry(id)])));

        let words = service
            .list_words(&[Uuid::new_v4(), id], DEFAULT_LANG)
            .await
            .unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].id, id);

        let absent = service.read_word(Uuid::new_v4(), DEFAULT_LANG).await.unwrap();
        assert!(absent.is_none());
    }

    #[tokio::test]
    async fn dto_carries_tags_and_levels() {
        let id = Uuid::new_v4();
        let service = WordDtoService::new(Arc::new(MemoryWordCatalog::new(vec![sample_entry(id)])));

        let word = service.read_word(id, DEFAULT_LANG).await.unwrap().unwrap();
        assert_eq!(word.tags, vec!["nature".to_string()]);
        assert_eq!(word.levels.len(), 1);
        assert_eq!(word.levels[0].category, "JLPT");
        assert_eq!(word.levels[0].level_names, vec!["N5".to_string()]);
    }
}
