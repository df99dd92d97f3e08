//! # Meilisearch
//!
//! Search engine fronting the excursion catalogue, reached only through
//! this backend.
//!
//! ## Schema
//! - One index for all excursions
//! - Localized name/short_description plus duration, price, category,
//!   featured
//!
//! ## Sync
//! Startup seeds the index from the Redis store and waits for indexing.
//! Admin mutations upsert or delete the matching document without waiting;
//! the index may lag the store by a moment, which is acceptable for a
//! search affordance.
//!
//! ## Queries
//! A query searches only the active language's fields
//! (`attributes_to_search_on`), capped at [`MAX_RESULTS`] hits. Hit order
//! is whatever the engine's ranking produces.

use std::sync::Arc;

use async_trait::async_trait;
use meilisearch_sdk::{
    client::Client,
    errors::Error,
    settings::{MinWordSizeForTypos, Settings, TypoToleranceSettings},
};
use serde::{Deserialize, Serialize};

use crate::{
    dispatcher::SearchBackend,
    error::AppError,
    models::{Excursion, Language, Localized},
};

pub const EXCURSION_INDEX: &str = "excursions";
pub const EXCURSION_ID: &str = "id";

/// Hard cap on hits per query.
pub const MAX_RESULTS: usize = 5;

/// Decorative rating shown next to every hit. The site has no review
/// system; the ornament is fixed.
pub const DISPLAY_RATING: f32 = 4.8;

/// The slice of an excursion the search engine indexes.
#[derive(Serialize, Deserialize)]
pub struct ExcursionDocument {
    pub id: u32,
    pub name: Localized,
    pub short_description: Localized,
    pub duration: String,
    pub price: f64,
    pub category: String,
    pub featured: bool,
}

impl ExcursionDocument {
    pub fn from_record(excursion: &Excursion) -> Self {
        Self {
            id: excursion.id,
            name: excursion.name.clone(),
            short_description: excursion.short_description.clone(),
            duration: excursion.duration.clone(),
            price: excursion.price,
            category: excursion.category.clone(),
            featured: excursion.featured,
        }
    }
}

/// One autocomplete hit, already resolved to the active language.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: u32,
    pub name: String,
    pub short_description: String,
    pub duration: String,
    pub price: f64,
    pub rating: f32,
}

impl SearchHit {
    fn from_document(doc: ExcursionDocument, language: Language) -> Self {
        Self {
            id: doc.id,
            name: doc.name.get(language).to_string(),
            short_description: doc.short_description.get(language).to_string(),
            duration: doc.duration,
            price: doc.price,
            rating: DISPLAY_RATING,
        }
    }
}

pub async fn init_meilisearch(
    meili_url: &str,
    meili_admin_key: &str,
    excursions: &[Excursion],
) -> Arc<Client> {
    let meili_client = Arc::new(Client::new(meili_url, Some(meili_admin_key)).unwrap());

    meili_client
        .index(EXCURSION_INDEX)
        .set_settings(&init_settings())
        .await
        .unwrap();

    seed_excursions(&meili_client, excursions).await;

    meili_client
}

/// Full reseed from the store, waiting for the engine to finish indexing.
pub async fn seed_excursions(meili_client: &Arc<Client>, excursions: &[Excursion]) {
    let documents: Vec<ExcursionDocument> =
        excursions.iter().map(ExcursionDocument::from_record).collect();

    let _result = meili_client
        .index(EXCURSION_INDEX)
        .add_or_update(&documents, Some(EXCURSION_ID))
        .await
        .unwrap()
        .wait_for_completion(meili_client, None, None)
        .await
        .unwrap();

    #[cfg(feature = "verbose")]
    println!("Meili seed result: {:?}", _result);
}

pub async fn upsert_excursion(meili_client: &Client, excursion: &Excursion) -> Result<(), Error> {
    let document = ExcursionDocument::from_record(excursion);

    meili_client
        .index(EXCURSION_INDEX)
        .add_or_update(&[document], Some(EXCURSION_ID))
        .await?;

    Ok(())
}

pub async fn remove_excursion(meili_client: &Client, id: u32) -> Result<(), Error> {
    meili_client
        .index(EXCURSION_INDEX)
        .delete_document(id)
        .await?;

    Ok(())
}

pub async fn search_excursions(
    meili_client: &Client,
    query: &str,
    language: Language,
    limit: usize,
) -> Result<Vec<SearchHit>, Error> {
    let name_field = format!("name.{}", language.as_str());
    let description_field = format!("short_description.{}", language.as_str());
    let attributes = [name_field.as_str(), description_field.as_str()];

    let index = meili_client.index(EXCURSION_INDEX);
    let results = index
        .search()
        .with_query(query)
        .with_limit(limit)
        .with_attributes_to_search_on(&attributes)
        .execute::<ExcursionDocument>()
        .await?;

    Ok(results
        .hits
        .into_iter()
        .map(|hit| SearchHit::from_document(hit.result, language))
        .collect())
}

fn init_settings() -> Settings {
    Settings::new()
        .with_ranking_rules([
            "words",
            "typo",
            "proximity",
            "exactness",
            "attribute",
            "sort",
        ])
        .with_searchable_attributes([
            "name.en",
            "name.es",
            "name.ru",
            "short_description.en",
            "short_description.es",
            "short_description.ru",
        ])
        .with_filterable_attributes(["category", "featured"])
        .with_sortable_attributes(["price"])
        .with_typo_tolerance(TypoToleranceSettings {
            enabled: Some(true),
            disable_on_attributes: None,
            disable_on_words: None,
            min_word_size_for_typos: Some(MinWordSizeForTypos {
                one_typo: Some(5),
                two_typos: Some(9),
            }),
        })
}

/// Production search backend for the dispatcher: the same limit-5 localized
/// query the `/search` route serves.
pub struct MeiliBackend {
    pub client: Arc<Client>,
}

#[async_trait]
impl SearchBackend for MeiliBackend {
    async fn search(
        &self,
        query: &str,
        language: Language,
        limit: usize,
    ) -> Result<Vec<SearchHit>, AppError> {
        Ok(search_excursions(&self.client, query, language, limit).await?)
    }
}
