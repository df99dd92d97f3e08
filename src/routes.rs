use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{
        HeaderMap, StatusCode,
        header::{ACCEPT_LANGUAGE, CONTENT_TYPE},
    },
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    database::{
        BOOKINGS_TABLE, CATEGORIES_TABLE, CONTACTS_TABLE, EXCURSIONS_TABLE, SERVICES_TABLE,
        all_records, delete_record, get_record, next_id, put_record,
    },
    dispatcher::{MIN_QUERY_CHARS, popular_searches},
    error::AppError,
    models::{
        Booking, BookingInput, Category, CategoryInput, Contact, ContactInput, DEFAULT_LANGUAGE,
        Excursion, ExcursionInput, Language, PredefinedService, PredefinedServiceInput,
    },
    search::{MAX_RESULTS, SearchHit, remove_excursion, search_excursions, upsert_excursion},
    seo::{build_robots, build_sitemap},
    state::AppState,
};

/// Explicit `lang` parameter first, then the first supported primary
/// subtag in `Accept-Language`, then the default. The server-side mirror
/// of "persisted preference, else browser negotiation".
pub fn resolve_language(requested: Option<&str>, headers: &HeaderMap) -> Language {
    if let Some(language) = requested.and_then(Language::parse) {
        return language;
    }

    headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .and_then(negotiate)
        .unwrap_or(DEFAULT_LANGUAGE)
}

// q-values are ignored; the header's own order decides.
fn negotiate(header: &str) -> Option<Language> {
    header
        .split(',')
        .filter_map(|part| {
            let tag = part.split(';').next()?.trim();
            let primary = tag.split('-').next()?;
            Language::parse(primary)
        })
        .next()
}

// ---- search ----

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub lang: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
}

/// The autocomplete read. Short queries short-circuit to an empty set and
/// an engine failure degrades to the same thing; the affordance never
/// surfaces an error.
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let language = resolve_language(params.lang.as_deref(), &headers);
    let query = params.q.unwrap_or_default();
    let query = query.trim();

    if query.chars().count() < MIN_QUERY_CHARS {
        return Json(SearchResponse { hits: Vec::new() });
    }

    let hits = match search_excursions(&state.meili_client, query, language, MAX_RESULTS).await {
        Ok(hits) => hits,
        Err(err) => {
            warn!("search request failed: {err}");
            Vec::new()
        }
    };

    Json(SearchResponse { hits })
}

#[derive(Serialize)]
pub struct PopularResponse {
    pub queries: Vec<String>,
}

pub async fn popular_handler(
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Json<PopularResponse> {
    let language = resolve_language(params.lang.as_deref(), &headers);

    Json(PopularResponse {
        queries: popular_searches(language)
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}

// ---- catalogue reads ----

#[derive(Deserialize)]
pub struct ExcursionFilter {
    pub category: Option<String>,
    pub featured: Option<bool>,
}

pub async fn list_excursions(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ExcursionFilter>,
) -> Result<Json<Vec<Excursion>>, AppError> {
    let mut conn = state.redis_connection.clone();
    let mut excursions: Vec<Excursion> = all_records(&mut conn, EXCURSIONS_TABLE).await?;

    if let Some(category) = filter.category {
        excursions.retain(|e| e.category == category);
    }
    if let Some(featured) = filter.featured {
        excursions.retain(|e| e.featured == featured);
    }

    excursions.sort_by_key(|e| e.id);
    Ok(Json(excursions))
}

pub async fn get_excursion_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Excursion>, AppError> {
    let mut conn = state.redis_connection.clone();
    let excursion: Excursion = get_record(&mut conn, EXCURSIONS_TABLE, id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(excursion))
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, AppError> {
    let mut conn = state.redis_connection.clone();
    let mut categories: Vec<Category> = all_records(&mut conn, CATEGORIES_TABLE).await?;
    categories.sort_by_key(|c| c.id);

    Ok(Json(categories))
}

pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PredefinedService>>, AppError> {
    let mut conn = state.redis_connection.clone();
    let mut services: Vec<PredefinedService> = all_records(&mut conn, SERVICES_TABLE).await?;
    services.sort_by_key(|s| s.id);

    Ok(Json(services))
}

// ---- submissions ----

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(input): Json<BookingInput>,
) -> Result<Json<Booking>, AppError> {
    if input.people == 0 || input.customer_name.trim().is_empty() || input.email.trim().is_empty()
    {
        return Err(AppError::MalformedPayload);
    }

    let mut conn = state.redis_connection.clone();

    // The referenced excursion must exist at submission time.
    if get_record::<Excursion>(&mut conn, EXCURSIONS_TABLE, input.excursion_id)
        .await?
        .is_none()
    {
        return Err(AppError::MalformedPayload);
    }

    let id = next_id(&mut conn, BOOKINGS_TABLE).await?;
    let booking = Booking {
        id,
        excursion_id: input.excursion_id,
        customer_name: input.customer_name,
        email: input.email,
        phone: input.phone,
        date: input.date,
        people: input.people,
        message: input.message,
        created_at: Utc::now(),
    };
    put_record(&mut conn, BOOKINGS_TABLE, id, &booking).await?;

    Ok(Json(booking))
}

pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ContactInput>,
) -> Result<Json<Contact>, AppError> {
    if input.name.trim().is_empty()
        || input.email.trim().is_empty()
        || input.message.trim().is_empty()
    {
        return Err(AppError::MalformedPayload);
    }

    let mut conn = state.redis_connection.clone();
    let id = next_id(&mut conn, CONTACTS_TABLE).await?;
    let contact = Contact {
        id,
        name: input.name,
        email: input.email,
        message: input.message,
        created_at: Utc::now(),
    };
    put_record(&mut conn, CONTACTS_TABLE, id, &contact).await?;

    Ok(Json(contact))
}

// ---- admin: excursions ----

pub async fn create_excursion(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ExcursionInput>,
) -> Result<Json<Excursion>, AppError> {
    let mut conn = state.redis_connection.clone();
    let id = next_id(&mut conn, EXCURSIONS_TABLE).await?;
    let excursion = input.into_record(id);

    put_record(&mut conn, EXCURSIONS_TABLE, id, &excursion).await?;
    upsert_excursion(&state.meili_client, &excursion).await?;

    Ok(Json(excursion))
}

pub async fn update_excursion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(input): Json<ExcursionInput>,
) -> Result<Json<Excursion>, AppError> {
    let mut conn = state.redis_connection.clone();

    if get_record::<Excursion>(&mut conn, EXCURSIONS_TABLE, id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let excursion = input.into_record(id);
    put_record(&mut conn, EXCURSIONS_TABLE, id, &excursion).await?;
    upsert_excursion(&state.meili_client, &excursion).await?;

    Ok(Json(excursion))
}

pub async fn delete_excursion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<StatusCode, AppError> {
    let mut conn = state.redis_connection.clone();

    if !delete_record(&mut conn, EXCURSIONS_TABLE, id).await? {
        return Err(AppError::NotFound);
    }
    remove_excursion(&state.meili_client, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---- admin: categories ----

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>, AppError> {
    if input.slug.trim().is_empty() {
        return Err(AppError::MalformedPayload);
    }

    let mut conn = state.redis_connection.clone();
    let id = next_id(&mut conn, CATEGORIES_TABLE).await?;
    let category = input.into_record(id);
    put_record(&mut conn, CATEGORIES_TABLE, id, &category).await?;

    Ok(Json(category))
}

pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>, AppError> {
    let mut conn = state.redis_connection.clone();

    if get_record::<Category>(&mut conn, CATEGORIES_TABLE, id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let category = input.into_record(id);
    put_record(&mut conn, CATEGORIES_TABLE, id, &category).await?;

    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<StatusCode, AppError> {
    let mut conn = state.redis_connection.clone();

    if !delete_record(&mut conn, CATEGORIES_TABLE, id).await? {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---- admin: predefined services ----

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    Json(input): Json<PredefinedServiceInput>,
) -> Result<Json<PredefinedService>, AppError> {
    let mut conn = state.redis_connection.clone();
    let id = next_id(&mut conn, SERVICES_TABLE).await?;
    let service = input.into_record(id);
    put_record(&mut conn, SERVICES_TABLE, id, &service).await?;

    Ok(Json(service))
}

pub async fn update_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
    Json(input): Json<PredefinedServiceInput>,
) -> Result<Json<PredefinedService>, AppError> {
    let mut conn = state.redis_connection.clone();

    if get_record::<PredefinedService>(&mut conn, SERVICES_TABLE, id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let service = input.into_record(id);
    put_record(&mut conn, SERVICES_TABLE, id, &service).await?;

    Ok(Json(service))
}

pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<StatusCode, AppError> {
    let mut conn = state.redis_connection.clone();

    if !delete_record(&mut conn, SERVICES_TABLE, id).await? {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---- admin: submission listings ----

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let mut conn = state.redis_connection.clone();
    let mut bookings: Vec<Booking> = all_records(&mut conn, BOOKINGS_TABLE).await?;
    bookings.sort_by_key(|b| b.id);

    Ok(Json(bookings))
}

pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Contact>>, AppError> {
    let mut conn = state.redis_connection.clone();
    let mut contacts: Vec<Contact> = all_records(&mut conn, CONTACTS_TABLE).await?;
    contacts.sort_by_key(|c| c.id);

    Ok(Json(contacts))
}

// ---- SEO ----

pub async fn sitemap_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.redis_connection.clone();
    let mut excursions: Vec<Excursion> = all_records(&mut conn, EXCURSIONS_TABLE).await?;
    excursions.sort_by_key(|e| e.id);

    let ids: Vec<u32> = excursions.iter().map(|e| e.id).collect();
    let xml = build_sitemap(&state.config.base_url, &ids);

    Ok(([(CONTENT_TYPE, "application/xml")], xml))
}

pub async fn robots_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain")],
        build_robots(&state.config.base_url),
    )
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(accept_language: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(accept_language).unwrap(),
        );
        headers
    }

    #[test]
    fn test_explicit_param_wins() {
        let language = resolve_language(Some("ru"), &headers("es-ES,es;q=0.9"));
        assert_eq!(language, Language::Ru);
    }

    #[test]
    fn test_invalid_param_falls_back_to_header() {
        let language = resolve_language(Some("de"), &headers("es-ES,es;q=0.9"));
        assert_eq!(language, Language::Es);
    }

    #[test]
    fn test_header_skips_unsupported_tags() {
        let language = resolve_language(None, &headers("fr-FR,de;q=0.9,ru;q=0.8"));
        assert_eq!(language, Language::Ru);
    }

    #[test]
    fn test_default_when_nothing_matches() {
        let language = resolve_language(None, &headers("fr-FR,de;q=0.9"));
        assert_eq!(language, DEFAULT_LANGUAGE);

        let language = resolve_language(None, &HeaderMap::new());
        assert_eq!(language, DEFAULT_LANGUAGE);
    }
}
