//! # Redis
//!
//! The authoritative content store.
//!
//! One hash per table, JSON-encoded records keyed by a numeric id, ids
//! allocated from plain `INCR` counters. Admin sessions are standalone
//! keys with a TTL so an abandoned login expires on its own.
//!
//! The search index is derived from this store, never the other way
//! around: Meilisearch can lag a mutation, Redis cannot.

use std::{collections::HashMap, time::Duration};

use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::error::AppError;

pub const EXCURSIONS_TABLE: &str = "excursions";
pub const CATEGORIES_TABLE: &str = "categories";
pub const SERVICES_TABLE: &str = "predefined_services";
pub const BOOKINGS_TABLE: &str = "bookings";
pub const CONTACTS_TABLE: &str = "contacts";

const SESSION_PREFIX: &str = "admin_session:";
pub const SESSION_TTL_SECONDS: u64 = 60 * 60 * 24;

pub async fn init_redis(redis_url: &str) -> ConnectionManager {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).unwrap();
    let connection_manager = client
        .get_connection_manager_with_config(config)
        .await
        .unwrap();

    connection_manager
}

/// Allocate the next id for a table. Counters only ever move forward, so
/// deleted ids are never reused.
pub async fn next_id(conn: &mut ConnectionManager, table: &str) -> Result<u32, AppError> {
    let id: u32 = conn.incr(format!("next_id:{table}"), 1u32).await?;
    Ok(id)
}

pub async fn put_record<T: Serialize>(
    conn: &mut ConnectionManager,
    table: &str,
    id: u32,
    record: &T,
) -> Result<(), AppError> {
    let json = serde_json::to_string(record)?;
    let _: () = conn.hset(table, id, json).await?;
    Ok(())
}

pub async fn get_record<T: DeserializeOwned>(
    conn: &mut ConnectionManager,
    table: &str,
    id: u32,
) -> Result<Option<T>, AppError> {
    let raw: Option<String> = conn.hget(table, id).await?;

    raw.map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(Into::into)
}

pub async fn all_records<T: DeserializeOwned>(
    conn: &mut ConnectionManager,
    table: &str,
) -> Result<Vec<T>, AppError> {
    let raw: HashMap<String, String> = conn.hgetall(table).await?;

    raw.into_values()
        .map(|json| serde_json::from_str(&json).map_err(Into::into))
        .collect()
}

pub async fn delete_record(
    conn: &mut ConnectionManager,
    table: &str,
    id: u32,
) -> Result<bool, AppError> {
    let removed: u32 = conn.hdel(table, id).await?;
    Ok(removed > 0)
}

pub async fn create_session(conn: &mut ConnectionManager) -> Result<String, AppError> {
    let token = Uuid::new_v4().simple().to_string();
    let _: () = conn
        .set_ex(format!("{SESSION_PREFIX}{token}"), 1u8, SESSION_TTL_SECONDS)
        .await?;

    Ok(token)
}

pub async fn session_valid(conn: &mut ConnectionManager, token: &str) -> Result<bool, AppError> {
    let exists: bool = conn.exists(format!("{SESSION_PREFIX}{token}")).await?;
    Ok(exists)
}

pub async fn revoke_session(conn: &mut ConnectionManager, token: &str) -> Result<(), AppError> {
    let _: () = conn.del(format!("{SESSION_PREFIX}{token}")).await?;
    Ok(())
}
