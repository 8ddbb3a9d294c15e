use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A pet in the store.
///
/// Pets are sold one at a time.
#[derive(Debug, Serialize, Deserialize)]
pub struct Pet {
    /// The id of the pet
    /// required: true
    /// minimum: 1
    pub id: i64,
    /// The name of the pet
    /// required: true
    /// min length: 3
    pub name: String,
    /// read only: true
    pub status: Status,
    pub tags: Vec<Tag>,
    /// swagger:strfmt date-time
    #[serde(rename = "bornAt")]
    pub born_at: String,
    pub attributes: HashMap<String, String>,
    #[serde(skip)]
    pub revision: u64,
    pub owner: Option<Box<Owner>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "available")]
    Available,
    #[serde(rename = "sold")]
    Sold,
}

/// swagger:model tag
#[derive(Debug, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

/// Someone who owns pets.
#[derive(Debug, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    pub pets: Vec<Pet>,
}

/// An error returned by the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
}
