use crate::models::{ApiError, Pet};

/// A single pet.
/// swagger:response petResponse
pub struct PetResponse {
    /// in: body
    pub body: Pet,
}

/// A page of pets.
/// swagger:response petsResponse
pub struct PetsResponse {
    /// in: body
    pub body: Vec<Pet>,
    /// Total number of pets
    #[serde(rename = "X-Total-Count")]
    pub total: i64,
}

/// Something went wrong.
/// swagger:response errorResponse
pub struct ErrorResponse {
    /// in: body
    pub body: ApiError,
}
