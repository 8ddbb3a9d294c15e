use crate::models::*;

/// swagger:route GET /pets pets listPets
///
/// Lists pets.
///
/// Returns every pet in the store, filtered by tags.
///
/// Responses:
///   200: petsResponse
///   default: errorResponse
pub async fn list_pets() {}

/// swagger:route GET /pets/{id} pets getPet
///
/// Gets a pet by id.
///
/// Responses:
///   200: petResponse
///   404: errorResponse
pub async fn get_pet() {}

/// swagger:route POST /pets pets createPet
///
/// Creates a pet.
///
/// Security:
///   api_key:
///
/// Responses:
///   201: petResponse
///   default: errorResponse
pub async fn create_pet() {}

/// swagger:parameters listPets
pub struct ListPetsParams {
    /// Tags to filter by
    /// collection format: csv
    pub tags: Vec<String>,
    /// Maximum number of results
    /// maximum: 100
    pub limit: Option<i32>,
}

/// swagger:parameters getPet
pub struct PetIdParam {
    /// The id of the pet
    /// in: path
    pub id: i64,
}

/// swagger:parameters createPet
pub struct CreatePetParams {
    /// in: body
    /// required: true
    pub body: Pet,
}
