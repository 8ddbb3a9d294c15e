//! Petstore API.
//!
//! The purpose of this application is to provide pets
//! to people who want them.
//!
//!     Schemes: http, https
//!     Host: petstore.example.com
//!     Base path: /v1
//!     Version: 1.0.0
//!     License: MIT http://opensource.org/licenses/MIT
//!     Contact: John Doe <john.doe@example.com> http://john.doe.com
//!
//!     Consumes:
//!     - application/json
//!
//!     Produces:
//!     - application/json
//!
//! swagger:meta

pub mod handlers;
pub mod models;
pub mod responses;
