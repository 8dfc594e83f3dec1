//! SeaORM entities mirroring the domain model.

pub mod comment;
pub mod post;
pub mod user;
