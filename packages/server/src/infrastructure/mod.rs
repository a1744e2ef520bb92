//! Infrastructure layer: concrete implementations of the domain seams and
//! the wire DTOs.

pub mod auth;
pub mod dto;
pub mod repository;
