//! Application services: each route's data is assembled here before it reaches a template.

pub mod chrome;
pub mod error;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod listing;
pub mod metadata;
pub mod pagination;
pub mod popularity;
pub mod post;
pub mod render;
pub mod repos;
pub mod sitemap;
pub mod syndication;
