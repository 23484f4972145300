//! A small personal blog server: listing, post, RSS and sitemap pages backed by
//! PostgreSQL and a set of time-bucketed read-through caches.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
