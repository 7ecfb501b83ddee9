pub mod aggregate;
pub mod api;
pub mod artifact;
pub mod catalog;
pub mod domain;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod regions;
pub mod store;
pub mod sync;
