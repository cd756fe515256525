//! Storage layer for the cafe catalog

mod cafe_store;

pub use cafe_store::CafeStore;
