//! Products domain module.
//!
//! A product is what a production order manufactures: a bill of materials
//! (inventory items consumed per unit) plus an optional inventory item that
//! receives the finished goods. Pure domain logic (no IO, no HTTP, no storage).

pub mod product;

pub use product::{
    ArchiveProduct, BomComponent, CreateProduct, Product, ProductArchived, ProductCommand,
    ProductCreated, ProductEvent, ProductId, ProductSnapshot, ProductStatus,
};
