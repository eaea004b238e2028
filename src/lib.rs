//! Inventory Scan Library
//!
//! Barcode scan-to-product resolution over a REST product catalog, plus the
//! inventory operations (search, edit, stock, statistics) built on the same
//! catalog client.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod models;
pub mod scan;
pub mod services;

pub use catalog::{CatalogClient, CatalogLookup, HttpCatalogClient, LookupOutcome};
pub use errors::{AuthError, CatalogError, InventoryError, ScanError};
pub use models::{NewProduct, Product, ProductId, Stock};
pub use scan::{ScanController, ScanOutcome, ScanSession, ScanState};
