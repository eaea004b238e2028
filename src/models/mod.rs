// Catalog records
pub mod product;

pub use product::{NewProduct, Product, ProductId, RecordExtras, Stock, UNKNOWN_CITY};
