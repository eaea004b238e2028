// Inventory management on top of the catalog client
pub mod inventory;
pub mod statistics;

pub use inventory::{
    search_products, sort_products, InventoryService, ProductQuery, ProductUpdate, SortDirection,
    SortField,
};
pub use statistics::InventoryStats;
