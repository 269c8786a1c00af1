//! # Repository Module
//!
//! Database repository implementations for Sari POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Terminal command                                                      │
//! │       │                                                                 │
//! │       │  db.products().get_by_sku("CANTON")                            │
//! │       ▼                                                                 │
//! │  Product / Sale / Access / CartBook repositories                        │
//! │       │      (reads and one-off writes on the pool)                    │
//! │       │                                                                 │
//! │  Services ──► pub(crate) helpers taking &mut SqliteConnection          │
//! │       │      (same SQL, run inside the service's transaction)          │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog reads, oversold list
//! - [`SaleRepository`](sale::SaleRepository) - Sales with their lines
//! - [`AccessRepository`](access::AccessRepository) - Admin PIN
//! - [`CartBookRepository`](cart::CartBookRepository) - Active and parked carts

pub mod access;
pub mod cart;
pub mod product;
pub mod sale;
