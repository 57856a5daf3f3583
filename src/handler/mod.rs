//! Request handling module
//!
//! `router` maps method+path to handlers and owns the 405 contract;
//! `inventory` implements the item endpoints; `static_files` serves
//! uploaded photos and the form pages.

pub mod inventory;
pub mod router;
pub mod static_files;

pub use router::handle_request;
