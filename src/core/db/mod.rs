/// Database Module
///
/// This module provides the core database functionality for DWHQ,
/// organized into focused submodules for better maintainability and
/// separation of concerns.
///
/// ## Architecture
///
/// The database layer is split into four main concerns:
/// - **Backend Seam** (`backend.rs`): The traits the accessor drives and platform backends implement
/// - **Connection Management** (`connection.rs`): Settings, connection strings, and connect-phase state
/// - **Driver Selection** (`driver.rs`): Index validation and trial-connection probing
/// - **Query Results** (`query.rs`): Typed values, result sets, and records
///
/// ## Error Handling
///
/// All database operations use the standardized `DwhError` type for consistent error propagation.
pub mod backend;
pub mod connection;
pub mod driver;
pub mod query;

pub use backend::*;
pub use connection::*;
pub use driver::*;
pub use query::*;
