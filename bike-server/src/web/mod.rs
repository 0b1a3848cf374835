//! Web layer for the station API.
//!
//! A fixed set of service routes plus the routes declared in the route
//! table, each wrapped in its middleware chain.

mod dto;
pub mod middleware;
mod router;
mod routes;
mod state;
pub mod table;

pub use dto::*;
pub use router::create_router;
pub use state::AppState;
pub use table::{HandlerId, MiddlewareId, RouteDescriptor, RouteTable, RouteTableError};
