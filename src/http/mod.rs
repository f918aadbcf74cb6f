//! HTTP serving layer handed to every daemon.
//!
//! # Data Flow
//! ```text
//! RouteTable (SubRoutes + static dir)
//!     → route.rs (compile; middleware chains via chain.rs)
//!     → server.rs (timeouts, CORS, access log)
//!     → net::listener (TLS bind & serve)
//! ```

pub mod chain;
pub mod route;
pub mod server;

pub use chain::{compose, from_fn, handler, Handler, Middleware, X_REQUEST_ID};
pub use route::{Route, RouteError, RouteTable, SubRoute, GET, POST};
pub use server::{HttpServer, ServerError};
