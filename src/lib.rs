//! # arbor
//!
//! arbor is a radix tree router for Rust that matches the triple *(HTTP
//! method, optional host, request path)*. It focuses on fast, allocation-
//! shy lookups over a compressed trie, with parameters (`/users/{id}`),
//! regex-constrained parameters (`/users/{id:^\d+$}`), infix and suffix
//! wildcards (`/files/*{path}`, `/a/*{mid}/z`) and case-insensitive
//! hostname routing (`{sub}.example.com/...`).
//!
//! Reads never lock: every lookup performs one atomic load of the current
//! tree version and walks immutable nodes. Writers serialize through a
//! mutex, rebuild only the spine they touch (untouched subtrees are shared
//! between versions) and publish the new version atomically, so a reader
//! always observes a consistent snapshot.
//!
//! ## Features
//!
//! - Static, parameterized and wildcard route matching with explicit
//!   precedence: static > constrained param > param > constrained
//!   wildcard > wildcard, infix wildcards before suffix wildcards.
//! - Hostname routing with ASCII case-insensitive matching and host
//!   parameters.
//! - Trailing-slash salvage with per-route redirect/ignore flags.
//! - Method-based routing over independent per-method tries.
//! - Atomic snapshots (`arc-swap`) for lock-free readers, plus pinned
//!   [`Snapshot`]s for running many lookups against one version.
//! - Pooled per-lookup capture buffers.
//! - Structured error handling with `thiserror`.
//!
//! ## Example
//!
//! ```rust
//! use arbor::{Router, add_route, find_route, remove_route};
//!
//! // Create a new router instance.
//! let router = Router::new();
//!
//! // Add some routes.
//! add_route(&router, "GET", "/home", "Welcome Home!").expect("Failed to add /home");
//! add_route(&router, "GET", "/users/{id}", "User Profile").expect("Failed to add /users/{id}");
//! add_route(&router, "GET", "/files/*{path}", "Serve File").expect("Failed to add /files/*{path}");
//! add_route(&router, "GET", "api.example.com/status", "API Status").expect("Failed to add host route");
//!
//! // Find a route. Captures are reported in declaration order.
//! let matched = find_route(&router, "GET", "", "/users/123").expect("expected a match");
//! assert_eq!(*matched.data(), "User Profile");
//! assert_eq!(matched.get("id"), Some("123"));
//!
//! let matched = find_route(&router, "GET", "", "/files/css/app.css").expect("expected a match");
//! assert_eq!(matched.get("path"), Some("css/app.css"));
//!
//! // Hostnames match case-insensitively, ports are stripped.
//! let matched = find_route(&router, "GET", "API.Example.Com:8080", "/status")
//!     .expect("expected the host route");
//! assert_eq!(*matched.data(), "API Status");
//!
//! // A miss is `None`, not an error.
//! assert!(find_route(&router, "GET", "", "/nonexistent").is_none());
//!
//! // Routes can be removed again.
//! remove_route(&router, "GET", "/home").expect("Failed to remove /home");
//! assert!(find_route(&router, "GET", "", "/home").is_none());
//! ```

pub mod context;
pub mod error;
pub mod operations;
pub mod types;

mod pattern;

pub use context::Router;
pub use context::Snapshot;
pub use error::RouterError;
pub use operations::add_route;
pub use operations::add_route_with;
pub use operations::find_route;
pub use operations::remove_route;
pub use operations::update_route;
pub use operations::update_route_with;
pub use types::ClientIpResolver;
pub use types::MatchedRoute;
pub use types::Route;
pub use types::RouteOptions;
