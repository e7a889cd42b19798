//! Integration test crate for the herd settlement service.
//!
//! No library code lives here; the tests drive the daemon's JSON-RPC
//! dispatcher against an in-memory database and the sandbox ledger.
//!
//! ```sh
//! cargo test -p herd-integration-tests
//! ```
