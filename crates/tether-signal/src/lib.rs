//! Tether Signal Server
//!
//! Hands out time-limited invite links to a call and relays WebRTC
//! negotiation messages between the peers that use them.
//!
//! # Protocol
//!
//! 1. Admin creates a meeting (`POST /admin/meetings`)
//! 2. Admin issues personal links (`POST /admin/meetings/{id}/invite`)
//! 3. A visitor opens `/r/{token}`; one unit of capacity is consumed and the
//!    visitor is handed off to the call page
//! 4. The call page connects to `/ws?token=...` and is greeted with `hello`
//! 5. Peers exchange `signal` messages through the server until they have a
//!    direct connection

pub mod auth;
pub mod error;
pub mod messages;
pub mod relay;
pub mod room;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use messages::{ClientMessage, ServerMessage};
pub use relay::PeerContext;
pub use room::{Room, Rooms};
pub use server::{build_router, serve, spawn_sweeper};
pub use state::AppState;
