//! Real-time presence and relay core for collaborative document editing.
//!
//! Clients open one WebSocket, join a document room, and from then on every
//! document change or cursor move they send is relayed to the other members
//! of that room. Change payloads are opaque; nothing here merges or persists
//! them.

pub mod config;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;
pub mod websocket;
pub mod ws;
