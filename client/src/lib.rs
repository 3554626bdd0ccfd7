//! # Tile World Client Library
//!
//! A headless console client for the tile world server. It logs in, mirrors the
//! players the server announces, animates them with the same
//! [`shared::MovementState`] the server simulates with, and turns console lines
//! into move and chat requests.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Client-side mirror of the world:
//! - The local player once `ser_login` succeeds
//! - Remote players keyed by uuid, added by `ser_player_list` and `ser_online`,
//!   removed by `ser_offline`
//! - `ser_move` routes a walk to the announced cell with A* over the client's
//!   copy of the walk map, so mirrored characters go around walls like the
//!   server's do
//! - The five most recent chat lines
//!
//! ### Input Module (`input`)
//! Parses console lines: `/move x y`, `/quit`, anything else is chat.
//!
//! ### Network Module (`network`)
//! Owns the TCP stream and the frame codec, and multiplexes socket reads,
//! console input and the 60 Hz animation tick.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use shared::{GridMap, DEFAULT_GRID_SIZE};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let grid = GridMap::open(DEFAULT_GRID_SIZE.0, DEFAULT_GRID_SIZE.1);
//!     let mut client = Client::new("127.0.0.1:6666", "admin01", "123456", grid).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
