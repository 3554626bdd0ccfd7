//! # Tile World Server Library
//!
//! This library provides the authoritative server for a small tile-based
//! multiplayer world. Players log in with a fixed account, click a cell to walk
//! there along an A* route, and chat. The server validates every request,
//! simulates movement on its own clock and fans the results out to everyone
//! logged in.
//!
//! ## Core Responsibilities
//!
//! ### Connection Management
//! Each accepted TCP socket gets a [`connection::ConnectionActor`]: a reader
//! task that decodes `|#|`-delimited JSON frames, and a writer task that
//! drains the connection's outbound queue so frames never interleave. The
//! [`registry::SessionRegistry`] tracks the sending half of every live
//! connection and whether it has logged in.
//!
//! ### Authoritative Simulation
//! The [`game::World`] owns one session per connection: login state, profile
//! and a [`shared::MovementState`]. Move requests are routed with
//! [`shared::find_path`] against the walk map and advanced every tick at the
//! same speed the clients animate with.
//!
//! ### Protocol Dispatch
//! [`dispatcher::Dispatcher`] maps each decoded [`shared::Message`] to its
//! handler. Requests other than `cli_login` are ignored until the session has
//! logged in, and unknown tags are dropped without closing the connection.
//!
//! ## Architecture Design
//!
//! ### Single Writer
//! Network tasks never touch the world. They forward decoded messages and
//! lifecycle events over a channel to the simulation loop in
//! [`network::Server::run`], which applies them one at a time between ticks.
//! That loop is the only writer of the world and the only place a connection
//! is torn down, so cleanup and the `ser_offline` notice happen exactly once.
//!
//! ### Reliable Stream Transport
//! TCP gives ordered delivery; the frame codec restores message boundaries
//! however the stream is split. A frame that does not decode closes only the
//! offending connection.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::new("127.0.0.1:6666")).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod game;
pub mod network;
pub mod registry;
