//! Integration test common infrastructure.
//!
//! Spawns the bridge binary against an in-process fake of the remote chat
//! API and drives it with a plain line-based IRC client.

pub mod client;
pub mod remote;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use remote::FakeApi;
#[allow(unused_imports)]
pub use server::TestServer;
