//! # EFRIS Client Library
//!
//! Talks to the electronic fiscal receipting service: builds request
//! envelopes, signs and encrypts their content, posts them, and interprets
//! the replies.
//!
//! ## Overview
//!
//! - **Key exchange**: obtain a session key over T104, unwrapped with the
//!   taxpayer's RSA key
//! - **Calls**: sign the plaintext, then encrypt or base64-encode it
//! - **Replies**: decrypt and decode into a [`Payload`](efris_protocol::Payload),
//!   with business failures returned as data
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        EfrisClient                          │
//! │   endpoint helpers (T106..T139) ──► send / send_with_key    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │ KeyExchange  │  │  interpret   │  │    Transport     │   │
//! │  │    (T104)    │  │  (branches)  │  │  (HTTP POST)     │   │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use efris_client::{Config, EfrisClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load_default()?;
//!     config.apply_env_overrides();
//!     config.validate()?;
//!
//!     let client = EfrisClient::from_config(&config)?;
//!     let reply = client.retrieve_invoice("320000012345").await?;
//!     println!("{}: {:?}", reply.return_state().return_code, reply.payload());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`transport`]: HTTP boundary
//! - [`interpreter`]: Response interpretation
//! - [`key_exchange`]: Session key bootstrap
//! - [`service`]: The client facade
//! - [`endpoints`]: Named interface helpers

pub mod config;
pub mod endpoints;
pub mod error;
pub mod interpreter;
pub mod key_exchange;
pub mod service;
pub mod transport;

// Re-export protocol for convenience
pub use efris_protocol;

pub use config::{Config, ConfigError};
pub use endpoints::GoodsQuery;
pub use error::{ClientError, Result};
pub use interpreter::{interpret, unwrap_session_key, BusinessFailure, Reply, Response};
pub use key_exchange::KeyExchange;
pub use service::EfrisClient;
pub use transport::{exchange, HttpTransport, SendFuture, Transport};
