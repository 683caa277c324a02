//! # EFRIS Protocol Library
//!
//! This crate provides the envelope definitions and cryptographic pipeline
//! for talking to the EFRIS electronic invoicing service.
//!
//! ## Overview
//!
//! - **Envelope Codec**: JSON envelope with global info, data block and
//!   response-only return state
//! - **Crypto Pipeline**: RSA signing, AES session-key encryption, RSA
//!   unwrapping of the session key password
//! - **Decode Strategies**: a closed set of expected response shapes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           Business Payload              │  JSON (serde)
//! ├─────────────────────────────────────────┤
//! │      Signature (RSA / SHA-1)            │  over plaintext
//! ├─────────────────────────────────────────┤
//! │  Session-key encryption (AES / ECB)     │  or base64 plain
//! ├─────────────────────────────────────────┤
//! │             Envelope                    │  JSON over HTTP POST
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use efris_protocol::{DataBlock, Envelope, InterfaceCode, Routing, SessionKey};
//!
//! let routing = Routing::new("1000000000", "1000000000_01");
//! let key = SessionKey::from_bytes(b"0123456789abcdef".to_vec()).unwrap();
//!
//! let mut data = DataBlock::from_json(&serde_json::json!({"invoiceNo": "A001"})).unwrap();
//! data.encrypt(&key).unwrap();
//!
//! let envelope = Envelope::request(routing.global_info(&InterfaceCode::InvoiceDetails), data);
//! let bytes = envelope.encode().unwrap();
//! assert_eq!(Envelope::decode(&bytes).unwrap(), envelope);
//! ```
//!
//! ## Modules
//!
//! - [`envelope`]: Envelope, global info, return state and the JSON codec
//! - [`data`]: Data block, channel flags and the sign/encrypt pipeline
//! - [`crypto`]: Session key and client RSA key
//! - [`payload`]: Expected shapes and decoded payloads
//! - [`interface`]: Interface codes
//! - [`error`]: Error types

pub mod crypto;
pub mod data;
pub mod envelope;
pub mod error;
pub mod interface;
pub mod payload;

pub use crypto::{ClientKey, SessionKey, SESSION_KEY_LENGTHS};
pub use data::{Channel, DataBlock, DataDescription};
pub use envelope::{Envelope, ExtendField, GlobalInfo, ReturnStateInfo, Routing, SUCCESS_CODE};
pub use error::{ProtocolError, Result};
pub use interface::InterfaceCode;
pub use payload::{Expected, Payload};
