//! `newt` is a CoAP protocol engine for constrained devices, speaking
//! the draft-07 dialect of the protocol.
//!
//! ## CoAP
//! CoAP is an application-level network protocol that copies the semantics of HTTP
//! to an environment conducive to **constrained** devices. (weak hardware, small battery capacity, etc.)
//!
//! This means that you can write and run two-way RESTful communication
//! between devices very similarly to the networking semantics you are
//! most likely very familiar with.
//!
//! ## The engine
//! A node serves [`Resource`](server::Resource)s and sends requests of its own
//! through one [`Core`](core::Core), which owns:
//! - a fixed pool of open transactions, retransmitting confirmable messages
//!   until they are answered (or given up on),
//! - the registry of resources, always starting with `/.well-known/core`,
//! - the set of peers observing resources,
//! - a single slot for a response deferred by its handler (a "separate" response).
//!
//! Nothing is allocated; every capacity is fixed at compile time
//! (see [`config`]) and bounded further at runtime by [`Config`](config::Config).
//!
//! Responses larger than one block are split by the engine (see [`blockwise`]),
//! and [`client::BlockingRequest`] fetches every block of a remote resource.

#![doc(html_root_url = "https://docs.rs/newt/0.3.0")]
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
// -
// style
#![allow(clippy::unused_unit)]
// -
// deny
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(missing_copy_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// warnings
#![cfg_attr(not(test), warn(unreachable_pub))]
// -
// features
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc as std_alloc;


pub(crate) mod logging;

/// Blocking rust CoAP client
pub mod blocking;

pub mod blockwise;

pub mod client;

/// customizable retrying of fallible operations
pub mod retry;

/// responses
pub mod resp;

/// requests
pub mod req;

/// the protocol engine
pub mod core;

/// serving resources
pub mod server;

/// platform configuration
pub mod platform;

/// network abstractions
pub mod net;

/// time abstractions
pub mod time;

/// configuring runtime behavior
pub mod config;

/// `std`-only newt stuff
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub mod std;
