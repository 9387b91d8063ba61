//! Front-end orchestration for the real-time video client SDK.
//!
//! Two screens drive the SDK: [`screens::EncoderScreen`] broadcasts the local camera and
//! microphone, and [`screens::ManifestScreen`] plays a stream given its manifest URL. Each
//! screen owns its SDK resources through [`bindings`], which guarantee that no resource is
//! created twice, leaked, or torn down out of order, even when a screen is taken down while an
//! acquisition is still in flight. Broadcasters authenticate with tokens from [`auth`].
//!
//! The crate also ships the [`backend`] that answers the streaming platform's webhook (see
//! [`webhook`]) and reports who is watching a call.

pub mod auth;
pub mod backend;
pub mod bindings;
pub mod config;
mod error;
pub mod lifecycle;
pub mod logging;
pub mod screens;
pub mod webhook;

pub use error::Error;
