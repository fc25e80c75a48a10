//! Portfolio Engine
//!
//! Headless backend for a single-page developer portfolio: animated
//! list/detail panels over static career data, plus an AI assistant that
//! answers visitor questions through Google Gemini.
//!
//! # Architecture
//!
//! - **Server**: Axum JSON API with SSE for per-page state changes
//! - **Panels**: three-phase exit/swap/enter sequencer on the tokio clock
//! - **Chat**: lazily created Gemini sessions, gated by a configured key
//!
//! # Modules
//!
//! - [`portfolio`]: static profile, experience and education tables
//! - [`transition`]: phase state machine and cancellable delayed tasks
//! - [`panel`]: timed panel driver over a catalog
//! - [`chat`]: chat backend traits, the Gemini backend and the widget
//! - [`page`]: one page load and the page store
//! - [`events`]: page events and SSE encoding
//! - [`config`]: CLI, file and environment configuration
//! - [`server`]: HTTP routes

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::unused_async)]

pub mod chat;
pub mod config;
pub mod events;
pub mod page;
pub mod panel;
pub mod portfolio;
pub mod server;
pub mod transition;

pub use server::AppState;
