//! Venue adapters for rankbook.
//!
//! Each adapter implements the collaborator traits from [`rankbook::venue`]
//! so it can be handed straight to a [`rankbook::Reconciler`].
//!
//! - **Mock** (always built): in-memory venue with scripted behavior for tests
//! - **Binance** (feature `binance`): USDⓈ-M futures REST API

pub mod error;
pub mod mock;

#[cfg(feature = "binance")]
pub mod binance;

pub use error::BrokerError;
