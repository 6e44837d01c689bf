//! HTTP client for the club portal API.
//!
//! [`HttpPortalApi`] implements [`PortalApi`](club_portal_core::api::PortalApi)
//! over `reqwest`, so a portal store can run against a live server:
//!
//! ```ignore
//! use club_portal_client::{ClientConfig, HttpPortalApi};
//! use club_portal_core::environment::{PortalEnvironment, SystemClock};
//!
//! let api = HttpPortalApi::new(&ClientConfig::from_env())?;
//! let env = PortalEnvironment::new(Arc::new(api), Arc::new(SystemClock));
//! let store = Store::new(PortalState::default(), PortalReducer::new(), env);
//! store.send(PortalAction::Bootstrap).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod http;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::HttpPortalApi;
