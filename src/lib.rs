//! Bearer-credential request relay: attach access tokens, coalesce concurrent refreshes into a
//! single flight, replay each call at most once, and fail safe to re-authentication.
//!
//! The crate is organized leaf-first:
//!
//! - [`store`] persists the credential pair and its derived [`auth::Principal`].
//! - [`http`] executes one authenticated request and classifies the outcome.
//! - [`refresh`] owns the single-flight refresh protocol and its FIFO waiter queue.
//! - [`guard`] clears the session and signals the re-authentication route.
//! - [`pipeline`] ties everything together behind [`pipeline::AuthenticatedPipeline::call`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod obs;
pub mod pipeline;
pub mod refresh;
pub mod store;

mod _prelude {
	pub use std::{
		collections::VecDeque,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
