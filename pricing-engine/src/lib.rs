//! Pricing Engine
//!
//! Read-time price derivation for marketplace items: the current price ladder
//! (primary → best resale → recent average) and the trailing-window recent
//! average price (RAP) statistic.
//!
//! Everything here is a pure function of the state handed in: the engine
//! holds no storage access and caches nothing, so a quote always reflects the
//! committed rows the caller just fetched.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod quote;
pub mod rap;
pub mod types;

pub use error::{Error, Result};
pub use quote::PricingEngine;
pub use rap::{RapCalculator, RapConfig};
pub use types::{PriceQuote, PriceSource};
