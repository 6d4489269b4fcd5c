//! The matching engine proper: per-symbol critical sections, the matching
//! algorithm they run, and the router that dispatches ingress to them (§4,
//! §5).

pub mod core;
pub mod matching;
pub mod router;
pub mod validation;

pub use core::SymbolEngine;
pub use router::Router;
