//! The promgen metrics generator.
//!
//! promgen plays the role of an instrumented service without any of the
//! service: metrics are scripted ahead of time as composable shapes,
//! then acted out scrape by scrape. A monitoring stack under test can
//! either scrape promgen like any other target or receive the same
//! samples over remote write, stamped with virtual timestamps so runs
//! are repeatable.
//!
//! This crate is the host layer of the workspace: it binds the pure
//! shape algebra from `promgen_series` and the wire protocol from
//! `promgen_write` into metric families, a scrape collector, a push
//! driver and the configuration surface the `promgen` binary is built
//! from. Treat it as internal plumbing for that binary rather than a
//! general-purpose API.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::perf)]
#![deny(clippy::suspicious)]
#![deny(clippy::complexity)]
#![deny(clippy::unnecessary_to_owned)]
#![deny(clippy::rc_buffer)]
#![deny(clippy::redundant_allocation)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod adapter;
pub mod collector;
pub mod config;
pub mod family;
pub mod push;
pub mod serve;
