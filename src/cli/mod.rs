//! # CLI Module
//!
//! Command-line tools over a configuration directory.
//!
//! ## Commands
//!
//! ### `resolve`
//!
//! ```bash
//! modrouter resolve --config ./sites --url https://admin.example.com/account/profile
//! ```
//!
//! Prints the resolved module and route as JSON.
//!
//! ### `check`
//!
//! ```bash
//! modrouter check --config ./sites
//! ```
//!
//! Compiles the route table of every configured module. Exits non-zero when
//! any fails.
//!
//! ### `routes`
//!
//! ```bash
//! modrouter routes --config ./sites --module main
//! ```
//!
//! `--config` may also come from `MODROUTER_CONFIG`.

mod commands;

pub use commands::{execute, load_resolver, run_cli, Cli, Commands};
