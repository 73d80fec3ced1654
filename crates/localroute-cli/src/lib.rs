//! localroute CLI library.
//!
//! Output formatting lives here so it can be unit tested apart from the
//! binary's argument parsing.

pub mod output;
