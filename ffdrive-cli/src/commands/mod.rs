//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of one subcommand. All of
//! them receive a ready [`ffdrive_core::Transcoder`] built from the layered
//! configuration.

pub mod album_art;
pub mod check;
pub mod convert;
pub mod fps;
pub mod probe;
pub mod run;
