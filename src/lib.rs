// THEORY:
// This file is the main entry point for the `listing_vision` library crate.
// It defines the public API used by the command-line runner and by any other
// listing tool that wants a single best image per product.
//
// The primary interface is the `SelectionPipeline` (and its concurrent twin, the
// `ParallelPipeline`) with its configuration and report types. The pixel-level
// analysis lives in `core_modules`; everything that talks to third-party
// services lives in `collaborators`, outside the decision core.

pub mod collaborators;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod table;
