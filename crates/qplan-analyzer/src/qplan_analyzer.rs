//! QPLAN Analyzer - EXPLAIN plan parsing and the plan-tree model
//!
//! This crate provides functionality for:
//! - Tokenizing and parsing Firebird `PLAN` text into a plan tree
//! - Walking MySQL `EXPLAIN FORMAT=JSON` documents into the same tree
//! - Navigating plan trees, aggregating cost and row estimates, and rendering them

pub mod config;
pub mod explain;

pub use config::*;
pub use explain::*;
