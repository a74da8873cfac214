//! # tabsync
//!
//! Loads tabular files (CSV, XLSX) into MongoDB collections and derives
//! joined data from them, either as live `$lookup` views or as merged
//! snapshot collections.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Source dir  │──▶│   Loader    │──▶│   MongoDB    │
//! │  CSV/XLSX   │   │ full replace│   │ collections  │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │
//!                      ┌─────────────────────┤
//!                      ▼                     ▼
//!                ┌───────────┐        ┌────────────┐
//!                │   Views   │        │   Merges   │
//!                │  $lookup  │        │ snapshots  │
//!                └───────────┘        └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tabsync check                 # validate config, show the plan
//! tabsync run                   # load, views, diagnose, merge
//! tabsync stats                 # collections and document counts
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credentials |
//! | [`catalog`] | Built-in Marvel dataset plan |
//! | [`models`] | Source file types |
//! | [`connector_fs`] | Source file discovery |
//! | [`extract`] | CSV and XLSX parsing |
//! | [`ingest`] | Full-replace loader |
//! | [`views`] | `$lookup` view definitions |
//! | [`diagnose`] | Link coverage counts |
//! | [`materialize`] | Merged snapshot collections |
//! | [`stats`] | Store overview |
//! | [`db`] | MongoDB connection |
//! | [`mongo_store`] | MongoDB document store |

pub mod catalog;
pub mod config;
pub mod connector_fs;
pub mod db;
pub mod diagnose;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod materialize;
pub mod models;
pub mod mongo_store;
pub mod stats;
pub mod views;
