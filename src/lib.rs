//! # doclabel
//!
//! A personal document-labeling tool: track files under user-chosen labels,
//! train one binary classifier per label, and predict labels for new files.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────────┐
//! │   add    │──▶│  corpus  │──▶│    train     │
//! │ identity │   │ (SQLite) │   │ TF-IDF + LR  │
//! └──────────┘   └──────────┘   └──────┬───────┘
//!                                      ▼
//!                               ┌──────────────┐
//!                               │   registry   │
//!                               │  (versioned) │
//!                               └──────┬───────┘
//!                          ┌───────────┴──────────┐
//!                          ▼                      ▼
//!                    ┌──────────┐           ┌──────────┐
//!                    │ predict  │           │ explain  │
//!                    └──────────┘           └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! doclabel add --filename notes/budget.txt --label work
//! doclabel add --filename photos/trip.md --label personal
//! doclabel train
//! doclabel predict --filename inbox/letter.pdf
//! doclabel explain --label work
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Storage session |
//! | [`migrate`] | Schema creation |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`identity`] | Content hashing and path resolution |
//! | [`extract`] | Plain-text extraction |
//! | [`corpus`] | Corpus store and add reconciliation |
//! | [`registry`] | Versioned vectoriser/model storage |
//! | [`traits`] | Vectoriser and classifier capabilities |
//! | [`tfidf`] | N-gram TF-IDF vectoriser |
//! | [`classifier`] | Logistic regression |
//! | [`train`] | Training orchestration |
//! | [`predict`] | Label prediction |
//! | [`explain`] | Feature explanations |
//! | [`stats`] | Corpus and registry overview |

pub mod add;
pub mod classifier;
pub mod config;
pub mod corpus;
pub mod db;
pub mod error;
pub mod explain;
pub mod extract;
pub mod identity;
pub mod migrate;
pub mod models;
pub mod predict;
pub mod progress;
pub mod registry;
pub mod stats;
pub mod tfidf;
pub mod traits;
pub mod train;
