//! # docdigest
//!
//! Local-first document summarization with an encrypted conversation history.
//!
//! An uploaded document is reduced to text, summarized by a locally hosted
//! language model, given a short title, encrypted, and stored as a
//! "conversation" that can later be listed, renamed, re-decrypted, or
//! deleted.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌───────┐   ┌────────┐   ┌──────────┐
//! │ Extract  │──▶│  Model  │──▶│ Title │──▶│ Cipher │──▶│  SQLite  │
//! │ PDF/text │   │ (Ollama)│   │       │   │AES-GCM │   │  store   │
//! └──────────┘   └─────────┘   └───────┘   └────────┘   └────┬─────┘
//!                                                            │
//!                                     ┌──────────────────────┤
//!                                     ▼                      ▼
//!                                ┌──────────┐          ┌──────────┐
//!                                │   CLI    │          │   HTTP   │
//!                                └──────────┘          └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docdigest keygen                      # print a key for [cipher] key
//! docdigest init                        # create database
//! docdigest ingest ./report.pdf         # summarize and store
//! docdigest history list
//! docdigest serve                       # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Typed error kinds |
//! | [`cipher`] | AES-256-GCM envelopes |
//! | [`model`] | Language-model client |
//! | [`title`] | Title heuristic |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF and text extraction |
//! | [`store`] | Encrypted conversation store |
//! | [`ingest`] | Ingestion pipeline |
//! | [`history`] | History CLI commands |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod cipher;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod history;
pub mod ingest;
pub mod migrate;
pub mod model;
pub mod models;
pub mod server;
pub mod store;
pub mod title;
