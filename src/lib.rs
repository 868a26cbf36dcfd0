//! # Farm Assistant
//!
//! A local-first farm monitoring assistant. It reads the latest sensor
//! snapshots (soil, water, environment), summarizes how they are trending,
//! retrieves relevant passages from a folder of agricultural PDFs, and asks
//! a locally hosted language model (Ollama by default) to answer questions
//! with both in view.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │  Sensor log  │   │  PDF folder   │
//! │    (JSON)    │   │ data/docs/*.pdf│
//! └──────┬───────┘   └──────┬───────┘
//!        │                  │ digest ▶ extract ▶ chunk ▶ embed
//!        ▼                  ▼
//! ┌──────────────┐   ┌──────────────┐
//! │ status+trend │   │ vector index │ index.sqlite + .doc_hash
//! └──────┬───────┘   └──────┬───────┘
//!        └────────┬─────────┘
//!                 ▼
//!        ┌──────────────────┐      ┌─────────────┐
//!        │ prompt template  │─────▶│ chat model  │
//!        └──────────────────┘      └─────────────┘
//!                 │
//!        ┌────────┴────────┐
//!        ▼                 ▼
//!   ┌──────────┐     ┌──────────┐
//!   │   CLI    │     │   HTTP   │
//!   │(farmctl) │     │  (axum)  │
//!   └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! farmctl status                 # latest readings and trends
//! farmctl index                  # build or load the PDF index
//! farmctl ask "Should I irrigate today?"
//! farmctl chat                   # interactive session
//! farmctl serve                  # HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed errors at each pipeline boundary |
//! | [`sensors`] | Sensor log reader |
//! | [`normalize`] | Display normalization of readings |
//! | [`trend`] | Trend classification over three snapshots |
//! | [`status`] | Sensor status block for the prompt |
//! | [`documents`] | PDF discovery and content digest |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Recursive character text splitter |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`db`] | SQLite storage for the persisted index |
//! | [`index`] | Content-hash gated build-or-load of the vector index |
//! | [`retrieve`] | Top-k context retrieval with fallback |
//! | [`prompt`] | Prompt template with named slots |
//! | [`llm`] | Chat model clients |
//! | [`assistant`] | Prompt assembly and the query pipeline |
//! | [`history`] | Rolling conversation history |
//! | [`progress`] | Index build progress on stderr |
//! | [`shell`] | `ask` and interactive `chat` |
//! | [`status_cmd`] | `status` command and sensor report |
//! | [`index_cmd`] | `index` command |
//! | [`server`] | HTTP JSON API |

pub mod assistant;
pub mod chunk;
pub mod config;
pub mod db;
pub mod documents;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod history;
pub mod index;
pub mod index_cmd;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod prompt;
pub mod retrieve;
pub mod sensors;
pub mod server;
pub mod shell;
pub mod status;
pub mod status_cmd;
pub mod trend;

#[cfg(test)]
mod testing;
