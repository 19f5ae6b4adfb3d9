//! # Source Uploader
//!
//! Publishes reader-app "book source" and "subscription source" JSON files
//! to a GitHub repository.
//!
//! An upload is normalized into a canonical, always-array-wrapped JSON
//! document, classified by its discriminator field, named after its
//! embedded source name, and written through the GitHub Contents API as a
//! create-or-update. The caller gets back the repository-relative path.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  HTTP / CLI  │──▶│ Normalizer  │──▶│  Publisher  │──▶│ ContentStore │
//! │ multipart in │   │ classify +  │   │ path + sha  │   │ GitHub API   │
//! └──────────────┘   │ canonical   │   │ + base64    │   └──────────────┘
//!                    └─────────────┘   └─────────────┘
//! ```
//!
//! | Document | Discriminator | Published as |
//! |----------|---------------|--------------|
//! | Book source | `bookSourceName` | `book-sources/<name>.json` |
//! | Subscription source | `sourceName` | `subscription-sources/<name>.json` |
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy and HTTP status mapping |
//! | [`models`] | Core data types |
//! | [`normalize`] | Parsing, classification, canonical serialization |
//! | [`publish`] | Existence check and create-or-update |
//! | [`store`] | Remote store trait and GitHub implementation |
//! | [`server`] | HTTP server |

pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod publish;
pub mod server;
pub mod store;
