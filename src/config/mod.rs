//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! site config file (YAML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SiteConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::RedirectRule;
pub use schema::ServerEnvironment;
pub use schema::SiteConfig;
pub use schema::SiteLayout;
pub use schema::SitePaths;
pub use schema::StreamingConfig;
