//! hfp-cloudfilter: cloud-sync awareness for thumbnail sources
//!
//! Answers one question for the thumbnail pipeline: can the bytes behind this
//! path be trusted right now, or is the file a cloud-only placeholder that has
//! to be materialized first?
//!
//! ## Architecture
//!
//! ```text
//! host path
//!     │
//!     ├── CloudRootRegistry  → sync roots from account config, env, home defaults
//!     │         ▲                (computed once, shared read-only)
//!     │         │
//!     ├── Classifier         → NotCloud / Resident / Placeholder / Unknown
//!     │         │                (known roots first, folder-name heuristics second)
//!     │         ▼
//!     └── Materializer       → probe read, settle delay, re-check, last-resort open
//!                                (bounded: one delay, one retry)
//! ```
//!
//! Account configuration is read from the Windows registry on Windows. Other
//! platforms only see environment overrides, home defaults, and configured roots.

pub mod environment;
pub mod hydration;
pub mod placeholder;
pub mod roots;

pub use environment::{EnvironmentProvider, RootSource, StaticEnvironment, SystemEnvironment};
pub use hydration::{HydrationPolicy, Materialized, Materializer};
pub use placeholder::{AttributeProbe, Classifier, CloudMatch, FileAttributes, FsProbe};
pub use roots::{CloudRoot, CloudRootRegistry};
