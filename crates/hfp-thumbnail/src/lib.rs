//! hfp-thumbnail: preview images from `.hfp` envelopes
//!
//! An `.hfp` file is a JSON document carrying a base64-encoded bitmap under a
//! `thumbnail` field. This crate turns a path or a seekable stream into a
//! square RGBA thumbnail and never fails on bad content:
//!
//! ```text
//! ByteSource (path → materialized file, or host stream)
//!     │  bounded read
//!     ▼
//! envelope::decode_text   → BOM-aware text
//! extract::Extractor      → "thumbnail" string value     (absent → no image)
//! codec::decode           → escape repair, padding, base64 (failure → empty)
//! render::render_for      → decoded / unsupported-format / cloud / generic
//! ```
//!
//! Only an unavailable source (see [`hfp_core::HfpError::is_unavailable`])
//! is reported as an error; every content problem degrades to a fallback
//! canvas.

pub mod codec;
pub mod diag;
pub mod envelope;
pub mod extract;
pub mod glyphs;
pub mod provider;
pub mod render;
pub mod source;

pub use extract::{ExtractedPayload, Extractor};
pub use provider::{generate, ProviderContext, SourceLocator, ThumbnailProvider, ThumbnailRequest};
pub use render::{render, render_for, RenderTier, RenderedThumbnail};
pub use source::ByteSource;
