//! Host-facing thumbnail provider.
//!
//! A provider is created once per file, either from a path or from an open
//! stream, and then asked for a thumbnail at a requested size. Creation is
//! the only step that can fail; producing the thumbnail never does, it only
//! returns `None` when the envelope carries no image at all.

use hfp_cloudfilter::{Classifier, CloudRootRegistry, HydrationPolicy, Materializer};
use hfp_core::config::ThumbnailConfig;
use hfp_core::error::KEEP_LOCAL_HINT;
use hfp_core::{HfpConfig, HfpResult};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::codec;
use crate::envelope::decode_text;
use crate::extract::Extractor;
use crate::render::{cloud_unavailable, generic, render_for, RenderedThumbnail, MAX_SIZE};
use crate::source::{ByteSource, ReadSeek};

/// Shared, read-only state used by every provider instance.
#[derive(Debug)]
pub struct ProviderContext {
    materializer: Materializer,
    extractor: Extractor,
    max_envelope_bytes: u64,
    max_size: u32,
}

impl ProviderContext {
    /// Build a context over the live system from configuration.
    ///
    /// # Errors
    /// [`hfp_core::HfpError::Config`] if the configured field name is unusable.
    pub fn new(config: &HfpConfig) -> HfpResult<Self> {
        let registry = Arc::new(CloudRootRegistry::system(&config.cloud));
        let classifier = Classifier::new(registry).heuristics(config.cloud.heuristics);
        let materializer = Materializer::new(classifier, HydrationPolicy::from(&config.cloud));
        Self::with_materializer(materializer, &config.thumbnail)
    }

    /// Default context sharing the process-wide root registry.
    pub fn system() -> Self {
        let materializer = Materializer::new(
            Classifier::new(CloudRootRegistry::global()),
            HydrationPolicy::default(),
        );
        Self::build(materializer, Extractor::default(), &ThumbnailConfig::default())
    }

    pub fn with_materializer(materializer: Materializer, config: &ThumbnailConfig) -> HfpResult<Self> {
        let extractor = Extractor::new(&config.field)?;
        Ok(Self::build(materializer, extractor, config))
    }

    fn build(materializer: Materializer, extractor: Extractor, config: &ThumbnailConfig) -> Self {
        ProviderContext {
            materializer,
            extractor,
            max_envelope_bytes: config.max_envelope_bytes.max(1),
            max_size: config.max_size.clamp(1, MAX_SIZE),
        }
    }

    /// Side length actually served for a requested `size`.
    pub fn effective_size(&self, size: u32) -> u32 {
        size.clamp(1, self.max_size)
    }

    pub fn materializer(&self) -> &Materializer {
        &self.materializer
    }

    pub fn classifier(&self) -> &Classifier {
        self.materializer.classifier()
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }
}

/// One initialized thumbnail request.
#[derive(Debug)]
pub struct ThumbnailProvider {
    ctx: Arc<ProviderContext>,
    source: ByteSource,
}

impl ThumbnailProvider {
    /// Initialize from a file path, materializing cloud placeholders first.
    ///
    /// # Errors
    /// Returns the unavailable-source error when the file cannot be opened;
    /// for cloud-only files that is [`hfp_core::HfpError::OnDemandUnavailable`].
    pub fn from_path(ctx: Arc<ProviderContext>, path: &Path) -> HfpResult<Self> {
        info!(path = %path.display(), "initialize with file");
        if let Some(found) = ctx.classifier().cloud_match(path) {
            info!(path = %path.display(), matched = ?found, "cloud file detected");
        }

        let source = ByteSource::from_path(path, ctx.materializer()).inspect_err(|e| {
            if e.is_on_demand() {
                warn!(path = %path.display(), "{KEEP_LOCAL_HINT}");
            }
        })?;
        Ok(ThumbnailProvider { ctx, source })
    }

    /// Initialize from a host-provided stream. Never fails.
    pub fn from_stream(ctx: Arc<ProviderContext>, reader: impl Read + Seek + Send + 'static) -> Self {
        debug!("initialize with stream");
        ThumbnailProvider {
            ctx,
            source: ByteSource::from_stream(reader),
        }
    }

    pub fn source(&self) -> &ByteSource {
        &self.source
    }

    fn is_cloud(&self) -> bool {
        self.source
            .path()
            .is_some_and(|p| self.ctx.classifier().is_cloud_path(p))
    }

    /// Produce a `size`×`size` thumbnail.
    ///
    /// Returns `None` only when the envelope has no usable image field.
    /// Every other failure yields a fallback canvas.
    pub fn thumbnail(&mut self, size: u32) -> Option<RenderedThumbnail> {
        let requested = size;
        let size = self.ctx.effective_size(size);
        debug!(requested, size, "thumbnail requested");
        let cloud = self.is_cloud();

        // State may have changed since the provider was initialized.
        if let (true, Some(path)) = (cloud, self.source.path()) {
            let state = self.ctx.classifier().classify(path);
            info!(path = %path.display(), %state, available = !state.needs_materialization(), "cloud file status");
        }

        match self.source.stat_len() {
            Ok(0) => warn!("stream is empty; the file may not be synced locally"),
            Ok(len) => debug!(len, "stream length"),
            Err(e) => debug!("stream length unavailable: {e}"),
        }

        let bytes = match self.source.read_all(self.ctx.max_envelope_bytes) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed reading envelope: {e}");
                return Some(if cloud { cloud_unavailable(size) } else { generic(size) });
            }
        };
        debug!(bytes = bytes.len(), "envelope read");
        if bytes.is_empty() {
            warn!("zero bytes read; the file may not be synced locally");
        }

        let text = decode_text(&bytes);
        debug!(chars = text.len(), "envelope text decoded");

        let Some(payload) = self.ctx.extractor().extract(&text) else {
            info!(field = self.ctx.extractor().field(), "no image payload found");
            return None;
        };
        debug!(
            len = payload.text.len(),
            preview = codec::preview(&payload.text, 60),
            tail = codec::tail(&payload.text, 20),
            "image payload extracted"
        );

        let image = codec::decode(&payload.text);
        if !image.is_empty() {
            debug!(bytes = image.len(), head = %codec::hex_prefix(&image, 32), "image bytes");
        }

        let thumb = render_for(&image, size, cloud);
        info!(tier = ?thumb.tier, size = thumb.size(), "thumbnail created");
        Some(thumb)
    }
}

/// Where the bytes for a request come from.
pub enum SourceLocator {
    Path(PathBuf),
    Stream(Box<dyn ReadSeek>),
}

impl std::fmt::Debug for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLocator::Path(p) => f.debug_tuple("Path").field(p).finish(),
            SourceLocator::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

#[derive(Debug)]
pub struct ThumbnailRequest {
    pub source: SourceLocator,
    pub size: u32,
}

/// Initialize a provider for `request` and produce its thumbnail in one step.
///
/// # Errors
/// Only path sources fail, and only when the file cannot be made available.
pub fn generate(ctx: Arc<ProviderContext>, request: ThumbnailRequest) -> HfpResult<Option<RenderedThumbnail>> {
    let mut provider = match request.source {
        SourceLocator::Path(path) => ThumbnailProvider::from_path(ctx, &path)?,
        SourceLocator::Stream(stream) => ThumbnailProvider {
            ctx,
            source: ByteSource::Stream(stream),
        },
    };
    Ok(provider.thumbnail(request.size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderTier;
    use hfp_cloudfilter::StaticEnvironment;
    use std::io::{self, Cursor, SeekFrom};

    fn ctx() -> Arc<ProviderContext> {
        let registry = Arc::new(CloudRootRegistry::new(StaticEnvironment::new()));
        let materializer = Materializer::new(Classifier::new(registry).heuristics(false), HydrationPolicy::default());
        Arc::new(ProviderContext::with_materializer(materializer, &ThumbnailConfig::default()).unwrap())
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device gone"))
        }
    }

    impl Seek for BrokenReader {
        fn seek(&mut self, _: SeekFrom) -> io::Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn stream_without_field_yields_none() {
        let mut p = ThumbnailProvider::from_stream(ctx(), Cursor::new(br#"{"name":"x"}"#.to_vec()));
        assert!(p.thumbnail(128).is_none());
    }

    #[test]
    fn empty_stream_yields_none() {
        let mut p = ThumbnailProvider::from_stream(ctx(), Cursor::new(Vec::new()));
        assert!(p.thumbnail(32).is_none());
    }

    #[test]
    fn undecodable_image_uses_unsupported_tier() {
        let mut p = ThumbnailProvider::from_stream(ctx(), Cursor::new(br#"{"thumbnail":"aGVsbG8="}"#.to_vec()));
        let thumb = p.thumbnail(64).unwrap();
        assert_eq!(thumb.tier, RenderTier::UnsupportedFormat);
        assert_eq!(thumb.image.dimensions(), (64, 64));
    }

    #[test]
    fn garbage_base64_uses_generic_tier() {
        let mut p = ThumbnailProvider::from_stream(ctx(), Cursor::new(br#"{"thumbnail":"!!!"}"#.to_vec()));
        assert_eq!(p.thumbnail(16).unwrap().tier, RenderTier::Generic);
    }

    #[test]
    fn read_failure_still_yields_canvas() {
        let mut p = ThumbnailProvider::from_stream(ctx(), BrokenReader);
        let thumb = p.thumbnail(24).unwrap();
        assert_eq!(thumb.tier, RenderTier::Generic);
        assert_eq!(thumb.size(), 24);
    }

    #[test]
    fn custom_field_name() {
        let registry = Arc::new(CloudRootRegistry::new(StaticEnvironment::new()));
        let materializer = Materializer::new(Classifier::new(registry), HydrationPolicy::default());
        let config = ThumbnailConfig {
            field: "preview".into(),
            ..ThumbnailConfig::default()
        };
        let ctx = Arc::new(ProviderContext::with_materializer(materializer, &config).unwrap());
        let mut p = ThumbnailProvider::from_stream(ctx, Cursor::new(br#"{"Preview":"aGVsbG8="}"#.to_vec()));
        assert!(p.thumbnail(8).is_some());
    }

    #[test]
    fn oversized_request_is_clamped_to_configured_max() {
        let registry = Arc::new(CloudRootRegistry::new(StaticEnvironment::new()));
        let materializer = Materializer::new(Classifier::new(registry), HydrationPolicy::default());
        let config = ThumbnailConfig {
            max_size: 64,
            ..ThumbnailConfig::default()
        };
        let ctx = Arc::new(ProviderContext::with_materializer(materializer, &config).unwrap());
        let mut p = ThumbnailProvider::from_stream(ctx, Cursor::new(br#"{"thumbnail":"aGVsbG8="}"#.to_vec()));

        let thumb = p.thumbnail(u32::MAX).unwrap();
        assert_eq!(thumb.tier, RenderTier::UnsupportedFormat);
        assert_eq!(thumb.size(), 64);
        assert_eq!(p.thumbnail(0).unwrap().size(), 1);
    }

    #[test]
    fn configured_max_never_exceeds_render_cap() {
        let registry = Arc::new(CloudRootRegistry::new(StaticEnvironment::new()));
        let materializer = Materializer::new(Classifier::new(registry), HydrationPolicy::default());
        let config = ThumbnailConfig {
            max_size: u32::MAX,
            ..ThumbnailConfig::default()
        };
        let ctx = ProviderContext::with_materializer(materializer, &config).unwrap();
        assert_eq!(ctx.effective_size(u32::MAX), MAX_SIZE);
        assert_eq!(ctx.effective_size(300), 300);
    }

    #[test]
    fn provider_can_be_asked_twice() {
        let mut p = ThumbnailProvider::from_stream(ctx(), Cursor::new(br#"{"thumbnail":"aGVsbG8="}"#.to_vec()));
        assert!(p.thumbnail(32).is_some());
        assert!(p.thumbnail(16).is_some());
    }

    #[test]
    fn generate_from_stream() {
        let request = ThumbnailRequest {
            source: SourceLocator::Stream(Box::new(Cursor::new(br#"{"thumbnail":"aGk="}"#.to_vec()))),
            size: 40,
        };
        let thumb = generate(ctx(), request).unwrap().unwrap();
        assert_eq!(thumb.size(), 40);
    }
}
