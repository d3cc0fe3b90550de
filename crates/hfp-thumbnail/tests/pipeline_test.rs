//! Full pipeline: envelope bytes in, square thumbnail out.

use base64::{engine::general_purpose::STANDARD, Engine};
use hfp_cloudfilter::{Classifier, CloudRootRegistry, HydrationPolicy, Materializer, RootSource, StaticEnvironment};
use hfp_core::config::ThumbnailConfig;
use hfp_core::AlphaType;
use hfp_thumbnail::codec;
use hfp_thumbnail::{generate, ProviderContext, RenderTier, SourceLocator, ThumbnailProvider, ThumbnailRequest};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn context(cloud_root: Option<&Path>) -> Arc<ProviderContext> {
    let mut env = StaticEnvironment::new();
    if let Some(root) = cloud_root {
        env = env.with(RootSource::PersonalAccount, vec![root.to_string_lossy().into_owned()]);
    }
    let registry = Arc::new(CloudRootRegistry::new(env));
    let materializer = Materializer::new(
        Classifier::new(registry).heuristics(false),
        HydrationPolicy {
            probe_bytes: 64,
            settle_delay: Duration::from_millis(1),
        },
    );
    Arc::new(ProviderContext::with_materializer(materializer, &ThumbnailConfig::default()).unwrap())
}

fn png_base64(w: u32, h: u32) -> String {
    let img = RgbImage::from_pixel(w, h, image::Rgb([0, 200, 0]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    STANDARD.encode(out.into_inner())
}

#[test]
fn non_image_payload_renders_unsupported_canvas() {
    let mut p = ThumbnailProvider::from_stream(context(None), Cursor::new(br#"{"thumbnail":"aGVsbG8="}"#.to_vec()));
    let thumb = p.thumbnail(64).unwrap();
    assert_eq!(thumb.tier, RenderTier::UnsupportedFormat);
    assert_eq!(thumb.image.dimensions(), (64, 64));
    assert_eq!(thumb.alpha, AlphaType::Argb);
}

#[test]
fn envelope_without_field_has_no_thumbnail() {
    let mut p = ThumbnailProvider::from_stream(context(None), Cursor::new(br#"{"name":"x"}"#.to_vec()));
    assert!(p.thumbnail(128).is_none());
}

#[test]
fn escaped_payload_is_repaired() {
    let clean = codec::normalize(r"iVBORw0\/KGgo=");
    assert!(clean.starts_with("iVBORw0/KGgo="));
    assert_eq!(clean.len() % 4, 0);
}

#[test]
fn payload_missing_its_last_character_keeps_data_tier() {
    // "aGVsbG8=" with the final symbol's unused bits set
    let mut p = ThumbnailProvider::from_stream(context(None), Cursor::new(br#"{"thumbnail":"aGVsbG9"}"#.to_vec()));
    assert_eq!(p.thumbnail(32).unwrap().tier, RenderTier::UnsupportedFormat);
}

#[test]
fn huge_requested_size_is_bounded() {
    let mut p = ThumbnailProvider::from_stream(context(None), Cursor::new(br#"{"thumbnail":"aGVsbG8="}"#.to_vec()));
    let thumb = p.thumbnail(u32::MAX).unwrap();
    assert_eq!(thumb.size(), ThumbnailConfig::default().max_size);
}

#[test]
fn png_in_stream_is_fitted_and_centered() {
    let envelope = format!(r#"{{"version": 2, "thumbnail": "{}"}}"#, png_base64(200, 100));
    let mut p = ThumbnailProvider::from_stream(context(None), Cursor::new(envelope.into_bytes()));
    let thumb = p.thumbnail(256).unwrap();
    assert_eq!(thumb.tier, RenderTier::Decoded);
    assert_eq!(thumb.image.dimensions(), (256, 256));
    assert_eq!(thumb.image.get_pixel(128, 63).0[3], 0);
    assert_eq!(thumb.image.get_pixel(128, 64).0, [0, 200, 0, 255]);
    assert_eq!(thumb.image.get_pixel(128, 192).0[3], 0);
}

#[test]
fn json_escaped_png_payload_decodes() {
    // Extra escaping layer: every '/' written as '\/' plus literal "\n" breaks
    let b64 = png_base64(8, 8).replace('/', r"\/");
    let (head, rest) = b64.split_at(b64.len() / 2);
    let envelope = format!(r#"{{"thumbnail":"{head}\n{rest}"}}"#);
    let mut p = ThumbnailProvider::from_stream(context(None), Cursor::new(envelope.into_bytes()));
    assert_eq!(p.thumbnail(16).unwrap().tier, RenderTier::Decoded);
}

#[test]
fn utf16_envelope_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.hfp");
    let text = format!(r#"{{"thumbnail":"{}"}}"#, png_base64(10, 10));
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    std::fs::write(&path, bytes).unwrap();

    let mut p = ThumbnailProvider::from_path(context(None), &path).unwrap();
    assert_eq!(p.thumbnail(20).unwrap().tier, RenderTier::Decoded);
}

#[test]
fn undecodable_cloud_file_gets_cloud_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloud.hfp");
    std::fs::write(&path, br#"{"thumbnail":"@@@@"}"#).unwrap();

    let mut p = ThumbnailProvider::from_path(context(Some(dir.path())), &path).unwrap();
    let thumb = p.thumbnail(48).unwrap();
    assert_eq!(thumb.tier, RenderTier::CloudUnavailable);
    assert_eq!(thumb.size(), 48);
}

#[test]
fn missing_files_fail_initialization() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.hfp");

    let err = ThumbnailProvider::from_path(context(None), &missing).unwrap_err();
    assert!(err.is_unavailable());
    assert!(!err.is_on_demand());

    let err = ThumbnailProvider::from_path(context(Some(dir.path())), &missing).unwrap_err();
    assert!(err.is_on_demand());
}

#[test]
fn generate_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.hfp");
    std::fs::write(&path, format!(r#"{{"thumbnail":"{}"}}"#, png_base64(4, 12))).unwrap();

    let request = ThumbnailRequest {
        source: SourceLocator::Path(path),
        size: 96,
    };
    let thumb = generate(context(None), request).unwrap().unwrap();
    assert_eq!(thumb.tier, RenderTier::Decoded);
    assert_eq!(thumb.argb_pixels().len(), 96 * 96);
}
