use std::path::{Path, PathBuf};

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::BoxFuture;
use image::RgbaImage;
use thiserror::Error;

/// Failure to fetch or decode an icon image.
///
/// Never leaves the atlas builder: the entry is redrawn as a glyph instead.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("failed to read icon: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode icon: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to render svg icon: {0}")]
    Svg(String),
    #[error("icon loader stopped before answering")]
    Cancelled,
}

/// Image resolved for one atlas entry.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// The entry's own icon.
    Loaded(RgbaImage),
    /// A glyph drawn in place of an icon that could not be loaded.
    Synthesized(RgbaImage),
}

impl ImageSource {
    pub fn image(&self) -> &RgbaImage {
        match self {
            ImageSource::Loaded(img) | ImageSource::Synthesized(img) => img,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self, ImageSource::Synthesized(_))
    }
}

/// Fetches icon images.
///
/// Each call starts its load immediately; the returned future only waits for
/// the answer, so issuing every load before awaiting any of them runs them
/// concurrently.
pub trait IconLoader: Send + Sync {
    fn load(&self, path: &Path) -> BoxFuture<'static, Result<RgbaImage, AssetLoadError>>;
}

/// Loads icons from the filesystem on short-lived worker threads.
///
/// Raster formats are decoded with `image`; `.svg` files are rendered with
/// `resvg` at `svg_size` × `svg_size`.
#[derive(Debug, Clone)]
pub struct FileIconLoader {
    pub svg_size: u32,
}

impl Default for FileIconLoader {
    fn default() -> Self {
        Self { svg_size: 256 }
    }
}

impl IconLoader for FileIconLoader {
    fn load(&self, path: &Path) -> BoxFuture<'static, Result<RgbaImage, AssetLoadError>> {
        let path: PathBuf = path.to_path_buf();
        let svg_size = self.svg_size;
        let (tx, rx) = oneshot::channel();

        let spawned = std::thread::Builder::new()
            .name("glimmer-icon".to_string())
            .spawn(move || {
                // The receiver may be gone if the build was abandoned.
                let _ = tx.send(decode_file(&path, svg_size));
            });

        if let Err(e) = spawned {
            return futures::future::ready(Err(AssetLoadError::Io(e))).boxed();
        }

        async move { rx.await.map_err(|_| AssetLoadError::Cancelled)? }.boxed()
    }
}

fn decode_file(path: &Path, svg_size: u32) -> Result<RgbaImage, AssetLoadError> {
    let bytes = std::fs::read(path)?;

    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));

    if is_svg {
        rasterize_svg(&bytes, svg_size)
    } else {
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }
}

/// Renders an SVG document into a square straight-alpha image, fitted by its
/// longer side.
pub fn rasterize_svg(bytes: &[u8], size: u32) -> Result<RgbaImage, AssetLoadError> {
    use resvg::{tiny_skia, usvg};

    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| AssetLoadError::Svg(e.to_string()))?;

    let mut pixmap = tiny_skia::Pixmap::new(size, size)
        .ok_or_else(|| AssetLoadError::Svg(format!("invalid raster size {size}")))?;

    let doc = tree.size();
    let scale = size as f32 / doc.width().max(doc.height());
    resvg::render(&tree, tiny_skia::Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied pixels; the atlas is straight alpha.
    let data: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    RgbaImage::from_raw(size, size, data)
        .ok_or_else(|| AssetLoadError::Svg("pixel buffer size mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SQUARE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
        <rect x="0" y="0" width="10" height="10" fill="#ff0000"/>
    </svg>"##;

    #[test]
    fn svg_is_rasterized_opaque() {
        let img = rasterize_svg(SQUARE_SVG.as_bytes(), 16).unwrap();
        assert_eq!(img.dimensions(), (16, 16));
        let px = img.get_pixel(8, 8);
        assert_eq!(px.0, [255, 0, 0, 255]);
    }

    #[test]
    fn malformed_svg_is_an_error() {
        assert!(matches!(rasterize_svg(b"<svg", 16), Err(AssetLoadError::Svg(_))));
    }

    #[test]
    fn file_loader_reads_svg_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon.svg");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(SQUARE_SVG.as_bytes())
            .unwrap();

        let loader = FileIconLoader { svg_size: 32 };
        let img = pollster::block_on(loader.load(&path)).unwrap();
        assert_eq!(img.dimensions(), (32, 32));
    }

    #[test]
    fn file_loader_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileIconLoader::default();
        let res = pollster::block_on(loader.load(&dir.path().join("missing.png")));
        assert!(matches!(res, Err(AssetLoadError::Io(_))));
    }
}
