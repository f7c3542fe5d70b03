use base64::{prelude::BASE64_STANDARD, Engine};
use eframe::egui;
use image::{imageops::FilterType, DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed data URL for {path}")]
    DataUrl { path: PathBuf },
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// The file the user chose. Set as soon as the dialog returns, before any
/// bytes are read.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub file_name: String,
}

impl SelectedFile {
    pub fn new(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        Self { path, file_name }
    }

    pub fn mime_type(&self) -> &'static str {
        mime_for(&self.path)
    }
}

pub fn mime_for(path: &Path) -> &'static str {
    image::ImageFormat::from_path(path)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream")
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64_STANDARD.encode(bytes))
}

/// Bytes carried by a `data:<mime>;base64,<payload>` URL.
pub fn data_url_payload(url: &str) -> Option<Vec<u8>> {
    let (header, payload) = url.strip_prefix("data:")?.split_once(',')?;
    if !header.ends_with(";base64") {
        return None;
    }
    BASE64_STANDARD.decode(payload).ok()
}

/// A decoded image, ready to be shown.
pub struct LoadedImage {
    pub file: SelectedFile,
    /// Source of the preview: the file's bytes as a data URL. `image` is
    /// decoded from it.
    pub data_url: String,
    pub image: DynamicImage,
}

impl std::fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedImage")
            .field("file", &self.file)
            .field("data_url_len", &self.data_url.len())
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

pub async fn load_preview(file: SelectedFile) -> Result<LoadedImage, PreviewError> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|source| PreviewError::Read {
            path: file.path.clone(),
            source,
        })?;
    let data_url = data_url(file.mime_type(), &bytes);
    drop(bytes);

    let payload = data_url_payload(&data_url).ok_or_else(|| PreviewError::DataUrl {
        path: file.path.clone(),
    })?;
    let image = image::load_from_memory(&payload).map_err(|source| PreviewError::Decode {
        path: file.path.clone(),
        source,
    })?;

    Ok(LoadedImage {
        file,
        data_url,
        image,
    })
}

/// The preview as the canvas shows it. The texture is uploaded lazily on the
/// first frame that needs it.
pub struct Preview {
    pub loaded: LoadedImage,
    texture: Option<egui::TextureHandle>,
}

impl Preview {
    pub fn new(loaded: LoadedImage) -> Self {
        Self {
            loaded,
            texture: None,
        }
    }

    pub fn natural_size(&self) -> egui::Vec2 {
        egui::vec2(
            self.loaded.image.width() as f32,
            self.loaded.image.height() as f32,
        )
    }

    /// The GPU copy of the image. Shrunk to the backend's texture size limit
    /// when needed; `natural_size` still reports the decoded size.
    pub fn texture(&mut self, ctx: &egui::Context) -> &egui::TextureHandle {
        self.texture.get_or_insert_with(|| {
            let max_side = ctx.input(|i| i.max_texture_side);
            let rgba = texture_pixels(&self.loaded.image, max_side);
            let size = [rgba.width() as usize, rgba.height() as usize];
            let pixels = rgba.as_flat_samples();
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
            ctx.load_texture("preview", color_image, egui::TextureOptions::LINEAR)
        })
    }
}

fn texture_pixels(image: &DynamicImage, max_side: usize) -> RgbaImage {
    let max_side = u32::try_from(max_side).unwrap_or(u32::MAX).max(1);
    if image.width() > max_side || image.height() > max_side {
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            max_side,
            "shrinking preview texture"
        );
        image.resize(max_side, max_side, FilterType::Triangle).to_rgba8()
    } else {
        image.to_rgba8()
    }
}
