use std::{fmt, sync::Arc};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::RgbaImage;

use crate::BoxFuture;

/// `data:<mime>;base64,<payload>` string. Clones share the same allocation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DataUrl(Arc<str>);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data url")]
    MissingScheme,
    #[error("data url is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Payload(#[from] base64::DecodeError),
}

impl DataUrl {
    pub fn encode(mime: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{mime};base64,{}", STANDARD.encode(bytes)).into())
    }

    /// Accepts any string which looks like a base64 data url; the payload is only checked on
    /// [`DataUrl::decode`].
    pub fn parse(s: impl Into<Arc<str>>) -> Result<Self, DataUrlError> {
        let s = s.into();
        let header = s.strip_prefix("data:").ok_or(DataUrlError::MissingScheme)?;
        let (meta, _) = header.split_once(',').ok_or(DataUrlError::MissingScheme)?;
        if !meta.ends_with(";base64") {
            return Err(DataUrlError::NotBase64);
        }
        Ok(Self(s))
    }

    pub fn mime(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|s| s.split_once(";base64,"))
            .map(|(mime, _)| mime)
            .unwrap_or_default()
    }

    pub fn decode(&self) -> Result<Vec<u8>, DataUrlError> {
        let (_, payload) = self.0.split_once(',').ok_or(DataUrlError::MissingScheme)?;
        Ok(STANDARD.decode(payload)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if both urls point to the same allocation, not just equal text.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payloads are megabytes long
        write!(f, "DataUrl({}, {} bytes)", self.mime(), self.0.len())
    }
}

impl From<DataUrl> for String {
    fn from(value: DataUrl) -> Self {
        value.0.to_string()
    }
}

/// A user supplied image file: identity plus content.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub name: String,
    pub size: u64,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        mime: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime: mime.into(),
            bytes,
        }
    }

    /// Guesses the mime type from the file name, falling back to sniffing the content.
    pub fn with_guessed_mime(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        let mime = image::ImageFormat::from_path(&name)
            .or_else(|_| image::guess_format(&bytes))
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream");
        Self::new(name, mime, bytes)
    }

    pub fn to_data_url(&self) -> DataUrl {
        DataUrl::encode(&self.mime, &self.bytes)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("cannot decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("image loader went away")]
    Canceled(#[from] futures::channel::oneshot::Canceled),
}

/// Decoded pixels at native resolution.
pub fn decode_source(file: &SourceFile) -> Result<RgbaImage, ImageLoadError> {
    image::load_from_memory(&file.bytes)
        .map(|i| i.to_rgba8())
        .map_err(|source| ImageLoadError::Decode {
            name: file.name.clone(),
            source,
        })
}

/// Loads the pixels of a source file. Decoding may happen off the calling thread.
pub type SourceLoader =
    Box<dyn Fn(Arc<SourceFile>) -> BoxFuture<'static, Result<Arc<RgbaImage>, ImageLoadError>>>;

/// Decodes on a background thread, so large images don't block the frame loop.
#[cfg(not(target_arch = "wasm32"))]
pub fn threaded_loader() -> SourceLoader {
    Box::new(|file| crate::async_task::spawn_blocking(move || decode_source(&file).map(Arc::new)))
}

/// Decodes while the future is polled for the first time.
pub fn inline_loader() -> SourceLoader {
    use futures::FutureExt;
    Box::new(|file| async move { decode_source(&file).map(Arc::new) }.boxed())
}
