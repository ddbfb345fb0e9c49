// src/services/image_store.rs

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::{
    data_url::{decode_image, DecodedImage},
    error::AppError,
};

// Pastas usadas pelas rotas
pub const FOLDER_INSPECTION_PHOTOS: &str = "inspecoes/fotos";
pub const FOLDER_SIGNATURES: &str = "inspecoes/assinaturas";
pub const FOLDER_PCM_SIGNATURES: &str = "inspecoes/assinaturas-pcm";
pub const FOLDER_MACHINES: &str = "machines";
pub const FOLDER_TEMPLATES: &str = "templates";

/// Onde as imagens enviadas ficam guardadas. Devolve a URL pública.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, folder: &str, image: DecodedImage) -> Result<String, AppError>;

    /// Bytes de uma imagem previamente guardada; `None` se a URL não é deste storage.
    async fn load(&self, url: &str) -> Result<Option<Vec<u8>>, AppError>;
}

/// Decodifica a data URL e confere se é mesmo uma imagem, sem gravar nada.
pub fn prepare_upload(data_url: &str) -> Result<DecodedImage, AppError> {
    let decoded = decode_image(data_url)?;
    if let Err(e) = image::load_from_memory(&decoded.bytes) {
        return Err(AppError::InvalidInput(format!("Imagem inválida: {}", e)));
    }
    Ok(decoded)
}

/// Decodifica, valida e guarda.
pub async fn upload_data_url(store: &dyn ImageStore, folder: &str, data_url: &str) -> Result<String, AppError> {
    let decoded = prepare_upload(data_url)?;
    let url = store.store(folder, decoded).await?;
    tracing::debug!("Imagem salva em {}", url);
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    public_base: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(&self.public_base)?.trim_start_matches('/');
        let relative = Path::new(relative);
        // Nada de "..", raiz ou prefixos: o caminho tem que ficar dentro do diretório
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, folder: &str, image: DecodedImage) -> Result<String, AppError> {
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        let filename = format!("{}.{}", Uuid::new_v4(), image.extension);
        tokio::fs::write(dir.join(&filename), &image.bytes).await?;

        Ok(format!("{}/{}/{}", self.public_base, folder, filename))
    }

    async fn load(&self, url: &str) -> Result<Option<Vec<u8>>, AppError> {
        let Some(path) = self.resolve(url) else {
            return Ok(None);
        };
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn png_data_url() -> String {
        let img = image::DynamicImage::new_rgb8(2, 2);
        let mut bytes = Vec::new();
        img.write_to(&mut bytes, image::ImageOutputFormat::Png).unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(&bytes))
    }

    #[tokio::test]
    async fn test_store_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "/uploads/");

        let url = upload_data_url(&store, FOLDER_SIGNATURES, &png_data_url()).await.unwrap();
        assert!(url.starts_with("/uploads/inspecoes/assinaturas/"));
        assert!(url.ends_with(".png"));

        let bytes = store.load(&url).await.unwrap().unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    #[tokio::test]
    async fn test_rejects_bytes_that_are_not_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "/uploads");
        let url = format!("data:image/png;base64,{}", STANDARD.encode(b"nao sou png"));
        assert!(matches!(
            upload_data_url(&store, FOLDER_MACHINES, &url).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_load_ignores_foreign_and_traversal_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "/uploads");
        assert_eq!(store.load("https://cdn.exemplo.com/a.png").await.unwrap(), None);
        assert_eq!(store.load("/uploads/../segredo.txt").await.unwrap(), None);
        assert_eq!(store.load("/uploads/machines/nao-existe.png").await.unwrap(), None);
    }
}
