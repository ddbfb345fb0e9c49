// src/common/data_url.rs

use base64::{engine::general_purpose::STANDARD, Engine as _};
use validator::ValidationError;

use crate::common::error::AppError;

/// Tamanho máximo de uma imagem decodificada (5MB)
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const SUPPORTED_MIME: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/webp", "webp"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub mime: String,
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Decodifica `data:image/png;base64,....` em bytes.
pub fn decode_image(data_url: &str) -> Result<DecodedImage, AppError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| AppError::InvalidInput("Imagem deve ser enviada como data URL.".into()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::InvalidInput("Data URL malformada.".into()))?;

    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| AppError::InvalidInput("Data URL deve estar em base64.".into()))?
        .to_ascii_lowercase();

    let extension = SUPPORTED_MIME
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| AppError::InvalidInput(format!("Formato de imagem não suportado: {}", mime)))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| AppError::InvalidInput("Conteúdo base64 inválido.".into()))?;

    if bytes.is_empty() {
        return Err(AppError::InvalidInput("Imagem vazia.".into()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::InvalidInput(format!(
            "Imagem muito grande. Máximo de {}MB.",
            MAX_IMAGE_BYTES / 1024 / 1024
        )));
    }

    Ok(DecodedImage { mime, extension, bytes })
}

// Validação barata usada nos payloads: só confere o formato do cabeçalho
pub fn validate_data_url(value: &str) -> Result<(), ValidationError> {
    let ok = value
        .strip_prefix("data:image/")
        .and_then(|rest| rest.split_once(','))
        .map(|(header, _)| header.ends_with(";base64"))
        .unwrap_or(false);

    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("data_url");
        err.message = Some("A imagem deve ser uma data URL base64 (data:image/...;base64,...).".into());
        Err(err)
    }
}

pub fn validate_data_urls(values: &[String]) -> Result<(), ValidationError> {
    values.iter().try_for_each(|v| validate_data_url(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_png() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(b"fake-png"));
        let decoded = decode_image(&url).unwrap();
        assert_eq!(decoded.mime, "image/png");
        assert_eq!(decoded.extension, "png");
        assert_eq!(decoded.bytes, b"fake-png");
    }

    #[test]
    fn test_rejects_non_data_url() {
        assert!(matches!(decode_image("https://x/y.png"), Err(AppError::InvalidInput(_))));
        assert!(matches!(decode_image("data:image/png,abc"), Err(AppError::InvalidInput(_))));
        assert!(matches!(decode_image("data:text/plain;base64,YWJj"), Err(AppError::InvalidInput(_))));
        assert!(matches!(decode_image("data:image/png;base64,@@@"), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_oversized_image() {
        let big = vec![0u8; MAX_IMAGE_BYTES + 1];
        let url = format!("data:image/jpeg;base64,{}", STANDARD.encode(&big));
        assert!(decode_image(&url).is_err());
    }

    #[test]
    fn test_validate_data_url() {
        assert!(validate_data_url("data:image/png;base64,AAAA").is_ok());
        assert!(validate_data_url("data:image/png,AAAA").is_err());
        assert!(validate_data_url("/uploads/a.png").is_err());
        assert!(validate_data_urls(&["data:image/jpeg;base64,AA".into(), "x".into()]).is_err());
    }
}
