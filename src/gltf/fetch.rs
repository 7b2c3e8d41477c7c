use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::gltf::document::{BufferDesc, Document};
use crate::gltf::LoadError;

/// Fetched and fully resolved input: the parsed document plus one byte
/// buffer per declared buffer, in declaration order.
pub struct FetchedDocument {
    pub document: Document,
    pub buffers: Vec<Vec<u8>>,
}

/// Fetches the document at `url` and resolves every buffer it declares.
/// `url` may be an http(s) URL or a filesystem path; relative buffer URIs
/// resolve against the document's location.
pub async fn fetch_document(url: &str) -> Result<FetchedDocument, LoadError> {
    let bytes = fetch_bytes(url).await?;
    let document = Document::from_json(&bytes)?;

    let mut buffers = Vec::with_capacity(document.buffers.len());
    for desc in &document.buffers {
        buffers.push(resolve_buffer(url, desc).await?);
    }

    Ok(FetchedDocument { document, buffers })
}

async fn resolve_buffer(document_url: &str, desc: &BufferDesc) -> Result<Vec<u8>, LoadError> {
    match &desc.uri {
        // No URI means a zero-filled buffer of the declared length.
        None => Ok(vec![0; desc.byte_length]),
        Some(uri) if uri.starts_with("data:") => decode_data_uri(uri),
        Some(uri) => fetch_bytes(&resolve_uri(document_url, uri)).await,
    }
}

/// Decodes a `data:<mime>;base64,<payload>` URI with the standard alphabet.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, LoadError> {
    let rest = uri.strip_prefix("data:").ok_or(LoadError::InvalidDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(LoadError::InvalidDataUri)?;
    if !header.ends_with(";base64") {
        return Err(LoadError::UnsupportedUri(uri.to_string()));
    }
    Ok(BASE64.decode(payload)?)
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, LoadError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let response = reqwest::get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    } else if url.contains("://") {
        Err(LoadError::UnsupportedUri(url.to_string()))
    } else {
        tokio::fs::read(url).await.map_err(|source| LoadError::Io {
            path: url.to_string(),
            source,
        })
    }
}

/// Resolves `uri` against the directory of `document_url`.
fn resolve_uri(document_url: &str, uri: &str) -> String {
    if uri.contains("://") || uri.starts_with('/') {
        return uri.to_string();
    }
    match document_url.rfind('/') {
        Some(slash) => format!("{}/{}", &document_url[..slash], uri),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_decodes_byte_for_byte() {
        let decoded = decode_data_uri("data:application/octet-stream;base64,AAECAwQF").unwrap();
        assert_eq!(decoded, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn non_base64_data_uri_is_unsupported() {
        let result = decode_data_uri("data:text/plain,hello");
        assert!(matches!(result, Err(LoadError::UnsupportedUri(_))));
    }

    #[test]
    fn missing_comma_is_malformed() {
        assert!(matches!(
            decode_data_uri("data:application/octet-stream;base64"),
            Err(LoadError::InvalidDataUri)
        ));
    }

    #[test]
    fn relative_uris_resolve_against_document_directory() {
        assert_eq!(
            resolve_uri("https://host/results/abc/model.gltf", "model.bin"),
            "https://host/results/abc/model.bin"
        );
        assert_eq!(
            resolve_uri("model.gltf", "model.bin"),
            "model.bin"
        );
        assert_eq!(
            resolve_uri("https://host/a/model.gltf", "https://cdn/model.bin"),
            "https://cdn/model.bin"
        );
    }
}
