use anyhow::{Context as AnyhowContext, Result};
use flate2::read::GzDecoder;
use flatref_fetcher::DEFAULT_USER_AGENT;
use reqwest::Client;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

pub const APPSTREAM_URL_TEMPLATE: &str =
    "https://dl.flathub.org/repo/appstream/{arch}/appstream.xml.gz";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn catalog_url(template: &str, arch: &str) -> String {
    template.replace("{arch}", arch)
}

/// Download the AppStream catalog and return the XML bytes.
pub async fn download_catalog(url: &str, timeout: Duration) -> Result<Vec<u8>> {
    let client = Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;

    log::info!("Fetching AppStream catalog from {url}");
    let payload = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Download failed: GET {url}"))?
        .error_for_status()
        .with_context(|| format!("Download failed: GET {url}"))?
        .bytes()
        .await
        .with_context(|| format!("Failed while reading HTTP body from {url}"))?;

    decompress_if_gzipped(payload.to_vec())
}

pub async fn read_catalog(path: &Path) -> Result<Vec<u8>> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    decompress_if_gzipped(raw)
}

/// Gzip is detected by its magic bytes; anything else is passed through.
pub fn decompress_if_gzipped(raw: Vec<u8>) -> Result<Vec<u8>> {
    if !raw.starts_with(&GZIP_MAGIC) {
        return Ok(raw);
    }
    let mut xml = Vec::with_capacity(raw.len() * 4);
    GzDecoder::new(raw.as_slice())
        .read_to_end(&mut xml)
        .context("Failed to decompress AppStream catalog")?;
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn catalog_url_substitutes_arch() {
        assert_eq!(
            catalog_url(APPSTREAM_URL_TEMPLATE, "aarch64"),
            "https://dl.flathub.org/repo/appstream/aarch64/appstream.xml.gz"
        );
    }

    #[test]
    fn gzip_payloads_are_inflated() {
        let xml = b"<components><component/></components>".to_vec();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&xml).unwrap();
        let gz = encoder.finish().unwrap();

        assert_eq!(decompress_if_gzipped(gz).unwrap(), xml);
    }

    #[test]
    fn plain_payloads_pass_through() {
        let xml = b"<components/>".to_vec();
        assert_eq!(decompress_if_gzipped(xml.clone()).unwrap(), xml);
    }

    #[test]
    fn truncated_gzip_is_an_error() {
        assert!(decompress_if_gzipped(vec![0x1f, 0x8b, 0x08]).is_err());
    }
}
