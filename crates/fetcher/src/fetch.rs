use crate::config::FetchConfig;
use crate::{FetchError, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Downloads descriptors for application ids, trying each endpoint in order
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        if config.endpoints.is_empty() {
            return Err(FetchError::NoEndpoints);
        }
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn destination(&self, app_id: &str, output_dir: &Path) -> PathBuf {
        output_dir.join(self.config.file_name_for(app_id))
    }

    /// Fetch the descriptor for `app_id` into `output_dir`.
    ///
    /// With `skip_existing`, a present non-empty destination is returned as is and no
    /// request is made. Otherwise the first endpoint that answers with a success status
    /// wins; its body is written to a temporary sibling and renamed into place.
    pub async fn fetch(
        &self,
        app_id: &str,
        output_dir: &Path,
        skip_existing: bool,
        timeout: Duration,
    ) -> Result<PathBuf> {
        let dest = self.destination(app_id, output_dir);
        if skip_existing && is_complete(&dest).await {
            log::debug!("Skipping {app_id}: {} already present", dest.display());
            return Ok(dest);
        }

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|err| FetchError::io(output_dir, err))?;

        let mut attempts = 0usize;
        let mut last_error = None;
        for url in self.config.urls_for(app_id) {
            attempts += 1;
            match self.download(&url, timeout).await {
                Ok(payload) => {
                    write_replacing(&dest, &payload).await?;
                    log::debug!("GET {url} -> {} ({} bytes)", dest.display(), payload.len());
                    return Ok(dest);
                }
                Err(err) => {
                    log::debug!("GET {url} failed: {err}");
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(source) => Err(FetchError::AllEndpointsFailed {
                app_id: app_id.to_string(),
                attempts,
                source,
            }),
            None => Err(FetchError::NoEndpoints),
        }
    }

    async fn download(
        &self,
        url: &str,
        timeout: Duration,
    ) -> std::result::Result<Vec<u8>, reqwest::Error> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

async fn is_complete(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

async fn write_replacing(dest: &Path, payload: &[u8]) -> Result<()> {
    let tmp = temp_path_for(dest);
    if let Err(err) = tokio::fs::write(&tmp, payload).await {
        tokio::fs::remove_file(&tmp).await.ok();
        return Err(FetchError::io(&tmp, err));
    }
    if let Err(err) = tokio::fs::rename(&tmp, dest).await {
        tokio::fs::remove_file(&tmp).await.ok();
        return Err(FetchError::io(dest, err));
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    PathBuf::from(format!("{}.{}.download", path.display(), ts))
}
