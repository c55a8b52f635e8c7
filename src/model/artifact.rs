//! Model artifact store: network weights as JSON at a filesystem path.
//! A missing artifact is not an error; the caller constructs a fresh network.

use super::network::NetworkWeights;
use crate::error::{EngineError, Result};
use std::io::ErrorKind;
use std::path::Path;

pub async fn load(path: &Path) -> Result<Option<NetworkWeights>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(EngineError::ModelUnavailable(format!(
                "cannot read artifact {}: {e}",
                path.display()
            )))
        }
    };
    serde_json::from_slice(&bytes).map(Some).map_err(|e| {
        EngineError::ModelUnavailable(format!("artifact {} is corrupt: {e}", path.display()))
    })
}

/// Write via a sibling temp file and rename, so readers never see a partial artifact.
pub async fn save(path: &Path, weights: &NetworkWeights) -> Result<()> {
    let storage = |e: std::io::Error| {
        EngineError::Storage(format!("cannot write artifact {}: {e}", path.display()))
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(storage)?;
    }
    let payload = serde_json::to_vec(weights)
        .map_err(|e| EngineError::Storage(format!("cannot encode artifact: {e}")))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, payload).await.map_err(storage)?;
    tokio::fs::rename(&tmp, path).await.map_err(storage)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::network::{Architecture, Network};

    #[tokio::test]
    async fn missing_artifact_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.json")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/model.json");
        let weights = Network::new(Architecture::difficulty(), 5).unwrap().weights();
        save(&path, &weights).await.unwrap();
        assert_eq!(load(&path).await.unwrap(), Some(weights));
    }

    #[tokio::test]
    async fn corrupt_artifact_is_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            load(&path).await,
            Err(EngineError::ModelUnavailable(_))
        ));
    }
}
