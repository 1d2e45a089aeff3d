//! Image and volume registries

use crate::models::{DockerImage, DockerVolume};
use crate::reconcile::RandomSource;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Split `repo[:tag]`, defaulting the tag to `latest`.
///
/// Only a colon after the last `/` separates the tag, so registry ports
/// (`localhost:5000/app`) stay part of the repository.
pub fn parse_reference(reference: &str) -> (String, String) {
    let reference = reference.trim();
    let name_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    match reference[name_start..].rfind(':') {
        Some(offset) if name_start + offset + 1 < reference.len() => {
            let split = name_start + offset;
            (reference[..split].to_string(), reference[split + 1..].to_string())
        }
        Some(offset) => (reference[..name_start + offset].to_string(), "latest".to_string()),
        None => (reference.to_string(), "latest".to_string()),
    }
}

/// Rough download size in MB for a freshly pulled image
pub fn estimate_size_mb(repository: &str, rng: &mut dyn RandomSource) -> u32 {
    let (low, span) = if repository.contains("alpine") {
        (5.0, 10.0)
    } else if repository.contains("ubuntu") || repository.contains("debian") {
        (30.0, 50.0)
    } else if repository.contains("node") || repository.contains("python") {
        (100.0, 300.0)
    } else {
        (50.0, 500.0)
    };
    rng.uniform(low, low + span).floor() as u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    AlreadyPresent(DockerImage),
    Pulled(DockerImage),
}

impl PullOutcome {
    pub fn image(&self) -> &DockerImage {
        match self {
            PullOutcome::AlreadyPresent(image) | PullOutcome::Pulled(image) => image,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageRegistry {
    images: Arc<RwLock<Vec<DockerImage>>>,
}

impl ImageRegistry {
    pub fn new(images: Vec<DockerImage>) -> Self {
        Self {
            images: Arc::new(RwLock::new(images)),
        }
    }

    pub async fn list(&self) -> Vec<DockerImage> {
        self.images.read().await.clone()
    }

    pub async fn find(&self, repository: &str, tag: &str) -> Option<DockerImage> {
        self.images
            .read()
            .await
            .iter()
            .find(|i| i.repository == repository && i.tag == tag)
            .cloned()
    }

    /// Pull an image; new images go to the front of the list
    pub async fn pull(&self, reference: &str, size_mb: u32) -> PullOutcome {
        let (repository, tag) = parse_reference(reference);
        let mut images = self.images.write().await;

        if let Some(existing) = images
            .iter()
            .find(|i| i.repository == repository && i.tag == tag)
        {
            return PullOutcome::AlreadyPresent(existing.clone());
        }

        let image = new_image(repository, tag, format!("{}MB", size_mb));
        images.insert(0, image.clone());
        PullOutcome::Pulled(image)
    }

    /// Register an image referenced by a deployment if it is unknown.
    /// Returns the image when one was added.
    pub async fn ensure(&self, reference: &str) -> Option<DockerImage> {
        let (repository, tag) = parse_reference(reference);
        let mut images = self.images.write().await;
        if images
            .iter()
            .any(|i| i.repository == repository && i.tag == tag)
        {
            return None;
        }

        let image = new_image(repository, tag, "0MB".to_string());
        images.push(image.clone());
        Some(image)
    }

    pub async fn remove(&self, id: &str) -> Option<DockerImage> {
        let mut images = self.images.write().await;
        let index = images.iter().position(|i| i.id == id)?;
        Some(images.remove(index))
    }
}

fn new_image(repository: String, tag: String, size: String) -> DockerImage {
    DockerImage {
        id: format!("sha256:{}", &uuid::Uuid::new_v4().simple().to_string()[..8]),
        repository,
        tag,
        size,
        created: "Just now".to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct VolumeRegistry {
    volumes: Arc<RwLock<Vec<DockerVolume>>>,
}

impl VolumeRegistry {
    pub fn new(volumes: Vec<DockerVolume>) -> Self {
        Self {
            volumes: Arc::new(RwLock::new(volumes)),
        }
    }

    pub async fn list(&self) -> Vec<DockerVolume> {
        self.volumes.read().await.clone()
    }

    pub async fn remove(&self, name: &str) -> Option<DockerVolume> {
        let mut volumes = self.volumes.write().await;
        let index = volumes.iter().position(|v| v.name == name)?;
        Some(volumes.remove(index))
    }
}
