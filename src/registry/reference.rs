//! Image References
//!
//! Splitting `registry/repository` image references.

pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Registry host and repository path of an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
}

impl ImageReference {
    /// Parse an image reference.
    ///
    /// The first `/`-separated segment is the registry only if it contains a
    /// `.` or a `:`; otherwise the registry is `docker.io` and the whole
    /// input is the repository. A bare hostname such as `registry/app` is
    /// therefore read as a Docker Hub repository.
    pub fn parse(image: &str) -> Self {
        match image.split_once('/') {
            Some((host, rest)) if host.contains('.') || host.contains(':') => Self {
                registry: host.to_string(),
                repository: rest.to_string(),
            },
            _ => Self {
                registry: DEFAULT_REGISTRY.to_string(),
                repository: image.to_string(),
            },
        }
    }

    /// `https://{registry}/v2/{repository}/manifests/{tag}`
    pub fn manifest_url(&self, tag: &str) -> String {
        format!(
            "https://{}/v2/{}/manifests/{}",
            self.registry, self.repository, tag
        )
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)
    }
}
