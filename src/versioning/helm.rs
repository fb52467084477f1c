use super::{Coordinates, VersionedArtifact, VersioningError, VersioningScheme};
use crate::descriptor::{self, YamlDescriptor};
use std::path::{Path, PathBuf};

const CHART_PATTERN: &str = "**/Chart.yaml";

/// Helm chart adapter (`Chart.yaml`).
///
/// Without an explicit path the first `Chart.yaml` below the working
/// directory is used.
#[derive(Debug)]
pub struct HelmChart {
    path: Option<PathBuf>,
    update_app_version: bool,
    chart: Option<YamlDescriptor>,
}

impl HelmChart {
    /// Adapter for a chart; `update_app_version` also rewrites `appVersion`.
    #[must_use]
    pub fn new(path: Option<PathBuf>, update_app_version: bool) -> Self {
        Self {
            path,
            update_app_version,
            chart: None,
        }
    }

    fn chart(&mut self) -> Result<&mut YamlDescriptor, VersioningError> {
        let chart = match self.chart.take() {
            Some(chart) => chart,
            None => {
                let path = match &self.path {
                    Some(path) => path.clone(),
                    None => descriptor::find_first(CHART_PATTERN).ok_or_else(|| {
                        VersioningError::Configuration(
                            "failed to find a helm chart file".to_string(),
                        )
                    })?,
                };
                tracing::debug!(path = %path.display(), "Using helm chart");
                self.path = Some(path.clone());
                YamlDescriptor::load(&path).map_err(|e| match e {
                    VersioningError::Parse { path, .. } => {
                        VersioningError::parse(path, "helm chart content invalid")
                    }
                    other => other,
                })?
            }
        };
        Ok(self.chart.insert(chart))
    }
}

/// Kubernetes labels do not allow `+`.
fn app_version(version: &str) -> String {
    version.replace('+', "_")
}

impl VersionedArtifact for HelmChart {
    fn versioning_scheme(&self) -> VersioningScheme {
        VersioningScheme::Semver2
    }

    fn get_version(&mut self) -> Result<String, VersioningError> {
        let chart = self.chart()?;
        chart
            .get("version")
            .ok_or_else(|| VersioningError::field_not_found(chart.path(), "version"))
    }

    fn set_version(&mut self, version: &str) -> Result<(), VersioningError> {
        let update_app_version = self.update_app_version;
        let chart = self.chart()?;
        chart.set("version", version);
        if update_app_version {
            chart.set("appVersion", &app_version(version));
        }
        chart.save()?;
        tracing::info!(path = %chart.path().display(), version, update_app_version, "Updated helm chart version");
        Ok(())
    }

    fn get_coordinates(&mut self) -> Result<Coordinates, VersioningError> {
        let version = self.get_version()?;
        let chart = self.chart()?;
        Ok(Coordinates {
            group_id: chart.get("home").unwrap_or_default(),
            artifact_id: chart.get("name").unwrap_or_default(),
            version,
            packaging: String::new(),
        })
    }

    fn descriptor_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
