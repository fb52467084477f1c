//! End-to-end versioning scenarios through the public factory

use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use steplib::errors::ErrorKind;
use steplib::project::{DEFAULT_NAME_TEMPLATE, determine_project_coordinates};
use steplib::versioning::maven::MockMavenRunner;
use steplib::versioning::{Coordinates, Options, get_artifact, get_artifact_with_runner};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn maven_project_coordinates_are_normalized() {
    let dir = TempDir::new().unwrap();
    let pom = write(
        &dir,
        "pom.xml",
        "<project><groupId>${groupId}</groupId><artifactId>analyzer</artifactId></project>",
    );
    let runner = MockMavenRunner::new()
        .with_value("project.groupId", "com.test.pkg")
        .with_value("project.artifactId", "analyzer")
        .with_value("project.version", "1.2.3-7864387648746")
        .with_value("project.packaging", "jar");

    let mut artifact =
        get_artifact_with_runner("maven", Some(&pom), &Options::default(), Arc::new(runner))
            .unwrap();
    let coordinates = artifact.get_coordinates().unwrap();
    let (name, version) =
        determine_project_coordinates(DEFAULT_NAME_TEMPLATE, "semantic", &coordinates);

    assert_eq!(name, "com.test.pkg-analyzer");
    assert_eq!(version, "1.2.3");
}

#[test]
fn pyproject_update_is_visible_in_coordinates() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "pyproject.toml",
        "[project]\nname = \"sampleproject\"\nversion = \"4.0.0\"\nrequires-python = \">=3.8\"\n",
    );

    let mut artifact = get_artifact("pyproject", Some(&path), &Options::default()).unwrap();
    artifact.set_version("5.0.0").unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("version = \"5.0.0\""));
    assert!(content.contains("requires-python = \">=3.8\""));

    let mut reread = get_artifact("pyproject", Some(&path), &Options::default()).unwrap();
    assert_eq!(
        reread.get_coordinates().unwrap(),
        Coordinates {
            group_id: String::new(),
            artifact_id: "sampleproject".to_string(),
            version: "5.0.0".to_string(),
            packaging: String::new(),
        }
    );
}

#[test]
fn pyproject_update_ignores_other_tables() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "pyproject.toml",
        "[tool.bumpversion]\ncurrent_version = \"4.0.0\"\n\n[project]\nname = \"sampleproject\"\nversion = \"4.0.0\"\n",
    );

    let mut artifact = get_artifact("pyproject", Some(&path), &Options::default()).unwrap();
    artifact.set_version("5.0.0").unwrap();

    let mut reread = get_artifact("pyproject", Some(&path), &Options::default()).unwrap();
    assert_eq!(reread.get_version().unwrap(), "5.0.0");
    assert!(
        std::fs::read_to_string(&path)
            .unwrap()
            .contains("current_version = \"4.0.0\"")
    );
}

#[test]
fn go_module_without_version_file_is_unspecified() {
    let dir = TempDir::new().unwrap();
    let modfile = write(
        &dir,
        "go.mod",
        "module github.com/SAP/jenkins-library\n\ngo 1.22\n",
    );

    let mut artifact = get_artifact("golang", Some(&modfile), &Options::default()).unwrap();
    assert_eq!(
        artifact.get_coordinates().unwrap(),
        Coordinates {
            group_id: "github.com/SAP".to_string(),
            artifact_id: "jenkins-library".to_string(),
            version: "unspecified".to_string(),
            packaging: String::new(),
        }
    );
}

#[test]
fn docker_version_from_base_image() {
    let dir = TempDir::new().unwrap();
    let options = Options::default().with_version_source("FROM");

    let tagged = write(&dir, "tagged/Dockerfile", "FROM golang:1.22.3 AS build\n");
    let mut artifact = get_artifact("docker", Some(&tagged), &options).unwrap();
    assert_eq!(artifact.get_version().unwrap(), "1.22.3");

    let untagged = write(&dir, "untagged/Dockerfile", "FROM scratch\n");
    let mut artifact = get_artifact("docker", Some(&untagged), &options).unwrap();
    let err = artifact.get_version().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FieldNotFound);
}

#[test]
fn helm_app_version_has_no_plus() {
    let dir = TempDir::new().unwrap();
    let chart = write(
        &dir,
        "chart/Chart.yaml",
        "apiVersion: v2\nname: app\nversion: 1.2.3\nappVersion: 1.2.3\n",
    );
    let options = Options {
        helm_update_app_version: true,
        ..Options::default()
    };

    let mut artifact = get_artifact("helm", Some(&chart), &options).unwrap();
    artifact.set_version("1.2.4+build").unwrap();

    let content: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(&chart).unwrap()).unwrap();
    assert_eq!(content["version"].as_str(), Some("1.2.4+build"));
    assert_eq!(content["appVersion"].as_str(), Some("1.2.4_build"));
}

#[test]
fn unknown_build_tool_is_configuration_error() {
    let err = get_artifact("ant", Some(Path::new("build.xml")), &Options::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
