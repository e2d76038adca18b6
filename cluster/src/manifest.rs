//! Manifest-directory backend.
//!
//! Writes one Kubernetes manifest per object into a directory, ready for
//! `kubectl apply -f <dir>`. File names are `{kind}-{name}.json`; an existing file
//! counts as an existing object.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use slog::Logger;

use crate::error::ClusterError;
use crate::manager::{ClusterResourceManager, KeyStoreOutcome, ResourceHandle, ResourceKind};
use crate::resources::{ContainerSpec, EndpointSpec, KeyStoreSpec, PortSpec, WorkloadSpec};

/// Cluster backend that renders objects to manifest files.
pub struct ManifestDirCluster {
    dir: PathBuf,
    namespace: String,
    logger: Logger,
}

impl ManifestDirCluster {
    /// Open (creating if needed) the output directory.
    pub fn new<P: AsRef<Path>>(
        dir: P,
        namespace: impl Into<String>,
        logger: Logger,
    ) -> Result<Self, ClusterError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            namespace: namespace.into(),
            logger,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the manifest for `name` of `kind`.
    pub fn manifest_path(&self, kind: ResourceKind, name: &str) -> PathBuf {
        let prefix = match kind {
            ResourceKind::KeyStore => "configmap",
            ResourceKind::Workload => "deployment",
            ResourceKind::Endpoint => "service",
        };
        self.dir.join(format!("{prefix}-{name}.json"))
    }

    /// Write a manifest, failing if the file already exists.
    ///
    /// The manifest is staged beside its target and only linked into place once
    /// fully written, so `kubectl apply -f` never sees a partial file.
    fn write_new(&self, kind: ResourceKind, name: &str, manifest: &Value) -> Result<(), ClusterError> {
        let path = self.manifest_path(kind, name);
        let mut staged = tempfile::Builder::new()
            .prefix(".staging-")
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut staged, manifest)?;
        staged.write_all(b"\n")?;
        staged.as_file().sync_all()?;

        staged.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                ClusterError::AlreadyExists {
                    kind,
                    name: name.to_string(),
                }
            } else {
                e.error.into()
            }
        })?;
        slog::debug!(self.logger, "Wrote manifest"; "kind" => %kind, "path" => %path.display());
        Ok(())
    }

    fn metadata(&self, name: &str) -> Value {
        json!({ "name": name, "namespace": self.namespace })
    }

    fn config_map(&self, spec: &KeyStoreSpec) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": self.metadata(&spec.name),
            "data": spec.data,
        })
    }

    fn deployment(&self, spec: &WorkloadSpec) -> Value {
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": self.metadata(&spec.name),
            "spec": {
                "replicas": spec.replicas,
                "selector": { "matchLabels": spec.labels },
                "template": {
                    "metadata": { "labels": spec.labels },
                    "spec": {
                        "containers": spec.containers.iter().map(container).collect::<Vec<_>>(),
                    },
                },
            },
        })
    }

    fn service(&self, spec: &EndpointSpec) -> Value {
        let mut metadata = self.metadata(&spec.name);
        metadata["labels"] = json!({ "name": spec.name });
        json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": metadata,
            "spec": {
                "selector": spec.selector,
                "ports": spec.ports.iter().map(|p| json!({
                    "name": p.name,
                    "protocol": "TCP",
                    "port": p.port,
                    "targetPort": p.port,
                })).collect::<Vec<_>>(),
            },
        })
    }
}

fn container(spec: &ContainerSpec) -> Value {
    let mut value = json!({
        "name": spec.name,
        "image": spec.image,
    });
    if !spec.ports.is_empty() {
        value["ports"] = Value::Array(spec.ports.iter().map(container_port).collect());
    }
    if let Some(store) = &spec.env_from {
        value["envFrom"] = json!([{ "configMapRef": { "name": store } }]);
    }
    if let Some((program, args)) = spec.command.split_first() {
        value["command"] = json!([program]);
        value["args"] = json!(args);
    }
    value
}

fn container_port(port: &PortSpec) -> Value {
    json!({
        "name": port.name,
        "protocol": "TCP",
        "containerPort": port.port,
    })
}

impl ClusterResourceManager for ManifestDirCluster {
    fn create_shared_key_store(
        &mut self,
        spec: &KeyStoreSpec,
    ) -> Result<KeyStoreOutcome, ClusterError> {
        match self.write_new(ResourceKind::KeyStore, &spec.name, &self.config_map(spec)) {
            Ok(()) => Ok(KeyStoreOutcome::Created),
            Err(ClusterError::AlreadyExists { .. }) => {
                slog::info!(self.logger, "Found existing key store"; "name" => %spec.name);
                Ok(KeyStoreOutcome::Existing)
            }
            Err(e) => Err(e),
        }
    }

    fn read_shared_key_store(
        &self,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, ClusterError> {
        let path = self.manifest_path(ResourceKind::KeyStore, name);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let manifest: Value = serde_json::from_str(&contents)?;
        let data = match manifest.get("data") {
            Some(data) => serde_json::from_value(data.clone())?,
            None => BTreeMap::new(),
        };
        Ok(Some(data))
    }

    fn create_workload(&mut self, spec: &WorkloadSpec) -> Result<ResourceHandle, ClusterError> {
        self.write_new(ResourceKind::Workload, &spec.name, &self.deployment(spec))?;
        Ok(ResourceHandle::new(ResourceKind::Workload, &spec.name))
    }

    fn create_endpoint(&mut self, spec: &EndpointSpec) -> Result<ResourceHandle, ClusterError> {
        self.write_new(ResourceKind::Endpoint, &spec.name, &self.service(spec))?;
        Ok(ResourceHandle::new(ResourceKind::Endpoint, &spec.name))
    }
}
