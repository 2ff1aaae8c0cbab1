//! Kubernetes-backed cluster state
//!
//! Node counts come from a reflector fed by a node watcher running in a
//! background task. The managed container is read from and written to its
//! Deployment with plain `get`/`replace` calls.

use super::{ClusterError, ClusterState, ManagedSpec};
use crate::health::{components, HealthRegistry};
use crate::resources::ResourceList;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, Node, ResourceRequirements};
use kube::api::{Api, PostParams};
use kube::runtime::reflector::{self, Store};
use kube::runtime::watcher;
use kube::Client;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Delay before polling the node watcher again after an error
const WATCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Identifies the container whose resources are managed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRef {
    pub namespace: String,
    pub deployment: String,
    pub container: String,
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.deployment, self.container)
    }
}

/// Cluster state backed by the Kubernetes API
pub struct KubeCluster {
    deployments: Api<Deployment>,
    workload: WorkloadRef,
    nodes: Store<Node>,
    synced: watch::Receiver<bool>,
    watcher_task: JoinHandle<()>,
}

impl KubeCluster {
    /// Start watching nodes and bind to the given workload
    pub fn new(client: Client, workload: WorkloadRef, health: HealthRegistry) -> Self {
        let deployments = Api::namespaced(client.clone(), &workload.namespace);
        let (nodes, writer) = reflector::store::<Node>();
        let (synced_tx, synced) = watch::channel(false);

        let node_api: Api<Node> = Api::all(client);
        let watcher_task = tokio::spawn(async move {
            let stream = reflector::reflector(writer, watcher(node_api, watcher::Config::default()));
            let mut stream = Box::pin(stream);

            info!("Starting node watcher");
            while let Some(event) = stream.next().await {
                match event {
                    Ok(watcher::Event::Restarted(nodes)) => {
                        debug!(nodes = nodes.len(), "Node listing received");
                        synced_tx.send_replace(true);
                        health.set_healthy(components::NODE_WATCHER).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Node watcher error");
                        health
                            .record_failure(components::NODE_WATCHER, e.to_string())
                            .await;
                        tokio::time::sleep(WATCH_RETRY_DELAY).await;
                    }
                }
            }
            warn!("Node watcher stream ended");
            health
                .set_unhealthy(components::NODE_WATCHER, "watch stream ended")
                .await;
        });

        Self {
            deployments,
            workload,
            nodes,
            synced,
            watcher_task,
        }
    }

    pub fn workload(&self) -> &WorkloadRef {
        &self.workload
    }

    async fn get_deployment(&self) -> Result<Deployment, ClusterError> {
        self.deployments
            .get_opt(&self.workload.deployment)
            .await
            .map_err(|e| classify(e, &self.workload))?
            .ok_or_else(|| ClusterError::NotFound {
                kind: "deployment",
                name: format!("{}/{}", self.workload.namespace, self.workload.deployment),
            })
    }

    fn container_not_found(&self) -> ClusterError {
        ClusterError::NotFound {
            kind: "container",
            name: self.workload.to_string(),
        }
    }
}

impl Drop for KubeCluster {
    fn drop(&mut self) {
        self.watcher_task.abort();
    }
}

#[async_trait]
impl ClusterState for KubeCluster {
    async fn count_members(&self) -> Result<u64, ClusterError> {
        let mut synced = self.synced.clone();
        synced
            .wait_for(|ready| *ready)
            .await
            .map_err(|_| ClusterError::Transient("node watcher stopped".to_string()))?;
        Ok(self.nodes.state().len() as u64)
    }

    async fn read_managed_spec(&self) -> Result<ManagedSpec, ClusterError> {
        let deployment = self.get_deployment().await?;
        let container = find_container(&deployment, &self.workload.container)
            .ok_or_else(|| self.container_not_found())?;

        let resources = container.resources.clone().unwrap_or_default();
        let limits = match &resources.limits {
            Some(map) => ResourceList::from_k8s(map)?,
            None => ResourceList::new(),
        };
        let requests = match &resources.requests {
            Some(map) => ResourceList::from_k8s(map)?,
            None => ResourceList::new(),
        };

        Ok(ManagedSpec { limits, requests })
    }

    async fn write_managed_spec(
        &self,
        limits: &ResourceList,
        requests: &ResourceList,
    ) -> Result<(), ClusterError> {
        let mut deployment = self.get_deployment().await?;
        let container = find_container_mut(&mut deployment, &self.workload.container)
            .ok_or_else(|| self.container_not_found())?;

        let claims = container.resources.take().and_then(|r| r.claims);
        container.resources = Some(ResourceRequirements {
            claims,
            limits: Some(limits.to_k8s()),
            requests: Some(requests.to_k8s()),
        });

        self.deployments
            .replace(&self.workload.deployment, &PostParams::default(), &deployment)
            .await
            .map_err(|e| classify(e, &self.workload))?;
        Ok(())
    }
}

fn find_container<'a>(deployment: &'a Deployment, name: &str) -> Option<&'a Container> {
    deployment
        .spec
        .as_ref()?
        .template
        .spec
        .as_ref()?
        .containers
        .iter()
        .find(|c| c.name == name)
}

fn find_container_mut<'a>(deployment: &'a mut Deployment, name: &str) -> Option<&'a mut Container> {
    deployment
        .spec
        .as_mut()?
        .template
        .spec
        .as_mut()?
        .containers
        .iter_mut()
        .find(|c| c.name == name)
}

/// Map API failures onto the collaborator error taxonomy
fn classify(err: kube::Error, workload: &WorkloadRef) -> ClusterError {
    if let kube::Error::Api(response) = &err {
        if response.code == 404 {
            return ClusterError::NotFound {
                kind: "deployment",
                name: format!("{}/{}", workload.namespace, workload.deployment),
            };
        }
        // Conflicts and server-side failures clear up on a later poll
        if response.code == 409 || response.code >= 500 {
            return ClusterError::Transient(response.message.clone());
        }
    }
    ClusterError::Kube(err)
}
