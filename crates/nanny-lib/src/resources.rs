//! Resource kinds, resource lists and estimation envelopes

use crate::quantity::{Quantity, QuantityError};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity as K8sQuantity;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A named quantity family managed by the nanny
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Cpu,
    Memory,
    Storage,
    Other(String),
}

impl ResourceKind {
    /// Name as it appears in a container's resource requirements
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Cpu => "cpu",
            ResourceKind::Memory => "memory",
            ResourceKind::Storage => "ephemeral-storage",
            ResourceKind::Other(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "cpu" => ResourceKind::Cpu,
            "memory" => ResourceKind::Memory,
            "storage" | "ephemeral-storage" => ResourceKind::Storage,
            other => ResourceKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ResourceKind::from_name(&name))
    }
}

/// A managed resource: a base amount plus an increment per cluster node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub name: ResourceKind,
    pub base: Quantity,
    pub extra_per_node: Quantity,
}

impl Resource {
    pub fn new(name: ResourceKind, base: Quantity, extra_per_node: Quantity) -> Self {
        Self {
            name,
            base,
            extra_per_node,
        }
    }

    /// `base + extra_per_node * nodes`, written in the increment's format
    pub fn scaled(&self, nodes: u64) -> Quantity {
        (self.base + self.extra_per_node.saturating_mul(nodes))
            .with_format(self.extra_per_node.format())
    }
}

/// Quantities keyed by resource kind
///
/// A missing key means the resource is not specified, which is different
/// from a zero quantity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceList(BTreeMap<ResourceKind, Quantity>);

impl ResourceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ResourceKind, quantity: Quantity) -> Option<Quantity> {
        self.0.insert(kind, quantity)
    }

    pub fn get(&self, kind: &ResourceKind) -> Option<&Quantity> {
        self.0.get(kind)
    }

    pub fn contains(&self, kind: &ResourceKind) -> bool {
        self.0.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKind, &Quantity)> {
        self.0.iter()
    }

    /// Parse a Kubernetes resource map (`{"cpu": "300m", ...}`)
    pub fn from_k8s(map: &BTreeMap<String, K8sQuantity>) -> Result<Self, QuantityError> {
        map.iter()
            .map(|(name, value)| {
                Quantity::try_from(value).map(|quantity| (ResourceKind::from_name(name), quantity))
            })
            .collect()
    }

    /// Render as a Kubernetes resource map
    pub fn to_k8s(&self) -> BTreeMap<String, K8sQuantity> {
        self.0
            .iter()
            .map(|(kind, quantity)| (kind.as_str().to_string(), K8sQuantity::from(quantity)))
            .collect()
    }
}

impl FromIterator<(ResourceKind, Quantity)> for ResourceList {
    fn from_iter<I: IntoIterator<Item = (ResourceKind, Quantity)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ResourceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (kind, quantity) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}={}", kind, quantity)?;
            first = false;
        }
        Ok(())
    }
}

/// Lower and upper bounding envelopes for one offset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceListPair {
    pub lower: ResourceList,
    pub upper: ResourceList,
}

/// Envelopes computed for a node count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EstimatorResult {
    /// Narrow band that corrections snap to
    pub recommended_range: ResourceListPair,
    /// Wide band whose crossing triggers a correction
    pub acceptable_range: ResourceListPair,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    #[test]
    fn test_resource_kind_names() {
        assert_eq!(ResourceKind::from_name("cpu"), ResourceKind::Cpu);
        assert_eq!(ResourceKind::from_name("storage"), ResourceKind::Storage);
        assert_eq!(ResourceKind::Storage.as_str(), "ephemeral-storage");
        assert_eq!(
            ResourceKind::from_name("nvidia.com/gpu"),
            ResourceKind::Other("nvidia.com/gpu".to_string())
        );
    }

    #[test]
    fn test_resource_kind_order_is_stable() {
        let mut kinds = vec![
            ResourceKind::Other("a".to_string()),
            ResourceKind::Storage,
            ResourceKind::Memory,
            ResourceKind::Cpu,
        ];
        kinds.sort();
        assert_eq!(kinds[0], ResourceKind::Cpu);
        assert_eq!(kinds[1], ResourceKind::Memory);
        assert_eq!(kinds[2], ResourceKind::Storage);
    }

    #[test]
    fn test_scaled_uses_increment_format() {
        let memory = Resource::new(ResourceKind::Memory, q("200Mi"), q("4Mi"));
        assert_eq!(memory.scaled(5).to_string(), "220Mi");

        let cpu = Resource::new(ResourceKind::Cpu, q("0.3"), q("10m"));
        assert_eq!(cpu.scaled(0), q("300m"));
        assert_eq!(cpu.scaled(10).to_string(), "400m");
    }

    #[test]
    fn test_resource_list_k8s_round_trip() {
        let mut raw = BTreeMap::new();
        raw.insert("cpu".to_string(), K8sQuantity("300m".to_string()));
        raw.insert("memory".to_string(), K8sQuantity("200Mi".to_string()));

        let list = ResourceList::from_k8s(&raw).unwrap();
        assert_eq!(list.get(&ResourceKind::Cpu), Some(&q("0.3")));
        assert_eq!(list.to_k8s(), raw);
    }

    #[test]
    fn test_resource_list_rejects_bad_quantity() {
        let mut raw = BTreeMap::new();
        raw.insert("cpu".to_string(), K8sQuantity("lots".to_string()));
        assert!(ResourceList::from_k8s(&raw).is_err());
    }

    #[test]
    fn test_resource_list_display() {
        let list: ResourceList = [
            (ResourceKind::Memory, q("200Mi")),
            (ResourceKind::Cpu, q("300m")),
        ]
        .into_iter()
        .collect();
        assert_eq!(list.to_string(), "cpu=300m,memory=200Mi");
    }
}
