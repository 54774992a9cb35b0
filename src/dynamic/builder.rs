//! Config tree builder.
//!
//! # Responsibilities
//! - Group router and service labels by local name
//! - Apply the label grammar, then fill router defaults
//! - Resolve backend servers for service objects without explicit servers
//! - Link routers to the first emitted service object of the same service
//!
//! # Data Flow
//! ```text
//! LabelSet ─┬─ traefik.http.routers.*  → router drafts → defaults ─────┐
//!           └─ traefik.http.services.* → service drafts → backends ─┴→ ServiceContribution
//! ServiceContribution (per service, walk order) → DynamicConfig::merge
//! ```

use indexmap::IndexMap;
use serde::Serialize;

use crate::cluster::{ClusterResult, ServiceName};
use crate::discovery::labels::LabelSet;
use crate::discovery::BackendSource;
use crate::dynamic::node::ConfigNode;
use crate::dynamic::schema::{self, LabelRule, ValueKind, ROUTER_RULES, SERVICE_RULES};

pub const ROUTER_PREFIX: &str = "traefik.http.routers.";
pub const SERVICE_PREFIX: &str = "traefik.http.services.";

/// `traefik`, `http`, family, local name, and at least one property.
const MIN_SEGMENTS: usize = 5;
const LOCAL_NAME_INDEX: usize = 3;

const DEFAULT_LOCAL_NAME: &str = "default";
const DEFAULT_ENTRY_POINT: &str = "http";
const DEFAULT_RULE: &str = "Host(`*`)";

/// Routers and service objects derived from one cluster service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceContribution {
    pub routers: IndexMap<String, ConfigNode>,
    pub services: IndexMap<String, ConfigNode>,
}

#[derive(Debug, Default)]
struct ServiceDraft {
    node: ConfigNode,
    endpoint: Option<String>,
}

/// Build the contribution of one service.
///
/// Returns `None` unless `traefik.enable` is `true`.
pub async fn build_service<B>(
    name: &ServiceName,
    labels: &LabelSet,
    backends: &B,
) -> ClusterResult<Option<ServiceContribution>>
where
    B: BackendSource + ?Sized,
{
    if !labels.is_enabled() {
        tracing::trace!(service = %name, "Service not enabled");
        return Ok(None);
    }

    let mut routers = build_routers(name, labels);
    let drafts = build_service_drafts(name, labels);

    let mut services = IndexMap::new();
    for (key, mut draft) in drafts {
        let servers = draft
            .node
            .child_mut("loadBalancer")
            .sequence_mut("servers");

        if servers.is_empty() {
            for url in backends.backends(draft.endpoint.as_deref()).await? {
                let mut server = ConfigNode::mapping();
                server.set_path(&["url"], ConfigNode::scalar(url));
                servers.push(server);
            }
        }

        if servers.is_empty() {
            tracing::debug!(service = %name, object = %key, "No backend servers, service object not emitted");
            continue;
        }
        services.insert(key, draft.node);
    }

    if let Some(first) = services.keys().next() {
        for router in routers.values_mut() {
            router.insert_default("service", ConfigNode::scalar(first.as_str()));
        }
    }

    Ok(Some(ServiceContribution { routers, services }))
}

/// Labels under `prefix`, grouped by object name in first-seen order.
///
/// Each entry carries the property segments that follow the local name.
fn group_labels<'l>(
    name: &ServiceName,
    labels: &'l LabelSet,
    prefix: &'l str,
) -> IndexMap<String, Vec<(Vec<&'l str>, &'l str)>> {
    let mut groups: IndexMap<String, Vec<_>> = IndexMap::new();

    for (key, value) in labels.with_prefix(prefix) {
        let segments: Vec<&str> = key.split('.').collect();
        if segments.len() < MIN_SEGMENTS {
            tracing::debug!(service = %name, label = %key, "Discarding malformed label key");
            continue;
        }

        let local = segments[LOCAL_NAME_INDEX];
        if local.trim().is_empty() {
            tracing::debug!(service = %name, label = %key, "Discarding label with empty name");
            continue;
        }

        groups
            .entry(name.object_name(local))
            .or_default()
            .push((segments[LOCAL_NAME_INDEX + 1..].to_vec(), value));
    }

    groups
}

fn build_routers(name: &ServiceName, labels: &LabelSet) -> IndexMap<String, ConfigNode> {
    let mut routers: IndexMap<String, ConfigNode> = group_labels(name, labels, ROUTER_PREFIX)
        .into_iter()
        .map(|(key, props)| {
            let mut node = ConfigNode::mapping();
            for (segments, value) in props {
                apply_router_label(name, &mut node, &segments, value);
            }
            (key, node)
        })
        .collect();

    if routers.is_empty() {
        routers.insert(name.object_name(DEFAULT_LOCAL_NAME), ConfigNode::mapping());
    }

    for router in routers.values_mut() {
        router.insert_default("entryPoints", ConfigNode::sequence([DEFAULT_ENTRY_POINT]));
        router.insert_default("rule", ConfigNode::scalar(DEFAULT_RULE));
    }

    routers
}

fn build_service_drafts(name: &ServiceName, labels: &LabelSet) -> IndexMap<String, ServiceDraft> {
    let mut drafts: IndexMap<String, ServiceDraft> = group_labels(name, labels, SERVICE_PREFIX)
        .into_iter()
        .map(|(key, props)| {
            let mut draft = ServiceDraft::default();
            for (segments, value) in props {
                apply_service_label(&mut draft, &segments, value);
            }
            (key, draft)
        })
        .collect();

    if drafts.is_empty() {
        drafts.insert(name.object_name(DEFAULT_LOCAL_NAME), ServiceDraft::default());
    }
    drafts
}

fn lookup(rules: &[LabelRule], segments: &[&str]) -> Option<schema::Match> {
    let found = schema::lookup(rules, segments);
    if found.is_none() {
        tracing::trace!(path = %segments.join("."), "Ignoring unknown label path");
    }
    found
}

fn apply_router_label(name: &ServiceName, router: &mut ConfigNode, segments: &[&str], value: &str) {
    let Some(m) = lookup(ROUTER_RULES, segments) else {
        return;
    };

    match m.kind {
        ValueKind::Scalar => router.set_path(&m.path, ConfigNode::scalar(value)),
        ValueKind::TlsFlag => {
            if value.trim().eq_ignore_ascii_case("true") {
                m.path.iter().fold(router, |node, key| node.child_mut(key));
            }
        }
        ValueKind::MiddlewareList => {
            let entries = value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| format!("{}@file", name.object_name(entry)));
            router.set_path(&m.path, ConfigNode::sequence(entries));
        }
        ValueKind::EndpointSelector => {}
    }
}

fn apply_service_label(draft: &mut ServiceDraft, segments: &[&str], value: &str) {
    let Some(m) = lookup(SERVICE_RULES, segments) else {
        return;
    };

    match m.kind {
        ValueKind::EndpointSelector => {
            let value = value.trim();
            draft.endpoint = (!value.is_empty()).then(|| value.to_string());
        }
        ValueKind::Scalar => draft.node.set_path(&m.path, ConfigNode::scalar(value)),
        ValueKind::TlsFlag | ValueKind::MiddlewareList => {}
    }
}

/// The generated dynamic configuration document.
///
/// Empty until the first enabled service is merged; from then on it holds
/// `http.routers`, `http.services` and an empty `http.middlewares`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DynamicConfig {
    root: ConfigNode,
}

impl DynamicConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one service's contribution, in walk order.
    pub fn merge(&mut self, contribution: ServiceContribution) {
        let http = self.root.child_mut("http");
        http.child_mut("routers");
        http.child_mut("services");
        http.child_mut("middlewares");

        for (family, objects) in [
            ("routers", contribution.routers),
            ("services", contribution.services),
        ] {
            let target = http.child_mut(family).mapping_mut();
            for (key, node) in objects {
                if target.insert(key.clone(), node).is_some() {
                    tracing::warn!(family, object = %key, "Duplicate object name, later definition wins");
                }
            }
        }
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    pub fn router(&self, key: &str) -> Option<&ConfigNode> {
        self.root.get_path(&["http", "routers", key])
    }

    pub fn service(&self, key: &str) -> Option<&ConfigNode> {
        self.root.get_path(&["http", "services", key])
    }

    pub fn router_count(&self) -> usize {
        self.family_len("routers")
    }

    pub fn service_count(&self) -> usize {
        self.family_len("services")
    }

    fn family_len(&self, family: &str) -> usize {
        self.root
            .get_path(&["http", family])
            .and_then(ConfigNode::as_mapping)
            .map_or(0, |m| m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.root.as_mapping().map_or(true, |m| m.is_empty())
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.root)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.root)
    }
}
