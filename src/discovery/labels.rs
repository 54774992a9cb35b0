//! Service labels from the manifest extension and the property store.
//!
//! # Responsibilities
//! - Read `<Label Key="...">` elements from the `Traefik2` manifest extension
//! - Enumerate string properties stored under the service name
//! - Merge both sources, property store last (last writer wins)
//!
//! # Design Decisions
//! - Only keys under the `traefik.` prefix are kept, from either source
//! - Missing or malformed manifest data contributes nothing, never an error
//! - Overwriting a key keeps its first insertion position

use futures_util::StreamExt;
use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use crate::cluster::{Application, ClusterQuery, ClusterResult, PropertyValue, Service, ServiceKind};
use crate::discovery::walker::TopologyWalker;

/// Prefix every label key carries.
pub const LABEL_PREFIX: &str = "traefik.";

/// Manifest extension holding the label document.
pub const EXTENSION_NAME: &str = "Traefik2";

/// Namespace of `<Label>` elements inside the extension.
pub const LABEL_NAMESPACE: &str = "http://schemas.microsoft.com/2015/03/fabact-no-schema";

/// Label key that opts a service in.
pub const ENABLE_LABEL: &str = "traefik.enable";

/// Ordered label key/value pairs for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    entries: IndexMap<String, String>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one label; keys outside the prefix are ignored.
    ///
    /// Returns `false` when the key was filtered out.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if !key.starts_with(LABEL_PREFIX) {
            return false;
        }
        self.entries.insert(key, value.into());
        true
    }

    /// Apply one source pass over the set.
    pub fn apply<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in pairs {
            self.insert(k, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether `traefik.enable` is the literal `true`.
    pub fn is_enabled(&self) -> bool {
        self.get(ENABLE_LABEL) == Some("true")
    }

    /// Labels whose key starts with `prefix`, in insertion order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.iter().filter(move |(k, _)| k.starts_with(prefix))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut labels = LabelSet::new();
        labels.apply(iter);
        labels
    }
}

/// Parse the `<Label Key="...">value</Label>` children of the document root.
///
/// A malformed document yields no labels at all.
pub fn parse_extension_labels(xml: &str) -> Vec<(String, String)> {
    let mut reader = NsReader::from_str(xml);
    let mut labels = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<(String, String)> = None;

    loop {
        let event = match reader.read_resolved_event() {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(error = %e, "Malformed label extension");
                return Vec::new();
            }
        };

        match event {
            (ns, Event::Start(start)) => {
                depth += 1;
                if depth == 2 && is_label(&ns, start.local_name().as_ref()) {
                    current = label_key(&start).map(|k| (k, String::new()));
                }
            }
            (ns, Event::Empty(start)) => {
                if depth == 1 && is_label(&ns, start.local_name().as_ref()) {
                    if let Some(key) = label_key(&start) {
                        labels.push((key, String::new()));
                    }
                }
            }
            (_, Event::Text(text)) => {
                if let Some((_, value)) = current.as_mut() {
                    match text.unescape() {
                        Ok(t) => value.push_str(&t),
                        Err(e) => {
                            tracing::debug!(error = %e, "Malformed label value");
                            return Vec::new();
                        }
                    }
                }
            }
            (_, Event::CData(data)) => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&data));
                }
            }
            (_, Event::End(_)) => {
                if depth == 2 {
                    if let Some(label) = current.take() {
                        labels.push(label);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    labels
}

fn is_label(ns: &ResolveResult, local_name: &[u8]) -> bool {
    local_name == b"Label"
        && matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == LABEL_NAMESPACE.as_bytes())
}

fn label_key(start: &quick_xml::events::BytesStart) -> Option<String> {
    let attr = start.try_get_attribute("Key").ok().flatten()?;
    attr.unescape_value().ok().map(|v| v.into_owned())
}

/// Collects the merged label set of a service.
pub struct LabelCollector<'w, 'a, C: ?Sized> {
    walker: &'w TopologyWalker<'a, C>,
}

impl<'w, 'a, C> LabelCollector<'w, 'a, C>
where
    C: ClusterQuery + ?Sized,
{
    pub fn new(walker: &'w TopologyWalker<'a, C>) -> Self {
        Self { walker }
    }

    /// Merged labels, or `None` for services that are not stateless.
    pub async fn collect(
        &self,
        application: &Application,
        service: &Service,
    ) -> ClusterResult<Option<LabelSet>> {
        if service.kind != ServiceKind::Stateless {
            return Ok(None);
        }

        let mut labels = LabelSet::new();
        labels.apply(self.manifest_labels(application, service).await?);
        labels.apply(self.property_labels(service).await?);

        tracing::debug!(service = %service.name, labels = labels.len(), "Collected labels");
        Ok(Some(labels))
    }

    async fn manifest_labels(
        &self,
        application: &Application,
        service: &Service,
    ) -> ClusterResult<Vec<(String, String)>> {
        let client = self.walker.client();
        let description = self
            .walker
            .context()
            .call(client.service_type(
                &application.type_name,
                &application.type_version,
                &service.type_name,
            ))
            .await?;

        let Some(xml) = description.and_then(|d| d.extensions.get(EXTENSION_NAME).cloned()) else {
            return Ok(Vec::new());
        };
        Ok(parse_extension_labels(&xml))
    }

    async fn property_labels(&self, service: &Service) -> ClusterResult<Vec<(String, String)>> {
        let mut properties = self.walker.properties(&service.name);
        let mut labels = Vec::new();

        while let Some(property) = properties.next().await {
            let property = property?;
            if let PropertyValue::String(value) = property.value {
                if property.name.starts_with(LABEL_PREFIX) {
                    labels.push((property.name, value));
                }
            }
        }
        Ok(labels)
    }
}
