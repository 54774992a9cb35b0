//! Service Fabric HTTP gateway client.
//!
//! # Responsibilities
//! - Build gateway URLs (ids, api-version, continuation tokens)
//! - Decode PascalCase JSON payloads into topology types
//! - Map transport failures and status codes into `ClusterError`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::cluster::error::{ClusterError, ClusterResult};
use crate::cluster::types::{
    Application, ContinuationToken, Page, Partition, PartitionId, PartitionKind, Property,
    PropertyValue, Replica, Service, ServiceKind, ServiceName, ServiceTypeDescription,
};
use crate::cluster::ClusterQuery;
use crate::config::ClusterConfig;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PagedList<T> {
    #[serde(default)]
    continuation_token: Option<String>,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

impl<T> PagedList<T> {
    fn into_page<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page::new(
            self.items.into_iter().map(f).collect(),
            ContinuationToken::from_raw(self.continuation_token),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplicationItem {
    name: String,
    type_name: String,
    type_version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceItem {
    name: String,
    type_name: String,
    service_kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PartitionItem {
    partition_information: PartitionInformation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PartitionInformation {
    service_partition_kind: String,
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReplicaItem {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceTypeItem {
    service_type_description: ServiceTypeDescriptionItem,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceTypeDescriptionItem {
    service_type_name: String,
    #[serde(default)]
    extensions: Vec<ExtensionItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExtensionItem {
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PropertyList {
    #[serde(default)]
    continuation_token: Option<String>,
    #[serde(default)]
    properties: Vec<PropertyItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PropertyItem {
    name: String,
    value: PropertyValueItem,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PropertyValueItem {
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl From<PropertyItem> for Property {
    fn from(item: PropertyItem) -> Self {
        let value = match (item.value.kind.as_str(), item.value.data) {
            ("String", serde_json::Value::String(s)) => PropertyValue::String(s),
            _ => PropertyValue::Other,
        };
        Property {
            name: item.name,
            value,
        }
    }
}

/// `ClusterQuery` over the Service Fabric REST API.
#[derive(Debug, Clone)]
pub struct RestClusterClient {
    http: reqwest::Client,
    base: Url,
    api_version: String,
}

impl RestClusterClient {
    pub fn new(config: &ClusterConfig) -> ClusterResult<Self> {
        let base: Url = config.endpoint.parse().map_err(|e| {
            ClusterError::Http(format!("invalid cluster endpoint '{}': {}", config.endpoint, e))
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClusterError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base,
            api_version: config.api_version.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> ClusterResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClusterError::Http(format!("cluster endpoint '{}' cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(segments);

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", &self.api_version);
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// GET and decode; `Ok(None)` on 404.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> ClusterResult<Option<T>> {
        let path = url.path().to_string();
        tracing::trace!(url = %url, "Cluster query");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ClusterError::Http(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ClusterError::Status {
                status: status.as_u16(),
                path,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ClusterError::Http(e.to_string()))?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| ClusterError::Decode(format!("{}: {}", path, e)))
    }

    async fn get_required<T: DeserializeOwned>(&self, url: Url) -> ClusterResult<T> {
        let path = url.path().to_string();
        self.get(url)
            .await?
            .ok_or(ClusterError::Status { status: 404, path })
    }
}

fn continuation_query(continuation: &Option<ContinuationToken>) -> Vec<(&'static str, &str)> {
    continuation
        .iter()
        .map(|t| ("ContinuationToken", t.as_str()))
        .collect()
}

#[async_trait]
impl ClusterQuery for RestClusterClient {
    async fn applications(
        &self,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Application>> {
        let url = self.url(&["Applications"], &continuation_query(&continuation))?;
        let list: PagedList<ApplicationItem> = self.get_required(url).await?;
        Ok(list.into_page(|a| Application {
            name: ServiceName::parse(&a.name),
            type_name: a.type_name,
            type_version: a.type_version,
        }))
    }

    async fn services(
        &self,
        application: &ServiceName,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Service>> {
        let id = application.id();
        let url = self.url(
            &["Applications", &id, "$", "GetServices"],
            &continuation_query(&continuation),
        )?;
        let list: PagedList<ServiceItem> = self.get_required(url).await?;
        Ok(list.into_page(|s| Service {
            name: ServiceName::parse(&s.name),
            type_name: s.type_name,
            kind: ServiceKind::parse(&s.service_kind),
        }))
    }

    async fn partitions(
        &self,
        service: &ServiceName,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Partition>> {
        let id = service.id();
        let url = self.url(
            &["Services", &id, "$", "GetPartitions"],
            &continuation_query(&continuation),
        )?;
        let list: PagedList<PartitionItem> = self.get_required(url).await?;
        Ok(list.into_page(|p| Partition {
            id: PartitionId(p.partition_information.id),
            kind: PartitionKind::parse(&p.partition_information.service_partition_kind),
        }))
    }

    async fn replicas(
        &self,
        partition: &PartitionId,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Replica>> {
        let url = self.url(
            &["Partitions", &partition.0, "$", "GetReplicas"],
            &continuation_query(&continuation),
        )?;
        let list: PagedList<ReplicaItem> = self.get_required(url).await?;
        Ok(list.into_page(|r| Replica { address: r.address }))
    }

    async fn service_type(
        &self,
        application_type: &str,
        application_version: &str,
        service_type: &str,
    ) -> ClusterResult<Option<ServiceTypeDescription>> {
        let url = self.url(
            &["ApplicationTypes", application_type, "$", "GetServiceTypes"],
            &[("ApplicationTypeVersion", application_version)],
        )?;
        let types: Option<Vec<ServiceTypeItem>> = self.get(url).await?;

        Ok(types.unwrap_or_default().into_iter().find_map(|t| {
            let description = t.service_type_description;
            (description.service_type_name == service_type).then(|| ServiceTypeDescription {
                extensions: description
                    .extensions
                    .into_iter()
                    .map(|e| (e.key, e.value))
                    .collect(),
            })
        }))
    }

    async fn properties(
        &self,
        name: &ServiceName,
        continuation: Option<ContinuationToken>,
    ) -> ClusterResult<Page<Property>> {
        let id = name.id();
        let mut query = vec![("IncludeValues", "true")];
        query.extend(continuation_query(&continuation));
        let url = self.url(&["Names", &id, "$", "GetProperties"], &query)?;

        let Some(list) = self.get::<PropertyList>(url).await? else {
            return Ok(Page::last(Vec::new()));
        };
        Ok(Page::new(
            list.properties.into_iter().map(Property::from).collect(),
            ContinuationToken::from_raw(list.continuation_token),
        ))
    }
}
