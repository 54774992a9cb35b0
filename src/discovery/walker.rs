//! Paginated topology enumeration.
//!
//! # Responsibilities
//! - Turn page-at-a-time cluster queries into lazy item streams
//! - Follow continuation tokens until the upstream reports no more data
//! - Run every page fetch under the poll cycle's `CallContext`
//!
//! # Design Decisions
//! - Each call returns a fresh stream; streams are not restartable
//! - Items are yielded in upstream order, never re-sorted
//! - The first error ends the stream

use std::future::Future;

use futures_util::stream::BoxStream;

use crate::cluster::{
    Application, CallContext, ClusterQuery, ClusterResult, ContinuationToken, Page, Partition,
    PartitionId, Property, Replica, Service, ServiceName,
};

/// Drain a paginated query into a stream of items.
pub fn paginate<'a, T, F, Fut>(ctx: CallContext, mut fetch: F) -> BoxStream<'a, ClusterResult<T>>
where
    T: Send + 'a,
    F: FnMut(Option<ContinuationToken>) -> Fut + Send + 'a,
    Fut: Future<Output = ClusterResult<Page<T>>> + Send + 'a,
{
    Box::pin(async_stream::try_stream! {
        let mut token = None;
        loop {
            let page = ctx.call(fetch(token.take())).await?;
            let next = page.next_token().cloned();
            for item in page.items {
                yield item;
            }
            match next {
                Some(t) => token = Some(t),
                None => break,
            }
        }
    })
}

/// Lazy walk over applications, services, partitions and replicas.
pub struct TopologyWalker<'a, C: ?Sized> {
    client: &'a C,
    ctx: CallContext,
}

impl<'a, C> TopologyWalker<'a, C>
where
    C: ClusterQuery + ?Sized,
{
    pub fn new(client: &'a C, ctx: CallContext) -> Self {
        Self { client, ctx }
    }

    pub fn client(&self) -> &'a C {
        self.client
    }

    pub fn context(&self) -> &CallContext {
        &self.ctx
    }

    pub fn applications(&self) -> BoxStream<'a, ClusterResult<Application>> {
        let client = self.client;
        paginate(self.ctx.clone(), move |token| client.applications(token))
    }

    pub fn services(&self, application: &ServiceName) -> BoxStream<'a, ClusterResult<Service>> {
        let client = self.client;
        let application = application.clone();
        paginate(self.ctx.clone(), move |token| {
            let application = application.clone();
            async move { client.services(&application, token).await }
        })
    }

    pub fn partitions(&self, service: &ServiceName) -> BoxStream<'a, ClusterResult<Partition>> {
        let client = self.client;
        let service = service.clone();
        paginate(self.ctx.clone(), move |token| {
            let service = service.clone();
            async move { client.partitions(&service, token).await }
        })
    }

    pub fn replicas(&self, partition: &PartitionId) -> BoxStream<'a, ClusterResult<Replica>> {
        let client = self.client;
        let partition = partition.clone();
        paginate(self.ctx.clone(), move |token| {
            let partition = partition.clone();
            async move { client.replicas(&partition, token).await }
        })
    }

    pub fn properties(&self, name: &ServiceName) -> BoxStream<'a, ClusterResult<Property>> {
        let client = self.client;
        let name = name.clone();
        paginate(self.ctx.clone(), move |token| {
            let name = name.clone();
            async move { client.properties(&name, token).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterError;
    use futures_util::TryStreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn pages() -> Vec<Page<u32>> {
        vec![
            Page::new(vec![1, 2], Some(ContinuationToken("p2".into()))),
            Page::new(vec![3], Some(ContinuationToken("p3".into()))),
            Page::last(vec![4, 5]),
        ]
    }

    #[tokio::test]
    async fn test_paginate_follows_tokens_in_order() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_fetch = seen.clone();
        let stream = paginate(CallContext::default(), move |token: Option<ContinuationToken>| {
            let idx = match token.as_ref().map(|t| t.as_str()) {
                None => 0,
                Some("p2") => 1,
                Some(_) => 2,
            };
            seen_fetch.lock().unwrap().push(token);
            let page = pages().remove(idx);
            async move { Ok(page) }
        });

        let items: Vec<u32> = stream.try_collect().await.unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], None);
        assert_eq!(seen[2], Some(ContinuationToken("p3".into())));
    }

    #[tokio::test]
    async fn test_paginate_stops_when_no_more_data() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let stream = paginate(CallContext::default(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut page = Page::new(vec![1u8], Some(ContinuationToken("again".into())));
            page.has_more = false;
            async move { Ok(page) }
        });

        let items: Vec<u8> = stream.try_collect().await.unwrap();
        assert_eq!(items, vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_paginate_stops_on_empty_page() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let stream = paginate(CallContext::default(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            let page = Page::<u8>::new(Vec::new(), Some(ContinuationToken("loop".into())));
            async move { Ok(page) }
        });

        let items: Vec<u8> = stream.try_collect().await.unwrap();
        assert!(items.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_paginate_surfaces_errors() {
        let stream = paginate(CallContext::default(), |token: Option<ContinuationToken>| async move {
            match token {
                None => Ok(Page::new(vec![1u8], Some(ContinuationToken("x".into())))),
                Some(_) => Err(ClusterError::Http("connection reset".into())),
            }
        });

        let result: Result<Vec<u8>, _> = stream.try_collect().await;
        assert!(matches!(result, Err(ClusterError::Http(_))));
    }
}
