//! Order-details enrichment cache.
//!
//! Details never change once an order is registered, so the cache is
//! additive for the life of the process. Lookups that fail are cached as
//! absent rather than retried every refresh, and concurrent lookups for
//! the same order share one upstream request.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::warn;

use crate::adapter::parse_timestamp;
use crate::engine::model::{Job, OsDetails};

use super::http::DetailsSource;

type CacheKey = (String, String);
type CacheCell = Arc<OnceCell<Option<OsDetails>>>;

#[derive(Default)]
pub struct DetailsCache {
    entries: Mutex<HashMap<CacheKey, CacheCell>>,
}

impl DetailsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look an order up, fetching at most once per key even under
    /// concurrent callers. Fetch errors are logged and cached as absent.
    pub async fn get_or_fetch<S>(&self, source: &S, nr_os: &str, ano: &str) -> Option<OsDetails>
    where
        S: DetailsSource + ?Sized,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries
                .entry((nr_os.to_string(), ano.to_string()))
                .or_default()
                .clone()
        };

        cell.get_or_init(|| async {
            match source.fetch_details(nr_os, ano).await {
                Ok(details) => details,
                Err(error) => {
                    warn!(%nr_os, %ano, %error, "order details lookup failed");
                    None
                }
            }
        })
        .await
        .clone()
    }

    /// Enrich every job with a resolved order identity. Jobs that lack a
    /// creation timestamp borrow the order's registration date so they
    /// still sort.
    pub async fn hydrate<S>(&self, source: &S, jobs: &mut [Job])
    where
        S: DetailsSource + ?Sized,
    {
        for job in jobs.iter_mut() {
            let (Some(nr_os), Some(ano)) = (
                job.key.nr_os().map(str::to_string),
                job.key.ano().map(str::to_string),
            ) else {
                continue;
            };

            let Some(details) = self.get_or_fetch(source, &nr_os, &ano).await else {
                continue;
            };

            if job.created_at.is_none() {
                job.created_at = details
                    .data_entrada
                    .as_deref()
                    .and_then(parse_timestamp);
            }
            job.details = Some(details);
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::http::ClientError;
    use crate::engine::model::{JobKey, JobStatus, Metrics};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        known: Vec<(String, String)>,
    }

    impl CountingSource {
        fn new(known: &[(&str, &str)]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                known: known
                    .iter()
                    .map(|(nr, ano)| (nr.to_string(), ano.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl DetailsSource for CountingSource {
        async fn fetch_details(
            &self,
            nr_os: &str,
            ano: &str,
        ) -> Result<Option<OsDetails>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = (nr_os.to_string(), ano.to_string());
            if self.known.contains(&key) {
                Ok(Some(OsDetails {
                    titulo: Some(format!("Titulo {nr_os}")),
                    solicitante: Some("Fulano".to_string()),
                    produto: Some("Revista".to_string()),
                    data_entrada: Some("2024-04-28 09:00:00".to_string()),
                }))
            } else {
                Ok(None)
            }
        }
    }

    fn job(nr_os: &str, ano: &str) -> Job {
        Job {
            key: JobKey::os(nr_os, Some(ano.to_string())),
            name: format!("OS {nr_os}"),
            status: JobStatus::Ready,
            created_at: None,
            last_update: None,
            printed_at: None,
            tickets: vec![],
            plates: vec![],
            metrics: Metrics::default(),
            details: None,
            is_new: false,
        }
    }

    #[tokio::test]
    async fn test_fetches_once_per_key() {
        let cache = DetailsCache::new();
        let source = CountingSource::new(&[("123", "2024")]);

        let first = cache.get_or_fetch(&source, "123", "2024").await;
        let second = cache.get_or_fetch(&source, "123", "2024").await;

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_absent_result_is_cached() {
        let cache = DetailsCache::new();
        let source = CountingSource::new(&[]);

        assert_eq!(cache.get_or_fetch(&source, "999", "2024").await, None);
        assert_eq!(cache.get_or_fetch(&source, "999", "2024").await, None);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_request() {
        let cache = Arc::new(DetailsCache::new());
        let source = Arc::new(CountingSource::new(&[("5", "2024")]));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let source = source.clone();
                tokio::spawn(async move { cache.get_or_fetch(source.as_ref(), "5", "2024").await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_some());
        }

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hydrate_backfills_created_at() {
        let cache = DetailsCache::new();
        let source = CountingSource::new(&[("123", "2024")]);
        let mut jobs = vec![job("123", "2024"), job("999", "2024")];

        cache.hydrate(&source, &mut jobs).await;

        assert!(jobs[0].details.is_some());
        assert!(jobs[0].created_at.is_some());
        assert!(jobs[1].details.is_none());
    }

    #[tokio::test]
    async fn test_hydrate_skips_synthetic_keys() {
        let cache = DetailsCache::new();
        let source = CountingSource::new(&[]);
        let mut jobs = vec![Job {
            key: JobKey::synthetic("Pasta_A"),
            ..job("1", "2024")
        }];

        cache.hydrate(&source, &mut jobs).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
