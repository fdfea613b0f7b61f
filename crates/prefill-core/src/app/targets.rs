//! Target resolution: which apps a run processes.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::selection_store::SelectionStore;
use crate::config::TargetOptions;
use crate::domain::{AppId, PrefillError};
use crate::ports::{PopularAppsSource, SessionClient};

/// Set union of every source; each app appears once no matter how many
/// sources name it.
pub fn union_targets<I, S>(sources: I) -> BTreeSet<AppId>
where
    I: IntoIterator<Item = S>,
    S: IntoIterator<Item = AppId>,
{
    sources.into_iter().flatten().collect()
}

#[derive(Clone)]
pub struct TargetResolver {
    session: Arc<dyn SessionClient>,
    popular: Option<Arc<dyn PopularAppsSource>>,
    selection: SelectionStore,
}

impl TargetResolver {
    pub fn new(
        session: Arc<dyn SessionClient>,
        popular: Option<Arc<dyn PopularAppsSource>>,
        selection: SelectionStore,
    ) -> Self {
        Self {
            session,
            popular,
            selection,
        }
    }

    /// The saved selection is always included; the other sources only when
    /// requested.
    pub async fn resolve(&self, options: &TargetOptions) -> Result<BTreeSet<AppId>, PrefillError> {
        let mut sources: Vec<Vec<AppId>> = vec![self.selection.load().await?, options.manual.clone()];

        if options.all_owned {
            sources.push(self.session.owned_app_ids().await?);
        }
        if options.recently_played {
            sources.push(self.session.recently_played_app_ids().await?);
        }
        if let Some(n) = options.top_popular {
            let popular = self.popular.as_ref().ok_or_else(|| {
                PrefillError::service("popular apps", "no popularity source configured")
            })?;
            sources.push(popular.top(n).await?);
        }

        let targets = union_targets(sources);
        debug!(count = targets.len(), "resolved target apps");
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{FakePopular, FakeSession};

    fn ids(raw: &[u32]) -> Vec<AppId> {
        raw.iter().copied().map(AppId::new).collect()
    }

    #[test]
    fn duplicates_across_sources_collapse() {
        let targets = union_targets([ids(&[1, 2]), ids(&[2]), ids(&[3])]);
        assert_eq!(targets.into_iter().collect::<Vec<_>>(), ids(&[1, 2, 3]));
    }

    #[tokio::test]
    async fn every_requested_source_contributes() {
        let dir = tempfile::tempdir().unwrap();
        let selection = SelectionStore::new(dir.path().join("selected_apps.json"));
        selection.save(&ids(&[1])).await.unwrap();

        let session = Arc::new(
            FakeSession::new("alice")
                .with_owned(ids(&[2, 1]))
                .with_recent(ids(&[4])),
        );
        let popular: Arc<dyn PopularAppsSource> = Arc::new(FakePopular::new(ids(&[5, 6, 2])));
        let resolver = TargetResolver::new(session, Some(popular), selection);

        let options = TargetOptions {
            manual: ids(&[2, 3]),
            all_owned: true,
            recently_played: true,
            top_popular: Some(2),
        };
        let targets = resolver.resolve(&options).await.unwrap();
        assert_eq!(targets.into_iter().collect::<Vec<_>>(), ids(&[1, 2, 3, 4, 5, 6]));
    }

    #[tokio::test]
    async fn unrequested_sources_are_not_consulted() {
        let dir = tempfile::tempdir().unwrap();
        let selection = SelectionStore::new(dir.path().join("selected_apps.json"));
        let session = Arc::new(FakeSession::new("alice").with_owned(ids(&[9])));
        let resolver = TargetResolver::new(session, None, selection);

        let options = TargetOptions {
            manual: ids(&[7]),
            ..TargetOptions::default()
        };
        let targets = resolver.resolve(&options).await.unwrap();
        assert_eq!(targets.into_iter().collect::<Vec<_>>(), ids(&[7]));
    }

    #[tokio::test]
    async fn top_without_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let selection = SelectionStore::new(dir.path().join("selected_apps.json"));
        let resolver = TargetResolver::new(Arc::new(FakeSession::new("alice")), None, selection);

        let options = TargetOptions {
            top_popular: Some(10),
            ..TargetOptions::default()
        };
        assert!(resolver.resolve(&options).await.is_err());
    }
}
