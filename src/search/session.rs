use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::debounce::Debouncer;
use super::orchestrator::{SearchOrchestrator, SearchView};
use crate::config::SearchConfig;
use crate::db::SearchMetricsRepo;
use crate::tmdb::MovieLookup;

/// One search box: raw input goes in, a [`SearchView`] comes out.
pub struct SearchSession {
    id: String,
    created: DateTime<Utc>,
    last_used: Mutex<DateTime<Utc>>,
    debouncer: Debouncer,
    orchestrator: Arc<SearchOrchestrator>,
    driver: JoinHandle<()>,
}

impl SearchSession {
    pub fn new(
        config: &SearchConfig,
        lookup: Arc<dyn MovieLookup>,
        metrics: Arc<dyn SearchMetricsRepo>,
    ) -> Self {
        let orchestrator = Arc::new(SearchOrchestrator::new(lookup, metrics));
        let (debouncer, settled) = Debouncer::spawn(String::new(), config.debounce_interval());
        let driver = tokio::spawn(drive(Arc::clone(&orchestrator), settled));

        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created: now,
            last_used: Mutex::new(now),
            debouncer,
            orchestrator,
            driver,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Feed the raw input value. The lookup follows once the input settles.
    pub fn update_query(&self, query: impl Into<String>) {
        self.touch();
        self.debouncer.update(query);
    }

    pub fn raw_query(&self) -> String {
        self.debouncer.current()
    }

    pub fn view(&self) -> SearchView {
        self.orchestrator.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.orchestrator.subscribe()
    }

    pub fn touch(&self) {
        if let Ok(mut last_used) = self.last_used.lock() {
            *last_used = Utc::now();
        }
    }

    pub fn idle_for(&self) -> Duration {
        let last_used = self.last_used.lock().map(|t| *t).unwrap_or(self.created);
        (Utc::now() - last_used).to_std().unwrap_or_default()
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive(orchestrator: Arc<SearchOrchestrator>, mut settled: mpsc::Receiver<String>) {
    // Browse popular movies before anything is typed.
    spawn_cycle(&orchestrator, String::new());

    while let Some(query) = settled.recv().await {
        spawn_cycle(&orchestrator, query);
    }
}

/// In-flight cycles are never cancelled; the orchestrator drops stale ones.
fn spawn_cycle(orchestrator: &Arc<SearchOrchestrator>, query: String) {
    let orchestrator = Arc::clone(orchestrator);
    tokio::spawn(async move {
        orchestrator.settle(query).await;
    });
}

pub struct SessionRepo {
    config: SearchConfig,
    lookup: Arc<dyn MovieLookup>,
    metrics: Arc<dyn SearchMetricsRepo>,
    sessions: RwLock<HashMap<String, Arc<SearchSession>>>,
}

impl SessionRepo {
    pub fn new(
        config: SearchConfig,
        lookup: Arc<dyn MovieLookup>,
        metrics: Arc<dyn SearchMetricsRepo>,
    ) -> Self {
        Self {
            config,
            lookup,
            metrics,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self) -> Arc<SearchSession> {
        let session = Arc::new(SearchSession::new(
            &self.config,
            Arc::clone(&self.lookup),
            Arc::clone(&self.metrics),
        ));

        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id().to_string(), Arc::clone(&session));

        debug!(session = session.id(), "Created search session");
        session
    }

    pub async fn get(&self, id: &str) -> Option<Arc<SearchSession>> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(id).cloned()?;
        session.touch();
        Some(session)
    }

    pub async fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove sessions idle for longer than `ttl`; returns how many went.
    pub async fn expire_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.idle_for() <= ttl);
        before - sessions.len()
    }

    pub fn start_background_expiry(self: Arc<Self>) {
        let ttl = self.config.session_ttl();
        let repo = Arc::clone(&self);
        tokio::spawn(async move {
            repo.expiry_loop(ttl).await;
        });
    }

    async fn expiry_loop(&self, ttl: Duration) {
        let period = (ttl / 4).max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let expired = self.expire_idle(ttl).await;
            if expired > 0 {
                info!("Expired {} idle search sessions", expired);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::RequestState;
    use crate::testutil::{movie, response, MockLookup, RecordingMetrics};
    use crate::tmdb::LookupRequest;
    use tokio::time::sleep;

    fn config() -> SearchConfig {
        SearchConfig {
            debounce_ms: 500,
            ..SearchConfig::default()
        }
    }

    async fn wait_for(rx: &mut watch::Receiver<SearchView>, query: &str) -> SearchView {
        loop {
            {
                let view = rx.borrow_and_update();
                if view.query == query && !view.state.is_loading() && view.generation > 0 {
                    return view.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_browse() {
        let lookup = Arc::new(MockLookup::new());
        lookup.respond("", response(vec![movie(1, "Popular")]));
        let metrics = Arc::new(RecordingMetrics::default());
        let session = SearchSession::new(&config(), lookup.clone(), metrics.clone());

        let mut rx = session.subscribe();
        let view = wait_for(&mut rx, "").await;

        assert_eq!(view.state, RequestState::Success);
        assert_eq!(view.movies[0].title, "Popular");
        assert_eq!(lookup.requests(), vec![LookupRequest::Discover]);
        assert!(metrics.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_burst_issues_one_search() {
        let lookup = Arc::new(MockLookup::new());
        lookup.respond("batman", response(vec![movie(268, "Batman")]));
        let metrics = Arc::new(RecordingMetrics::default());
        let session = SearchSession::new(&config(), lookup.clone(), metrics.clone());
        let mut rx = session.subscribe();
        wait_for(&mut rx, "").await;

        let text = "batman";
        for end in 1..=text.len() {
            session.update_query(&text[..end]);
            sleep(Duration::from_millis(120)).await;
        }
        assert_eq!(session.raw_query(), "batman");

        let view = wait_for(&mut rx, "batman").await;
        assert_eq!(view.state, RequestState::Success);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(
            lookup.requests(),
            vec![
                LookupRequest::Discover,
                LookupRequest::Search("batman".to_string())
            ]
        );
        assert_eq!(metrics.calls(), vec![("batman".to_string(), 268)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_input_browses_without_analytics() {
        let lookup = Arc::new(MockLookup::new());
        lookup.respond("", response(vec![movie(1, "Popular")]));
        lookup.respond("heat", response(vec![movie(949, "Heat")]));
        let metrics = Arc::new(RecordingMetrics::default());
        let session = SearchSession::new(&config(), lookup.clone(), metrics.clone());
        let mut rx = session.subscribe();
        wait_for(&mut rx, "").await;

        session.update_query("heat");
        wait_for(&mut rx, "heat").await;

        session.update_query("");
        let view = wait_for(&mut rx, "").await;
        assert_eq!(view.movies[0].title, "Popular");

        sleep(Duration::from_secs(2)).await;
        assert_eq!(
            lookup.requests(),
            vec![
                LookupRequest::Discover,
                LookupRequest::Search("heat".to_string()),
                LookupRequest::Discover,
            ]
        );
        assert_eq!(metrics.calls(), vec![("heat".to_string(), 949)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repo_lifecycle() {
        let repo = SessionRepo::new(
            config(),
            Arc::new(MockLookup::new()),
            Arc::new(RecordingMetrics::default()),
        );
        assert!(repo.is_empty().await);

        let session = repo.create().await;
        let id = session.id().to_string();
        assert_eq!(repo.len().await, 1);
        assert!(repo.get(&id).await.is_some());
        assert!(repo.get("missing").await.is_none());

        assert!(repo.remove(&id).await);
        assert!(!repo.remove(&id).await);
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_expire_idle() {
        let repo = SessionRepo::new(
            config(),
            Arc::new(MockLookup::new()),
            Arc::new(RecordingMetrics::default()),
        );
        repo.create().await;
        repo.create().await;

        assert_eq!(repo.expire_idle(Duration::from_secs(60)).await, 0);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(repo.expire_idle(Duration::from_millis(5)).await, 2);
        assert!(repo.is_empty().await);
    }
}
