#![allow(dead_code)]

use async_trait::async_trait;
use axum::{Router, extract::ConnectInfo};
use axum_test::TestServer;
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::Layer;
use url::Url;

use safe_shortener::application::services::{LinkService, RateLimiter, RateLimiterConfig};
use safe_shortener::domain::repositories::UrlRepository;
use safe_shortener::infrastructure::persistence::MemoryUrlRepository;
use safe_shortener::routes::router;
use safe_shortener::state::AppState;
use safe_shortener::utils::address_safety::{AddressSafety, Resolver};
use safe_shortener::utils::url_validator::{
    Probe, ProbeError, ProbeResponse, UrlValidator, UrlValidatorConfig,
};

pub const BASE_URL: &str = "http://sho.rt";

/// Resolver answering from a fixed host table; unknown hosts fail to resolve.
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        let mut hosts: HashMap<String, Vec<IpAddr>> = HashMap::new();
        for (host, ip) in entries {
            hosts
                .entry(host.to_string())
                .or_default()
                .push(ip.parse().unwrap());
        }
        Self { hosts }
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        self.hosts
            .get(host)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such host"))
    }
}

/// Probe with canned answers per URL; anything else answers 200.
#[derive(Default)]
pub struct StaticProbe {
    answers: HashMap<String, ProbeResponse>,
    failing: Vec<String>,
    calls: AtomicUsize,
}

impl StaticProbe {
    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.answers.insert(
            from.to_string(),
            ProbeResponse {
                status: 302,
                location: Some(to.to_string()),
            },
        );
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.answers.insert(
            url.to_string(),
            ProbeResponse {
                status,
                location: None,
            },
        );
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for StaticProbe {
    async fn head(&self, url: &Url) -> Result<ProbeResponse, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.iter().any(|u| u == url.as_str()) {
            return Err(ProbeError::Transport("connection refused".to_string()));
        }

        Ok(self
            .answers
            .get(url.as_str())
            .cloned()
            .unwrap_or(ProbeResponse {
                status: 200,
                location: None,
            }))
    }
}

pub fn default_hosts() -> StaticResolver {
    StaticResolver::new(&[
        ("example.com", "93.184.216.34"),
        ("www.example.com", "93.184.216.34"),
        ("cdn.example.net", "151.101.1.57"),
        ("intranet.example.com", "10.0.0.12"),
        ("rebind.example.com", "127.0.0.1"),
    ])
}

pub fn limiter_config(burst: u32) -> RateLimiterConfig {
    RateLimiterConfig {
        rate_per_second: 0.01,
        burst,
        sweep_interval: Duration::from_secs(300),
        idle_ttl: Duration::from_secs(1800),
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub probe: Arc<StaticProbe>,
}

pub struct TestAppBuilder {
    repository: Arc<dyn UrlRepository>,
    resolver: StaticResolver,
    probe: StaticProbe,
    limiter: RateLimiterConfig,
    behind_proxy: bool,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            repository: Arc::new(MemoryUrlRepository::new()),
            resolver: default_hosts(),
            probe: StaticProbe::default(),
            limiter: limiter_config(100),
            behind_proxy: false,
        }
    }

    pub fn repository(mut self, repository: Arc<dyn UrlRepository>) -> Self {
        self.repository = repository;
        self
    }

    pub fn probe(mut self, probe: StaticProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn burst(mut self, burst: u32) -> Self {
        self.limiter = limiter_config(burst);
        self
    }

    pub fn behind_proxy(mut self) -> Self {
        self.behind_proxy = true;
        self
    }

    pub fn build(self) -> TestApp {
        let probe = Arc::new(self.probe);
        let validator = UrlValidator::new(
            AddressSafety::new(Arc::new(self.resolver)),
            probe.clone(),
            UrlValidatorConfig::default(),
        );

        let link_service = Arc::new(LinkService::new(
            self.repository.clone(),
            validator,
            Duration::from_secs(5),
        ));

        let state = AppState::new(
            link_service,
            Arc::new(RateLimiter::new(self.limiter)),
            self.repository,
            BASE_URL,
            self.behind_proxy,
        );

        let app: Router = router(state.clone()).layer(MockConnectInfoLayer);
        let server = TestServer::new(app).unwrap();

        TestApp {
            server,
            state,
            probe,
        }
    }
}

pub fn test_app() -> TestApp {
    TestAppBuilder::new().build()
}

#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
