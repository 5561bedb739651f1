mod support;

use flatref_fetcher::{FetchConfig, FetchError, Fetcher, DEFAULT_USER_AGENT};
use std::time::Duration;
use support::{StubResponse, StubServer};
use tempfile::tempdir;

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn second_fetch_with_skip_existing_makes_no_request() {
    let server = StubServer::start(|_| StubResponse::ok("[Flatpak Ref]\nName=org.example.App\n"));
    let fetcher = Fetcher::new(FetchConfig::default().with_endpoints([server.template("/primary")]))
        .expect("fetcher");
    let out = tempdir().expect("tempdir");

    let first = fetcher
        .fetch("org.example.App", out.path(), true, TIMEOUT)
        .await
        .expect("first fetch");
    let second = fetcher
        .fetch("org.example.App", out.path(), true, TIMEOUT)
        .await
        .expect("second fetch");

    assert_eq!(first, second);
    assert_eq!(server.hits(), 1);
    assert_eq!(
        std::fs::read_to_string(&first).expect("read descriptor"),
        "[Flatpak Ref]\nName=org.example.App\n"
    );
}

#[tokio::test]
async fn without_skip_existing_the_descriptor_is_replaced() {
    let server = StubServer::start(|_| StubResponse::ok("fresh"));
    let fetcher = Fetcher::new(FetchConfig::default().with_endpoints([server.template("/p")]))
        .expect("fetcher");
    let out = tempdir().expect("tempdir");
    let dest = fetcher.destination("org.example.App", out.path());
    std::fs::write(&dest, "stale").expect("seed descriptor");

    fetcher
        .fetch("org.example.App", out.path(), false, TIMEOUT)
        .await
        .expect("fetch");

    assert_eq!(server.hits(), 1);
    assert_eq!(std::fs::read_to_string(&dest).expect("read"), "fresh");
}

#[tokio::test]
async fn falls_back_in_order_and_stops_at_first_success() {
    let server = StubServer::start(|path| {
        if path.starts_with("/primary/") {
            StubResponse::not_found()
        } else if path.starts_with("/fallback/") {
            StubResponse::ok("from fallback")
        } else {
            StubResponse::ok("from third")
        }
    });
    let fetcher = Fetcher::new(FetchConfig::default().with_endpoints([
        server.template("/primary"),
        server.template("/fallback"),
        server.template("/third"),
    ]))
    .expect("fetcher");
    let out = tempdir().expect("tempdir");

    let path = fetcher
        .fetch("org.example.App", out.path(), true, TIMEOUT)
        .await
        .expect("fetch");

    assert_eq!(std::fs::read_to_string(&path).expect("read"), "from fallback");
    assert_eq!(
        server.requests(),
        vec![
            "/primary/org.example.App.flatpakref",
            "/fallback/org.example.App.flatpakref"
        ]
    );
}

#[tokio::test]
async fn all_endpoints_failing_reports_last_cause_and_writes_nothing() {
    let server = StubServer::start(|_| StubResponse::not_found());
    let fetcher = Fetcher::new(
        FetchConfig::default().with_endpoints([server.template("/a"), server.template("/b")]),
    )
    .expect("fetcher");
    let out = tempdir().expect("tempdir");

    let err = fetcher
        .fetch("org.example.Missing", out.path(), true, TIMEOUT)
        .await
        .expect_err("both endpoints 404");

    match err {
        FetchError::AllEndpointsFailed {
            app_id,
            attempts,
            source,
        } => {
            assert_eq!(app_id, "org.example.Missing");
            assert_eq!(attempts, 2);
            assert_eq!(source.status().map(|s| s.as_u16()), Some(404));
            assert!(source.to_string().contains("/b/"), "last cause: {source}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!fetcher
        .destination("org.example.Missing", out.path())
        .exists());
    assert_eq!(std::fs::read_dir(out.path()).expect("list").count(), 0);
}

#[tokio::test]
async fn requests_carry_the_identifying_user_agent() {
    let server = StubServer::start(|_| StubResponse::ok("x"));
    let fetcher = Fetcher::new(FetchConfig::default().with_endpoints([server.template("/p")]))
        .expect("fetcher");
    let out = tempdir().expect("tempdir");

    fetcher
        .fetch("org.example.App", out.path(), true, TIMEOUT)
        .await
        .expect("fetch");

    assert_eq!(server.user_agents(), vec![DEFAULT_USER_AGENT.to_string()]);
}
