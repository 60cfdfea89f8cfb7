use agents_api::url::{endpoint_url, normalize_endpoint};
use agents_api::ConfigError;

#[test]
fn endpoint_path_is_preserved_and_version_appended() {
    let base = normalize_endpoint("https://res.services.ai.azure.com/api/projects/demo/")
        .expect("endpoint");
    let url = endpoint_url(&base, &["threads", "thread_1", "runs", "run_1"], "v1");

    assert_eq!(
        url.as_str(),
        "https://res.services.ai.azure.com/api/projects/demo/threads/thread_1/runs/run_1?api-version=v1"
    );
}

#[test]
fn bare_host_endpoint_builds_root_paths() {
    let base = normalize_endpoint("http://127.0.0.1:8080").expect("endpoint");
    let url = endpoint_url(&base, &["assistants"], "v1");
    assert_eq!(url.as_str(), "http://127.0.0.1:8080/assistants?api-version=v1");
}

#[test]
fn ids_cannot_add_path_segments() {
    let base = normalize_endpoint("https://host.test").expect("endpoint");
    let url = endpoint_url(&base, &["assistants", "a/b"], "v1");
    assert_eq!(url.path(), "/assistants/a%2Fb");
}

#[test]
fn non_http_endpoints_are_rejected() {
    assert!(matches!(
        normalize_endpoint("ftp://host.test"),
        Err(ConfigError::InvalidEndpoint(_))
    ));
    assert!(matches!(
        normalize_endpoint("not a url"),
        Err(ConfigError::InvalidEndpoint(_))
    ));
}
