//! End-to-end dispatch through the router, admin API and a mock backend.

use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn test_not_found_carries_version() {
    let service = common::start_service().await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/nowhere", service.router_addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(common::router_version(&res), 1);
    assert!(res.headers().contains_key("x-request-id"));

    service.shutdown().await;
}

#[tokio::test]
async fn test_redirects_temporary_and_permanent() {
    let service = common::start_service().await;
    let client = common::client();

    let res = common::add_redirect(&client, &service, "/redir1", "http://localhost/redirected1", "temp").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = common::add_redirect(&client, &service, "/old/", "https://example.com/new", "perm").await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(format!("http://{}/redir1", service.router_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(res.headers()["location"], "http://localhost/redirected1");
    assert_eq!(common::router_version(&res), 3);

    let res = client
        .get(format!("http://{}/old/page", service.router_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(res.headers()["location"], "https://example.com/new");

    service.shutdown().await;
}

#[tokio::test]
async fn test_route_forwards_to_backend() {
    let service = common::start_service().await;
    let backend = common::start_open_backend().await;
    let client = common::client();

    let res = common::add_route(&client, &service, "/route1", &format!("http://{}", backend.addr)).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(format!("http://{}/route1", service.router_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(common::router_version(&res), 2);
    assert_eq!(res.text().await.unwrap(), "from backend");
    assert_eq!(backend.arrivals(), 1);

    service.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let service = common::start_service().await;
    let client = common::client();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    common::add_route(&client, &service, "/dead", &format!("http://{}", dead)).await;

    let res = client
        .get(format!("http://{}/dead", service.router_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(common::router_version(&res), 2);

    service.shutdown().await;
}

#[tokio::test]
async fn test_invalid_route_is_rejected_without_reload() {
    let service = common::start_service().await;
    let client = common::client();

    let res = common::add_route(&client, &service, "/bad", "not a host").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(service.router.generation(), 1);

    let res = client
        .get(format!("http://{}/bad", service.router_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(common::router_version(&res), 1);

    service.shutdown().await;
}

#[tokio::test]
async fn test_many_redirects() {
    let service = common::start_service().await;
    let client = common::client();

    let batch: Vec<_> = (0..1000)
        .map(|i| {
            serde_json::json!({
                "path": format!("/r{}", i),
                "redirect": format!("http://localhost/target{}", i),
            })
        })
        .collect();
    let res = client
        .post(format!("http://{}/redirects", service.admin_addr))
        .json(&batch)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(service.router.current().len(), 1000);

    for i in [0, 499, 999] {
        let res = client
            .get(format!("http://{}/r{}", service.router_addr, i))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers()["location"], format!("http://localhost/target{}", i).as_str());
        assert_eq!(common::router_version(&res), 2);
    }

    service.shutdown().await;
}
