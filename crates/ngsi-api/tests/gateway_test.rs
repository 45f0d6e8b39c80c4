//! Router-level tests against a mocked backend transport

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header;
use axum_test::TestServer;
use mockall::mock;
use serde_json::{json, Value};

use ngsi_api::{create_router, AppState};
use ngsi_core::{
    BrokerRequest, BrokerResponse, ContextBroker, GatewayConfig, NotificationSink, TransportError,
};

mock! {
    Broker {}

    #[async_trait]
    impl ContextBroker for Broker {
        async fn send(&self, req: BrokerRequest) -> Result<BrokerResponse, TransportError>;
    }
}

mock! {
    Relay {}

    #[async_trait]
    impl NotificationSink for Relay {
        async fn deliver(
            &self,
            target: &str,
            content_type: &str,
            link: Option<String>,
            body: Value,
        ) -> Result<BrokerResponse, TransportError>;
    }
}

fn ok_json(body: Value) -> BrokerResponse {
    BrokerResponse {
        status: 200,
        body: Some(body),
        ..BrokerResponse::default()
    }
}

fn server(broker: MockBroker) -> TestServer {
    server_with(GatewayConfig::default(), broker, MockRelay::new())
}

fn server_with(config: GatewayConfig, broker: MockBroker, relay: MockRelay) -> TestServer {
    let state = AppState::new(config, Arc::new(broker), Arc::new(relay));
    TestServer::new(create_router(state)).expect("router should build")
}

#[tokio::test]
async fn entity_read_translates_the_backend_payload() {
    let mut broker = MockBroker::new();
    broker
        .expect_send()
        .withf(|req| req.path == "/entities/urn:ngsi-ld:TemperatureSensor:001")
        .returning(|_| {
            Ok(ok_json(json!({
                "id": "urn:ngsi-ld:TemperatureSensor:001",
                "type": "TemperatureSensor",
                "temperature": { "type": "Number", "value": 21.5, "metadata": {} }
            })))
        });

    let server = server(broker);
    let response = server
        .get("/ngsi-ld/v1/entities/urn:ngsi-ld:TemperatureSensor:001")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["id"], json!("urn:ngsi-ld:TemperatureSensor:001"));
    assert_eq!(body["temperature"], json!({ "type": "Property", "value": 21.5 }));
    // Context travels in the Link header for plain-JSON clients
    let link = response.header(header::LINK);
    assert!(link
        .to_str()
        .unwrap()
        .contains("rel=\"http://www.w3.org/ns/json-ld#context\""));
}

#[tokio::test]
async fn multi_type_mismatch_is_a_resource_not_found() {
    let mut broker = MockBroker::new();
    broker
        .expect_send()
        .withf(|req| {
            // The multi-type filter must not reach the backend
            !req.query.iter().any(|(key, _)| key == "type")
        })
        .returning(|_| {
            Ok(ok_json(json!({
                "id": "urn:ngsi-ld:C:1",
                "type": "C"
            })))
        });

    let server = server(broker);
    let response = server
        .get("/ngsi-ld/v1/entities/urn:ngsi-ld:C:1")
        .add_query_param("type", "A,B")
        .await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(
        body["type"],
        json!("https://uri.etsi.org/ngsi-ld/errors/ResourceNotFound")
    );
}

#[tokio::test]
async fn matching_multi_type_read_passes_through() {
    let mut broker = MockBroker::new();
    broker.expect_send().returning(|_| {
        Ok(ok_json(json!({
            "id": "urn:ngsi-ld:A:1",
            "type": "A"
        })))
    });

    let server = server(broker);
    let response = server
        .get("/ngsi-ld/v1/entities/urn:ngsi-ld:A:1")
        .add_query_param("type", "A,B")
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn list_reads_paginate_from_the_count_header() {
    let mut broker = MockBroker::new();
    broker.expect_send().returning(|_| {
        Ok(BrokerResponse {
            status: 200,
            total_count: Some(8),
            body: Some(json!([
                { "id": "urn:ngsi-ld:Shelf:5", "type": "Shelf" },
                { "id": "urn:ngsi-ld:Shelf:6", "type": "Shelf" },
                { "id": "urn:ngsi-ld:Shelf:7", "type": "Shelf" }
            ])),
            ..BrokerResponse::default()
        })
    });

    let server = server(broker);
    let response = server
        .get("/ngsi-ld/v1/entities")
        .add_query_param("type", "Shelf")
        .add_query_param("limit", "3")
        .add_query_param("offset", "4")
        .add_query_param("count", "true")
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("NGSILD-Results-Count"), "8");
    let links: Vec<String> = response
        .iter_headers()
        .filter(|(name, _)| *name == header::LINK)
        .filter_map(|(_, value)| value.to_str().ok().map(String::from))
        .collect();
    assert!(
        links
            .iter()
            .any(|link| link.contains("offset=1") && link.contains("rel=\"prev\"")),
        "{links:?}"
    );
    assert!(
        links
            .iter()
            .any(|link| link.contains("offset=7") && link.contains("rel=\"next\"")),
        "{links:?}"
    );
}

#[tokio::test]
async fn backend_conflicts_map_to_already_exists() {
    let mut broker = MockBroker::new();
    broker.expect_send().returning(|_| {
        Ok(BrokerResponse {
            status: 422,
            body: Some(json!({ "message": "Already Exists" })),
            ..BrokerResponse::default()
        })
    });

    let server = server(broker);
    let response = server
        .post("/ngsi-ld/v1/entities")
        .json(&json!({ "id": "urn:ngsi-ld:T:1", "type": "T" }))
        .await;

    response.assert_status(axum::http::StatusCode::CONFLICT);
    let body: Value = response.json();
    assert!(body["type"]
        .as_str()
        .unwrap()
        .ends_with("AlreadyExists"));
}

#[tokio::test]
async fn backend_timeouts_map_to_gateway_timeout() {
    let mut broker = MockBroker::new();
    broker
        .expect_send()
        .returning(|_| Err(TransportError::TimedOut));

    let server = server(broker);
    let response = server.get("/ngsi-ld/v1/entities").await;

    response.assert_status(axum::http::StatusCode::GATEWAY_TIMEOUT);
    let body: Value = response.json();
    assert_eq!(
        body["type"],
        json!("https://uri.etsi.org/ngsi-ld/errors/GatewayTimeout")
    );
}

#[tokio::test]
async fn entity_map_sweeps_the_backend_until_a_page_is_empty() {
    let mut config = GatewayConfig::default();
    config.page_limit = 2;

    let mut broker = MockBroker::new();
    broker
        .expect_send()
        .times(3)
        .withf(|req| {
            req.path == "/entities"
                && req.query.contains(&("attrs".to_string(), "id".to_string()))
                && req.query.contains(&("limit".to_string(), "2".to_string()))
        })
        .returning(|req| {
            let offset = req
                .query
                .iter()
                .find(|(key, _)| key == "offset")
                .map(|(_, value)| value.clone());
            let page = match offset.as_deref() {
                None => json!([{ "id": "urn:ngsi-ld:T:1" }, { "id": "urn:ngsi-ld:T:2" }]),
                Some("2") => json!([{ "id": "urn:ngsi-ld:T:3" }, { "id": "urn:ngsi-ld:T:4" }]),
                _ => json!([]),
            };
            Ok(ok_json(page))
        });

    let server = server_with(config, broker, MockRelay::new());
    let response = server
        .get("/ngsi-ld/v1/entityMap")
        .add_query_param("type", "T")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["type"], json!("EntityMap"));
    let map = body["entityMap"].as_object().unwrap();
    assert_eq!(map.len(), 4);
    assert!(map.contains_key("urn:ngsi-ld:T:4"));
}

#[tokio::test]
async fn entity_map_requires_a_filter() {
    let server = server(MockBroker::new());
    let response = server.get("/ngsi-ld/v1/entityMap").await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(
        body["type"],
        json!("https://uri.etsi.org/ngsi-ld/errors/BadRequestData")
    );
}

#[tokio::test]
async fn stored_entity_maps_never_exist() {
    let server = server(MockBroker::new());
    let response = server.get("/ngsi-ld/v1/entityMap/urn:ngsi-ld:EntityMap:1").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn notifications_require_a_delivery_target() {
    let server = server(MockBroker::new());
    let response = server
        .post("/ngsi-ld/v1/notify")
        .json(&json!({ "subscriptionId": "abc", "data": [] }))
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn notifications_are_relayed_to_the_target() {
    let mut relay = MockRelay::new();
    relay
        .expect_deliver()
        .withf(|target, _, link, body| {
            target == "http://subscriber/inbox"
                && link.is_some()
                && body["type"] == json!("Notification")
                && body["subscriptionId"] == json!("urn:ngsi-ld:Subscription:abc")
                && body["data"][0]["temperature"]["value"] == json!(21.5)
        })
        .returning(|_, _, _, _| {
            Ok(BrokerResponse {
                status: 200,
                ..BrokerResponse::default()
            })
        });

    let server = server_with(GatewayConfig::default(), MockBroker::new(), relay);
    let response = server
        .post("/ngsi-ld/v1/notify")
        .add_header(
            axum::http::HeaderName::from_static("target"),
            axum::http::HeaderValue::from_static("http://subscriber/inbox"),
        )
        .json(&json!({
            "subscriptionId": "abc",
            "data": [{
                "id": "urn:ngsi-ld:T:1",
                "type": "T",
                "temperature": { "type": "Number", "value": 21.5, "metadata": {} }
            }]
        }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn subscription_creation_rewrites_endpoint_and_location() {
    let mut broker = MockBroker::new();
    broker
        .expect_send()
        .withf(|req| {
            let body = req.body.as_ref().unwrap();
            body["notification"]["httpCustom"]["url"] == json!("http://localhost:3000/notify")
                && body["notification"]["httpCustom"]["headers"]["target"]
                    == json!("http://subscriber/inbox")
        })
        .returning(|_| {
            Ok(BrokerResponse {
                status: 201,
                location: Some("/v2/subscriptions/5f1e9".to_string()),
                ..BrokerResponse::default()
            })
        });

    let server = server(broker);
    let response = server
        .post("/ngsi-ld/v1/subscriptions")
        .json(&json!({
            "type": "Subscription",
            "entities": [{ "type": "Shelf" }],
            "notification": {
                "endpoint": { "uri": "http://subscriber/inbox", "accept": "application/json" }
            }
        }))
        .await;

    response.assert_status(axum::http::StatusCode::CREATED);
    assert_eq!(
        response.header(header::LOCATION),
        "/ngsi-ld/v1/subscriptions/urn:ngsi-ld:Subscription:5f1e9"
    );
}

#[tokio::test]
async fn tenant_header_is_forwarded_and_echoed() {
    let mut broker = MockBroker::new();
    broker
        .expect_send()
        .withf(|req| req.tenant.as_deref() == Some("farm01"))
        .returning(|_| Ok(ok_json(json!({ "id": "urn:ngsi-ld:T:1", "type": "T" }))));

    let server = server(broker);
    let response = server
        .get("/ngsi-ld/v1/entities/urn:ngsi-ld:T:1")
        .add_header(
            axum::http::HeaderName::from_static("ngsild-tenant"),
            axum::http::HeaderValue::from_static("farm01"),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("NGSILD-Tenant"), "farm01");
}

#[tokio::test]
async fn version_preference_is_acknowledged() {
    let mut broker = MockBroker::new();
    broker
        .expect_send()
        .returning(|_| Ok(ok_json(json!({ "id": "urn:ngsi-ld:T:1", "type": "T" }))));

    let server = server(broker);
    let response = server
        .get("/ngsi-ld/v1/entities/urn:ngsi-ld:T:1")
        .add_header(
            axum::http::HeaderName::from_static("prefer"),
            axum::http::HeaderValue::from_static("ngsi-ld=1.6"),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("Preference-Applied"), "ngsi-ld=1.6");
}

#[tokio::test]
async fn unsupported_methods_get_a_405_problem() {
    let server = server(MockBroker::new());
    let response = server.put("/ngsi-ld/v1/types").await;
    response.assert_status(axum::http::StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json();
    assert_eq!(body["type"], json!("urn:ngsi-ld:MethodNotAllowed"));
    assert!(response.header(header::ALLOW).to_str().unwrap().contains("GET"));
}

#[tokio::test]
async fn preflight_lists_the_supported_verbs() {
    let server = server(MockBroker::new());
    let response = server
        .method(axum::http::Method::OPTIONS, "/ngsi-ld/v1/entities/urn:ngsi-ld:T:1")
        .await;
    response.assert_status_ok();
    assert_eq!(response.header(header::ALLOW), "GET,PATCH,PUT,DELETE,OPTIONS");
    assert!(response
        .header("Accept-Patch")
        .to_str()
        .unwrap()
        .contains("merge-patch"));
}

#[tokio::test]
async fn context_document_is_served_as_json_ld() {
    let server = server(MockBroker::new());
    let response = server.get("/context.jsonld").await;
    response.assert_status_ok();
    assert_eq!(response.header(header::CONTENT_TYPE), "application/ld+json");
    let body: Value = response.json();
    assert_eq!(body["@context"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn merge_misses_when_the_entity_does_not_exist() {
    let mut broker = MockBroker::new();
    broker.expect_send().times(1).returning(|_| {
        Ok(BrokerResponse {
            status: 404,
            body: Some(json!({ "error": "NotFound", "description": "not there" })),
            ..BrokerResponse::default()
        })
    });

    let server = server(broker);
    let response = server
        .patch("/ngsi-ld/v1/entities/urn:ngsi-ld:T:1")
        .json(&json!({ "temperature": 25 }))
        .await;
    response.assert_status_not_found();
    let body: Value = response.json();
    assert!(body["type"].as_str().unwrap().ends_with("ResourceNotFound"));
}

#[tokio::test]
async fn merge_writes_the_merged_attribute_map_back() {
    let mut broker = MockBroker::new();
    let mut sequence = mockall::Sequence::new();
    broker
        .expect_send()
        .times(1)
        .in_sequence(&mut sequence)
        .withf(|req| req.verb.as_str() == "GET")
        .returning(|_| {
            Ok(ok_json(json!({
                "id": "urn:ngsi-ld:T:1",
                "type": "T",
                "temperature": { "type": "Number", "value": 21.5, "metadata": {} },
                "status": { "type": "Text", "value": "ok", "metadata": {} }
            })))
        });
    broker
        .expect_send()
        .times(1)
        .in_sequence(&mut sequence)
        .withf(|req| {
            let body = req.body.as_ref().unwrap();
            req.verb.as_str() == "PUT"
                && req.path == "/entities/urn:ngsi-ld:T:1/attrs"
                && body["temperature"]["value"] == json!(25.0)
                && body.get("status").is_none()
                && body.get("id").is_none()
        })
        .returning(|_| {
            Ok(BrokerResponse {
                status: 204,
                ..BrokerResponse::default()
            })
        });

    let server = server(broker);
    let response = server
        .patch("/ngsi-ld/v1/entities/urn:ngsi-ld:T:1")
        .json(&json!({
            "temperature": { "type": "Property", "value": 25.0 },
            "status": "urn:ngsi-ld:null"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn batch_delete_wraps_ids_for_the_backend() {
    let mut broker = MockBroker::new();
    broker
        .expect_send()
        .withf(|req| {
            let body = req.body.as_ref().unwrap();
            req.path == "/op/update"
                && body["actionType"] == json!("delete")
                && body["entities"][0]["id"] == json!("urn:ngsi-ld:T:1")
        })
        .returning(|_| {
            Ok(BrokerResponse {
                status: 204,
                ..BrokerResponse::default()
            })
        });

    let server = server(broker);
    let response = server
        .post("/ngsi-ld/v1/entityOperations/delete")
        .json(&json!(["urn:ngsi-ld:T:1", "urn:ngsi-ld:T:2"]))
        .await;
    response.assert_status(axum::http::StatusCode::NO_CONTENT);
}
