//! Resource and data source lifecycle against a mock Blastshield server

use base64::Engine;
use blastshield_provider::config::ProviderConfig;
use blastshield_provider::resource::State;
use blastshield_provider::versions::{register_all, Registry};
use blastshield_provider::Provider;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn configured(server: &MockServer) -> Provider {
    let registry = Registry::new();
    register_all(&registry).unwrap();
    let (implementation, _) = registry.select_latest().unwrap();
    let mut provider = Provider::new("test", Some(implementation));
    provider
        .configure(&ProviderConfig {
            host: Some(server.uri()),
            token: Some("dev".into()),
        })
        .unwrap();
    provider
}

fn state(value: Value) -> State {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_node_create_stores_invitation_and_groups() {
    let server = MockServer::start().await;

    let invitation = json!({"node_id": "n-1", "token": "join-me"});
    Mock::given(method("POST"))
        .and(path("/nodes/"))
        .and(body_json(json!({"name": "gw", "node_type": "gateway"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(invitation.clone()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/nodes/n-1/groups"))
        .and(body_json(json!({"op": "replace", "groups": [{"id": 2, "expires": 0}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2, "expires": 0}])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/nodes/n-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "n-1",
            "name": "gw",
            "node_type": "gateway",
            "api_access": false,
            "status": {"online": true}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/nodes/n-1/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2, "expires": 0}])))
        .mount(&server)
        .await;

    let provider = configured(&server);
    let created = provider
        .create(
            "blastshield_node",
            &state(json!({
                "name": "gw",
                "node_type": "gateway",
                "groups": [{"id": 2, "expires": 0}]
            })),
        )
        .await
        .unwrap();

    assert_eq!(created["id"], "n-1");
    assert_eq!(created["name"], "gw");
    assert_eq!(created["groups"], json!([{"id": 2, "expires": 0}]));
    assert!(created["tags"].is_null());
    assert!(created.get("status").is_none());

    let expected = base64::engine::general_purpose::STANDARD
        .encode(serde_json::to_vec(&invitation).unwrap());
    assert_eq!(created["invitation"], Value::String(expected));

    // Refresh keeps the stored invitation
    let refreshed = provider
        .read("blastshield_node", &created)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed["invitation"], created["invitation"]);
}

#[tokio::test]
async fn test_create_rejects_missing_required() {
    let server = MockServer::start().await;
    let provider = configured(&server);

    let err = provider
        .create("blastshield_policy", &state(json!({"name": "p"})))
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Missing required attributes"));
    assert!(message.contains("from_groups"));
}

#[tokio::test]
async fn test_read_missing_entity_drops_state() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/groups/9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found"})))
        .mount(&server)
        .await;

    let provider = configured(&server);
    let refreshed = provider
        .read("blastshield_group", &state(json!({"id": 9, "name": "gone"})))
        .await
        .unwrap();
    assert!(refreshed.is_none());
}

#[tokio::test]
async fn test_update_puts_body_and_refetches() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/services/4"))
        .and(body_json(json!({
            "name": "ssh",
            "protocols": [{"ip_protocol": 6, "ports": ["22"]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/services/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4,
            "name": "ssh",
            "protocols": [{"ip_protocol": 6, "ports": ["22"]}]
        })))
        .mount(&server)
        .await;

    let provider = configured(&server);
    let prior = state(json!({"id": 4, "name": "old"}));
    let plan = state(json!({
        "id": 4,
        "name": "ssh",
        "protocols": [{"ip_protocol": 6, "ports": ["22"]}]
    }));
    let updated = provider.update("blastshield_service", &prior, &plan).await.unwrap();
    assert_eq!(updated["name"], "ssh");
    assert_eq!(updated["protocols"][0]["ip_protocol"], 6);
}

#[tokio::test]
async fn test_delete_tolerates_missing_entity() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/proxies/5"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let provider = configured(&server);
    provider
        .delete("blastshield_proxy", &state(json!({"id": 5})))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_propagates_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/proxies/5"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let provider = configured(&server);
    let err = provider
        .delete("blastshield_proxy", &state(json!({"id": 5})))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to delete Proxy 5"));
}

#[tokio::test]
async fn test_import_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/endpoints/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "name": "db",
            "node_id": "n-1",
            "enabled": true,
            "address": "10.0.0.7"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/endpoints/7/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let provider = configured(&server);
    let imported = provider.import_state("blastshield_endpoint", "7").await.unwrap();
    assert_eq!(imported["id"], 7);
    assert_eq!(imported["address"], "10.0.0.7");
    // No memberships and nothing configured: stays unset
    assert!(imported["groups"].is_null());
}

#[tokio::test]
async fn test_import_rejects_non_numeric_id() {
    let server = MockServer::start().await;
    let provider = configured(&server);
    let err = provider
        .import_state("blastshield_group", "abc")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("expected an integer"));
}

#[tokio::test]
async fn test_import_missing_entity_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/groups/3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider = configured(&server);
    let err = provider.import_state("blastshield_group", "3").await.unwrap_err();
    assert!(err.to_string().contains("non-existent"));
}

#[tokio::test]
async fn test_list_data_source_applies_filters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nodes/"))
        .and(query_param("node_type", "gateway"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "n-1", "name": "gw-1", "node_type": "gateway"},
            {"id": "n-2", "name": "gw-2", "node_type": "gateway"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let provider = configured(&server);
    let result = provider
        .read_data_source("blastshield_nodes", &state(json!({"node_type": "gateway"})))
        .await
        .unwrap();

    let nodes = result["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[1]["name"], "gw-2");
    assert_eq!(result["node_type"], "gateway");
    assert!(result["name"].is_null());
}

#[tokio::test]
async fn test_entity_data_source() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/policies/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 11,
            "name": "allow-ssh",
            "enabled": true,
            "log": false,
            "from_groups": [1],
            "to_groups": [2],
            "services": [4]
        })))
        .mount(&server)
        .await;

    let provider = configured(&server);
    let result = provider
        .read_data_source("blastshield_policy", &state(json!({"id": 11})))
        .await
        .unwrap();
    assert_eq!(result["name"], "allow-ssh");
    assert_eq!(result["services"], json!([4]));
}

#[tokio::test]
async fn test_settings_data_source() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/settings/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "overlay_subnet": "100.64.0.0/10",
            "dns": {"servers": ["1.1.1.1"]}
        })))
        .mount(&server)
        .await;

    let provider = configured(&server);
    let result = provider
        .read_data_source("blastshield_settings", &State::new())
        .await
        .unwrap();
    assert_eq!(result["overlay_subnet"], "100.64.0.0/10");
    assert_eq!(result["dns"]["servers"][0], "1.1.1.1");
}

#[tokio::test]
async fn test_endpoint_create_with_null_group_expiry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/endpoints/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/endpoints/5/groups"))
        .and(body_json(json!({"op": "replace", "groups": [{"id": 2, "expires": 0}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2, "expires": null}])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/endpoints/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "name": "db",
            "node_id": "n-1",
            "enabled": true
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/endpoints/5/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2, "expires": null}])))
        .mount(&server)
        .await;

    let provider = configured(&server);
    let created = provider
        .create(
            "blastshield_endpoint",
            &state(json!({
                "name": "db",
                "node_id": "n-1",
                "enabled": true,
                "groups": [{"id": 2, "expires": null}]
            })),
        )
        .await
        .unwrap();

    assert_eq!(created["id"], 5);
    assert_eq!(created["groups"], json!([{"id": 2, "expires": 0}]));
}

#[tokio::test]
async fn test_create_with_invalid_groups_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/endpoints/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .expect(0)
        .mount(&server)
        .await;

    let provider = configured(&server);
    let err = provider
        .create(
            "blastshield_endpoint",
            &state(json!({
                "name": "db",
                "node_id": "n-1",
                "enabled": true,
                "groups": [{"id": "ops"}]
            })),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid groups for Endpoint"));
}

#[tokio::test]
async fn test_import_endpoint_with_null_group_expiry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/endpoints/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "name": "db",
            "node_id": "n-1",
            "enabled": true
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/endpoints/5/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2, "expires": null}])))
        .mount(&server)
        .await;

    let provider = configured(&server);
    let imported = provider.import_state("blastshield_endpoint", "5").await.unwrap();
    assert_eq!(imported["groups"], json!([{"id": 2, "expires": 0}]));
}
