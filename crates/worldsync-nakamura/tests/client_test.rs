//! nakamura store tests against a wiremock server.

use serde_json::json;
use wiremock::matchers::{basic_auth, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use worldsync_core::{
    run_members, CreateGroupPayload, GroupId, GroupStore, ImportConfig, InputRow, Joinability,
    MemberVisibility, PropertyPatch, ServerConfig, StoreError, UserId, Visibility,
};
use worldsync_nakamura::NakamuraStore;

/// Helper: store pointing at the mock server with admin credentials.
fn store(server: &MockServer) -> NakamuraStore {
    NakamuraStore::with_http_client(
        &server.uri(),
        "admin",
        Some("admin".to_string()),
        reqwest::Client::new(),
    )
}

fn world_json() -> serde_json::Value {
    json!({
        "properties": {
            "sakai:world-type": "course",
            "sakai:roles": "[{\"id\":\"member\",\"title\":\"Member\"},{\"id\":\"manager\",\"title\":\"Manager\"}]",
            "sakai:group-title": "Physics 101"
        },
        "members": ["phys-101-member", "phys-101-manager"]
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Reads
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_get_group_details_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/system/userManager/group/phys-101.json"))
        .and(basic_auth("admin", "admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(world_json()))
        .expect(1)
        .mount(&server)
        .await;

    let details = store(&server)
        .get_group_details(&GroupId::new("phys-101"))
        .await
        .unwrap()
        .unwrap();

    let props = details.properties.unwrap();
    assert_eq!(props.world_type.as_deref(), Some("course"));
    assert_eq!(props.get_str("sakai:group-title"), Some("Physics 101"));
    let roles = props.role_definitions(&GroupId::new("phys-101")).unwrap();
    assert_eq!(roles.len(), 2);
}

#[tokio::test]
async fn test_get_group_details_not_found_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/system/userManager/group/ghost.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let details = store(&server)
        .get_group_details(&GroupId::new("ghost"))
        .await
        .unwrap();
    assert!(details.is_none());
}

#[tokio::test]
async fn test_get_group_details_without_properties() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/system/userManager/group/bare.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "members": [] })))
        .mount(&server)
        .await;

    let details = store(&server)
        .get_group_details(&GroupId::new("bare"))
        .await
        .unwrap()
        .unwrap();
    assert!(details.properties.is_none());
}

#[tokio::test]
async fn test_get_role_subgroup_members() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/system/userManager/group/phys-101-member.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": { "sakai:group-title": "Physics 101 (Members)" },
            "members": ["alice", "bob", "alice"]
        })))
        .mount(&server)
        .await;

    let members = store(&server)
        .get_role_subgroup_members(&GroupId::new("phys-101-member"))
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.contains("alice"));
    assert!(members.contains("bob"));
}

#[tokio::test]
async fn test_missing_role_subgroup_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/system/userManager/group/phys-101-ta.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = store(&server)
        .get_role_subgroup_members(&GroupId::new("phys-101-ta"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::GroupNotFound { .. }));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_data() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/system/userManager/group/phys-101.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = store(&server)
        .get_group_details(&GroupId::new("phys-101"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidData { .. }));
}

// ═══════════════════════════════════════════════════════════════════════════
// Writes
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_add_member_as_viewer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/system/userManager/group/phys-101-member.update.json"))
        .and(header("Referer", format!("{}/", server.uri()).as_str()))
        .and(body_string_contains("%3Amember=alice"))
        .and(body_string_contains("%3Aviewer=alice"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .add_member(
            &GroupId::new("phys-101-member"),
            &UserId::new("alice"),
            MemberVisibility::Viewer,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_remove_member() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/system/userManager/group/phys-101-member.update.json"))
        .and(body_string_contains("%3Amember%40Delete=bob"))
        .and(body_string_contains("%3Aviewer%40Delete=bob"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .remove_member(&GroupId::new("phys-101-member"), &UserId::new("bob"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_group_posts_data_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/system/world/create"))
        .and(body_string_contains("data="))
        .and(body_string_contains("worldTemplate"))
        .and(body_string_contains("phys-101"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = CreateGroupPayload {
        id: GroupId::new("phys-101"),
        title: "Physics 101".into(),
        description: "Introduction to physics".into(),
        joinability: Joinability::No,
        visibility: Visibility::Public,
        tags: vec![],
        world_template: "/var/templates/worlds/course/basic".into(),
        charset: "utf-8".into(),
    };

    store(&server)
        .create_group(&GroupId::new("phys-101"), &payload)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_group_properties() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/system/userManager/group/phys-101.update.json"))
        .and(body_string_contains("grouping=north"))
        .and(body_string_contains("building=Hall+A"))
        .and(body_string_contains("_charset_=utf-8"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let patch = PropertyPatch {
        term: "Fall 2024".into(),
        contact_name: "Ada Lovelace".into(),
        contact_email: "ada@example.edu".into(),
        grouping: "north".into(),
        custom: vec![("building".into(), "Hall A".into())],
    };

    store(&server)
        .update_group_properties(&GroupId::new("phys-101"), &patch)
        .await
        .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = store(&server)
        .remove_member(&GroupId::new("phys-101-member"), &UserId::new("bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AuthenticationFailed));
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = store(&server)
        .get_group_details(&GroupId::new("phys-101"))
        .await
        .unwrap_err();
    match &err {
        StoreError::UnexpectedResponse { status, message } => {
            assert_eq!(*status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_connection_refused() {
    let config = ServerConfig {
        url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 2,
        ..Default::default()
    };
    let err = NakamuraStore::new(&config)
        .unwrap()
        .get_group_details(&GroupId::new("phys-101"))
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

// ═══════════════════════════════════════════════════════════════════════════
// End to end
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_members_run_against_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/system/userManager/group/phys-101.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(world_json()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/system/userManager/group/phys-101-member.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {},
            "members": ["alice", "xavier"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/system/userManager/group/phys-101-member.update.json"))
        .and(body_string_contains("%3Amember%40Delete=xavier"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/system/userManager/group/phys-101-member.update.json"))
        .and(body_string_contains("%3Amember=bob"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ImportConfig::from_json(
        r#"{ "members": { "roleMaps": { "course": { "Student": "member" } } } }"#,
    )
    .unwrap();
    let rows = vec![
        InputRow::new(1, ["alice", "phys-101", "Student"]),
        InputRow::new(2, ["bob", "phys-101", "Student"]),
    ];

    let report = run_members(&store(&server), &config.members, rows).await;

    assert!(report.is_clean(), "{}", report.render());
    assert_eq!(report.created, 1);
    assert_eq!(report.updated, 1);
}
