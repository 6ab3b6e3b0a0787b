mod common;

use axum::http::{Method, StatusCode};
use common::{ALICE, ALICE_TOKEN, BOB, BOB_TOKEN, InMemoryRepository, TestApp, body_json, get, request, signed_in_users};
use serde_json::json;
use uuid::Uuid;

// --- Home & History ---

#[tokio::test]
async fn test_home_splits_preset_and_custom_lists() {
    let app = TestApp::with_users();
    app.repo.seed_list(ALICE, "daycare");
    app.repo.seed_list(ALICE, "beach day");
    app.repo.seed_list(ALICE, "trip");
    app.repo.seed_list(BOB, "grandparents");

    let response = app.send(get("/home", Some(ALICE_TOKEN))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let presets: Vec<&str> = body["preset_lists"]
        .as_array()
        .unwrap()
        .iter()
        .map(|list| list["name"].as_str().unwrap())
        .collect();
    assert_eq!(presets, vec!["trip", "daycare"]);
    assert_eq!(body["custom_lists"][0]["name"], "beach day");
    assert_eq!(body["custom_lists"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_history_is_newest_first_and_scoped_to_caller() {
    let app = TestApp::with_users();
    app.repo.seed_list(ALICE, "first");
    app.repo.seed_list(BOB, "not mine");
    app.repo.seed_list(ALICE, "second");

    let response = app.send(get("/history", Some(ALICE_TOKEN))).await;

    let body = body_json(response).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|list| list["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["second", "first"]);
}

// --- Lists ---

#[tokio::test]
async fn test_create_list_trims_name() {
    let app = TestApp::with_users();

    let response = app
        .send(request(
            Method::POST,
            "/lists",
            Some(ALICE_TOKEN),
            Some(json!({ "name": "  park  " })),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["name"], "park");
    assert_eq!(body["user_id"], ALICE.to_string());
}

#[tokio::test]
async fn test_create_list_rejects_blank_name() {
    let app = TestApp::with_users();

    let response = app
        .send(request(
            Method::POST,
            "/lists",
            Some(ALICE_TOKEN),
            Some(json!({ "name": "   " })),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.repo.lists().is_empty());
}

#[tokio::test]
async fn test_rename_list() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "park");

    let response = app
        .send(request(
            Method::PUT,
            &format!("/lists/{}", list.id),
            Some(ALICE_TOKEN),
            Some(json!({ "name": "playground" })),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.repo.lists()[0].name, "playground");
}

#[tokio::test]
async fn test_cannot_rename_or_delete_someone_elses_list() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "park");
    let uri = format!("/lists/{}", list.id);

    let rename = app
        .send(request(Method::PUT, &uri, Some(BOB_TOKEN), Some(json!({ "name": "mine now" }))))
        .await;
    let delete = app.send(request(Method::DELETE, &uri, Some(BOB_TOKEN), None)).await;

    assert_eq!(rename.status(), StatusCode::NOT_FOUND);
    assert_eq!(delete.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.repo.lists(), vec![list]);
}

#[tokio::test]
async fn test_delete_list_removes_its_items() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "park");
    app.repo.seed_item(&list, "hat", "clothes", false);

    let response = app
        .send(request(Method::DELETE, &format!("/lists/{}", list.id), Some(ALICE_TOKEN), None))
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.repo.lists().is_empty());
    assert!(app.repo.items().is_empty());
}

// --- Inventory ---

#[tokio::test]
async fn test_inventory_view_groups_by_category() {
    let app = TestApp::with_users();
    app.repo.seed_inventory(ALICE, "bottle", "feeding");
    app.repo.seed_inventory(ALICE, "hat", "clothes");
    app.repo.seed_inventory(ALICE, "bib", "feeding");
    app.repo.seed_inventory(BOB, "tent", "camping");

    let response = app.send(get("/inventory", Some(ALICE_TOKEN))).await;

    let body = body_json(response).await;
    assert_eq!(body["categories"], json!(["feeding", "clothes"]));
    assert_eq!(body["groups"][0]["category"], "clothes");
    assert_eq!(body["groups"][1]["category"], "feeding");
    assert_eq!(body["groups"][1]["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_add_inventory_items_parses_bulk_text() {
    let app = TestApp::with_users();

    let response = app
        .send(request(
            Method::POST,
            "/inventory",
            Some(ALICE_TOKEN),
            Some(json!({ "category": " feeding ", "items": "bottle, bib\n\nformula ,," })),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let names: Vec<String> = app.repo.inventory().into_iter().map(|item| item.name).collect();
    assert_eq!(names, vec!["bottle", "bib", "formula"]);
    assert!(app.repo.inventory().iter().all(|item| item.category == "feeding"));
}

#[tokio::test]
async fn test_add_inventory_items_validation() {
    let app = TestApp::with_users();

    let no_category = app
        .send(request(
            Method::POST,
            "/inventory",
            Some(ALICE_TOKEN),
            Some(json!({ "category": "", "items": "bottle" })),
        ))
        .await;
    let no_items = app
        .send(request(
            Method::POST,
            "/inventory",
            Some(ALICE_TOKEN),
            Some(json!({ "category": "feeding", "items": " , \n" })),
        ))
        .await;

    assert_eq!(no_category.status(), StatusCode::BAD_REQUEST);
    assert_eq!(no_items.status(), StatusCode::BAD_REQUEST);
    let body = body_json(no_items).await;
    assert_eq!(body["error"], "Please enter at least one item.");
    assert!(app.repo.inventory().is_empty());
}

#[tokio::test]
async fn test_delete_inventory_item_is_owner_only() {
    let app = TestApp::with_users();
    let item = app.repo.seed_inventory(ALICE, "bottle", "feeding");
    let uri = format!("/inventory/items/{}", item.id);

    let by_bob = app.send(request(Method::DELETE, &uri, Some(BOB_TOKEN), None)).await;
    assert_eq!(by_bob.status(), StatusCode::NOT_FOUND);

    let by_alice = app.send(request(Method::DELETE, &uri, Some(ALICE_TOKEN), None)).await;
    assert_eq!(by_alice.status(), StatusCode::NO_CONTENT);
    assert!(app.repo.inventory().is_empty());
}

#[tokio::test]
async fn test_delete_category_removes_only_callers_rows() {
    let app = TestApp::with_users();
    app.repo.seed_inventory(ALICE, "bottle", "feeding");
    app.repo.seed_inventory(ALICE, "bib", "feeding");
    app.repo.seed_inventory(ALICE, "hat", "clothes");
    app.repo.seed_inventory(BOB, "spoon", "feeding");

    let response = app
        .send(request(Method::DELETE, "/inventory/categories/feeding", Some(ALICE_TOKEN), None))
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let left: Vec<(Uuid, String)> = app
        .repo
        .inventory()
        .into_iter()
        .map(|item| (item.user_id, item.name))
        .collect();
    assert_eq!(left, vec![(ALICE, "hat".to_string()), (BOB, "spoon".to_string())]);
}

#[tokio::test]
async fn test_delete_unknown_category_is_not_found() {
    let app = TestApp::with_users();

    let response = app
        .send(request(Method::DELETE, "/inventory/categories/toys", Some(ALICE_TOKEN), None))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// --- Checklist ---

#[tokio::test]
async fn test_checklist_view_reports_progress() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "daycare");
    app.repo.seed_item(&list, "bottle", "feeding", true);
    app.repo.seed_item(&list, "hat", "clothes", false);
    app.repo.seed_inventory(ALICE, "bib", "feeding");

    let response = app
        .send(get(&format!("/checklist/{}", list.id), Some(ALICE_TOKEN)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["list"]["name"], "daycare");
    assert_eq!(body["packed_count"], 1);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["all_packed"], false);
    assert_eq!(body["groups"][0]["category"], "clothes");
    assert_eq!(body["inventory"][0]["items"][0]["name"], "bib");
}

#[tokio::test]
async fn test_checklist_of_someone_else_is_not_found() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "daycare");

    let response = app
        .send(get(&format!("/checklist/{}", list.id), Some(BOB_TOKEN)))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_items_copies_only_owned_inventory() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "trip");
    let bottle = app.repo.seed_inventory(ALICE, "bottle", "feeding");
    let foreign = app.repo.seed_inventory(BOB, "tent", "camping");

    let response = app
        .send(request(
            Method::POST,
            &format!("/checklist/{}/items", list.id),
            Some(ALICE_TOKEN),
            Some(json!({ "inventory_ids": [bottle.id, foreign.id] })),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let items = app.repo.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "bottle");
    assert_eq!(items[0].category, "feeding");
    assert!(!items[0].is_checked);
}

#[tokio::test]
async fn test_add_items_requires_a_selection() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "trip");

    let response = app
        .send(request(
            Method::POST,
            &format!("/checklist/{}/items", list.id),
            Some(ALICE_TOKEN),
            Some(json!({ "inventory_ids": [] })),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_toggle_flips_packed_state() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "trip");
    let item = app.repo.seed_item(&list, "bottle", "feeding", false);
    let uri = format!("/checklist/{}/items/{}", list.id, item.id);

    let first = app.send(request(Method::PATCH, &uri, Some(ALICE_TOKEN), None)).await;
    assert_eq!(body_json(first).await["is_checked"], true);

    let second = app.send(request(Method::PATCH, &uri, Some(ALICE_TOKEN), None)).await;
    assert_eq!(body_json(second).await["is_checked"], false);
}

#[tokio::test]
async fn test_toggle_by_other_user_is_not_found() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "trip");
    let item = app.repo.seed_item(&list, "bottle", "feeding", false);

    let response = app
        .send(request(
            Method::PATCH,
            &format!("/checklist/{}/items/{}", list.id, item.id),
            Some(BOB_TOKEN),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!app.repo.items()[0].is_checked);
}

#[tokio::test]
async fn test_delete_checklist_item() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "trip");
    let item = app.repo.seed_item(&list, "bottle", "feeding", false);
    let uri = format!("/checklist/{}/items/{}", list.id, item.id);

    let response = app.send(request(Method::DELETE, &uri, Some(ALICE_TOKEN), None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let again = app.send(request(Method::DELETE, &uri, Some(ALICE_TOKEN), None)).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset_unchecks_everything() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "trip");
    app.repo.seed_item(&list, "bottle", "feeding", true);
    app.repo.seed_item(&list, "hat", "clothes", true);

    let response = app
        .send(request(Method::POST, &format!("/checklist/{}/reset", list.id), Some(ALICE_TOKEN), None))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.repo.items().iter().all(|item| !item.is_checked));
}

#[tokio::test]
async fn test_reset_of_someone_elses_list_changes_nothing() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "trip");
    app.repo.seed_item(&list, "bottle", "feeding", true);

    let response = app
        .send(request(Method::POST, &format!("/checklist/{}/reset", list.id), Some(BOB_TOKEN), None))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.repo.items()[0].is_checked);
}

// --- Failures ---

#[tokio::test]
async fn test_data_store_failure_is_reported_without_details() {
    let app = TestApp::new(InMemoryRepository::failing(), signed_in_users());

    let response = app.send(get("/home", Some(ALICE_TOKEN))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Something went wrong with your data. Please try again.");
}

#[tokio::test]
async fn test_data_store_failure_on_write_uses_same_message() {
    let app = TestApp::new(InMemoryRepository::failing(), signed_in_users());

    let response = app
        .send(request(Method::POST, "/lists", Some(ALICE_TOKEN), Some(json!({ "name": "park" }))))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Something went wrong with your data. Please try again.");
}

#[tokio::test]
async fn test_malformed_list_id_is_a_bad_request() {
    let app = TestApp::with_users();

    let response = app.send(get("/checklist/not-a-uuid", Some(ALICE_TOKEN))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid address"));
}

#[tokio::test]
async fn test_malformed_item_path_is_a_json_error() {
    let app = TestApp::with_users();
    let list = app.repo.seed_list(ALICE, "trip");

    let response = app
        .send(request(
            Method::PATCH,
            &format!("/checklist/{}/items/42", list.id),
            Some(ALICE_TOKEN),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_body_with_wrong_types_is_a_json_error() {
    let app = TestApp::with_users();

    let response = app
        .send(request(
            Method::POST,
            "/lists",
            Some(ALICE_TOKEN),
            Some(json!({ "name": 7 })),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
    assert!(app.repo.lists().is_empty());
}

#[tokio::test]
async fn test_body_that_is_not_json_is_a_json_error() {
    let app = TestApp::with_users();

    let response = app
        .send(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("/inventory")
                .header("cookie", format!("sb-access-token={ALICE_TOKEN}"))
                .header("content-type", "application/json")
                .body(axum::body::Body::from("category=feeding"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}
