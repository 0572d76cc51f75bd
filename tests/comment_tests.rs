mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_create_comment() {
    let t = TestApp::new().await;
    let (alice, token) = t.user("alice").await;
    let post = t.create_post(&token, "hello").await;

    let (status, body) = t
        .post(
            "/api/comments",
            Some(&token),
            json!({ "post": post, "content": " first! " }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"], "first!");
    assert_eq!(body["post"], post);
    assert_eq!(body["user"]["id"], alice);
    assert_eq!(body["total_likes"], 0);
    assert_eq!(body["total_dislikes"], 0);

    let (_, post_body) = t.get(&format!("/api/posts/{}", post), None).await;
    assert_eq!(post_body["comment_count"], 1);
}

#[tokio::test]
async fn test_create_comment_validation() {
    let t = TestApp::new().await;
    let (_, token) = t.user("alice").await;

    let (status, body) = t
        .post("/api/comments", Some(&token), json!({ "content": "orphan" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["post"][0], "This field is required.");

    let (status, body) = t
        .post(
            "/api/comments",
            Some(&token),
            json!({ "post": 42, "content": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["post"][0], "Invalid pk \"42\" - object does not exist.");
    assert!(body["content"].is_array());

    let (status, _) = t
        .post("/api/comments", None, json!({ "post": 1, "content": "hi" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_by_post() {
    let t = TestApp::new().await;
    let (_, token) = t.user("alice").await;
    let first = t.create_post(&token, "one").await;
    let second = t.create_post(&token, "two").await;

    for (post, content) in [(first, "a"), (first, "b"), (second, "c")] {
        let (status, _) = t
            .post(
                "/api/comments",
                Some(&token),
                json!({ "post": post, "content": content }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = t.get("/api/comments", None).await;
    assert_eq!(body["count"], 3);

    let (_, body) = t.get(&format!("/api/comments?post={}", first), None).await;
    assert_eq!(body["count"], 2);
    assert!(
        body["results"]
            .as_array()
            .unwrap()
            .iter()
            .all(|c| c["post"] == first)
    );

    let (status, body) = t.get("/api/comments?post=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["post"][0], "A valid integer is required.");
}

#[tokio::test]
async fn test_only_author_can_modify() {
    let t = TestApp::new().await;
    let (_, alice) = t.user("alice").await;
    let (_, bob) = t.user("bob").await;
    let post = t.create_post(&bob, "bob's post").await;

    let (_, comment) = t
        .post(
            "/api/comments",
            Some(&alice),
            json!({ "post": post, "content": "original" }),
        )
        .await;
    let uri = format!("/api/comments/{}", comment["id"]);

    // The post owner does not own the comment
    let (status, _) = t
        .request("PUT", &uri, Some(&bob), Some(json!({ "content": "edited" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.delete(&uri, Some(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t
        .request("PATCH", &uri, Some(&alice), Some(json!({ "content": "edited" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "edited");

    let (_, body) = t.get(&uri, None).await;
    assert_eq!(body["content"], "edited");

    let (status, _) = t.delete(&uri, Some(&alice)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = t.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_likes_and_dislikes_are_independent() {
    let t = TestApp::new().await;
    let (_, alice) = t.user("alice").await;
    let (_, bob) = t.user("bob").await;
    let post = t.create_post(&alice, "post").await;
    let (_, comment) = t
        .post(
            "/api/comments",
            Some(&alice),
            json!({ "post": post, "content": "divisive" }),
        )
        .await;
    let like = format!("/api/comments/{}/like", comment["id"]);
    let dislike = format!("/api/comments/{}/dislike", comment["id"]);

    let (status, body) = t.post(&like, Some(&bob), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "total_likes": 1, "total_dislikes": 0 }));

    // Same user may both like and dislike
    let (_, body) = t.post(&dislike, Some(&bob), json!({})).await;
    assert_eq!(body, json!({ "total_likes": 1, "total_dislikes": 1 }));

    // Repeating a reaction does not count twice
    let (_, body) = t.post(&like, Some(&bob), json!({})).await;
    assert_eq!(body["total_likes"], 1);

    let (_, body) = t.post(&dislike, Some(&alice), json!({})).await;
    assert_eq!(body["total_dislikes"], 2);

    let (_, body) = t.delete(&like, Some(&bob)).await;
    assert_eq!(body, json!({ "total_likes": 0, "total_dislikes": 2 }));

    let (_, body) = t.delete(&dislike, Some(&bob)).await;
    assert_eq!(body, json!({ "total_likes": 0, "total_dislikes": 1 }));

    let (status, _) = t.post("/api/comments/999/like", Some(&bob), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_post_removes_comments() {
    let t = TestApp::new().await;
    let (_, token) = t.user("alice").await;
    let post = t.create_post(&token, "post").await;
    let (_, comment) = t
        .post(
            "/api/comments",
            Some(&token),
            json!({ "post": post, "content": "gone soon" }),
        )
        .await;

    let (status, _) = t.delete(&format!("/api/posts/{}", post), Some(&token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = t.get(&format!("/api/comments/{}", comment["id"]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
