#[cfg(test)]
mod tests {
    use crate::helpers::{TestApp, block_uri, create_course, create_user, make_test_app};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
        response::Response,
    };
    use db::models::user_course_role::Role;
    use serde_json::{Value, json};
    use serial_test::serial;
    use tower::ServiceExt;

    const BLOCK_ID: i64 = 11;

    async fn save(t: &TestApp, course_id: i64, token: &str, payload: Value) -> Response {
        let req = Request::builder()
            .method("POST")
            .uri(block_uri(course_id, BLOCK_ID, "save_sua"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();
        t.app.clone().oneshot(req).await.unwrap()
    }

    async fn settings(t: &TestApp, course_id: i64, token: &str) -> Value {
        let req = Request::builder()
            .method("GET")
            .uri(block_uri(course_id, BLOCK_ID, "settings"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = t.app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice::<Value>(&bytes).unwrap()["data"].clone()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn save_then_read_back() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let instructor = create_user(&t.db, "lecturer", course_id, Some(Role::Instructor)).await;

        let response = save(
            &t,
            course_id,
            &instructor.token,
            json!({
                "display_name": "Essay",
                "description": "Write 500 words",
                "points": "20",
                "weight": 1.5,
                "due": "2026-11-01T12:00:00Z"
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let current = settings(&t, course_id, &instructor.token).await;
        assert_eq!(current["display_name"], "Essay");
        assert_eq!(current["description"], "Write 500 words");
        assert_eq!(current["points"], 20);
        assert_eq!(current["weight"], 1.5);
        assert_eq!(current["due"], "2026-11-01T12:00:00Z");
    }

    #[tokio::test]
    #[serial]
    async fn invalid_weight_rejects_the_whole_save() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let instructor = create_user(&t.db, "lecturer", course_id, Some(Role::Instructor)).await;

        let response = save(&t, course_id, &instructor.token, json!({ "points": 5, "weight": "bad" })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({ "error": "Weight must be a decimal number" }));

        let current = settings(&t, course_id, &instructor.token).await;
        assert_eq!(current["points"], 100);
        assert_eq!(current["weight"], Value::Null);
    }

    #[tokio::test]
    #[serial]
    async fn negative_points_are_rejected() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let staff = create_user(&t.db, "tutor", course_id, Some(Role::Staff)).await;

        let response = save(&t, course_id, &staff.token, json!({ "points": "-3" })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Points must be a positive integer");
    }

    #[tokio::test]
    #[serial]
    async fn students_cannot_change_settings() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let student = create_user(&t.db, "student", course_id, Some(Role::Student)).await;

        let response = save(&t, course_id, &student.token, json!({ "points": 1 })).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[serial]
    async fn wrongly_typed_field_is_a_json_bad_request() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let instructor = create_user(&t.db, "lecturer", course_id, Some(Role::Instructor)).await;

        let response = save(&t, course_id, &instructor.token, json!({ "display_name": 5, "points": 3 })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(json_body(response).await["error"].is_string());

        let current = settings(&t, course_id, &instructor.token).await;
        assert_eq!(current["points"], 100);
    }
}
