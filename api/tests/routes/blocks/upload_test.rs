#[cfg(test)]
mod tests {
    use crate::helpers::{Part, TestApp, block_uri, create_course, create_user, make_test_app, multipart_request};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
        response::Response,
    };
    use chrono::{Duration, Utc};
    use db::field_store::{BlockKey, FieldStore, FieldWrite, Namespace, DbFieldStore};
    use db::models::user_course_role::Role;
    use serde_json::Value;
    use serial_test::serial;
    use std::io::Cursor;
    use tower::ServiceExt;
    use util::config::AppConfig;
    use util::fingerprint::{canonical_path, fingerprint};

    const BLOCK_ID: i64 = 7;

    async fn upload(t: &TestApp, course_id: i64, token: &str, filename: &str, content_type: Option<&str>, bytes: &[u8]) -> Response {
        let req = multipart_request(
            &block_uri(course_id, BLOCK_ID, "upload_assignment"),
            token,
            &[Part::File {
                name: "file",
                filename,
                content_type,
                bytes,
            }],
            None,
        );
        t.app.clone().oneshot(req).await.unwrap()
    }

    async fn get(t: &TestApp, uri: &str, token: &str) -> Response {
        let req = Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        t.app.clone().oneshot(req).await.unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    #[serial]
    async fn student_upload_is_stored_at_its_canonical_path() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [Some("mentor@example.com"), None, None]).await;
        let student = create_user(&t.db, "student", course_id, Some(Role::Student)).await;
        let bytes: Vec<u8> = (0..10_240).map(|i| (i % 251) as u8).collect();

        let response = upload(&t, course_id, &student.token, "hw1.pdf", Some("application/pdf"), &bytes).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.is_empty());

        let digest = fingerprint(&mut Cursor::new(bytes.clone())).unwrap();
        let expected = canonical_path(student.id, &digest, "hw1.pdf");
        assert_eq!(t.storage.get(&expected).unwrap(), bytes);

        let response = get(&t, &block_uri(course_id, BLOCK_ID, "submission"), &student.token).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["data"]["fingerprint"], digest.as_str());
        assert_eq!(json["data"]["path"], expected.as_str());
        assert_eq!(json["data"]["mimetype"], "application/pdf");

        let response = get(&t, &block_uri(course_id, BLOCK_ID, "submission/file"), &student.token).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(body_bytes(response).await, bytes);
    }

    #[tokio::test]
    #[serial]
    async fn identical_reupload_writes_nothing_new() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let student = create_user(&t.db, "student", course_id, Some(Role::Student)).await;

        for _ in 0..2 {
            let response = upload(&t, course_id, &student.token, "a.txt", Some("text/plain"), b"same bytes").await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(t.storage.write_count(), 1);
        assert_eq!(t.storage.len(), 1);
    }

    #[tokio::test]
    #[serial]
    async fn missing_content_type_is_guessed_from_filename() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let student = create_user(&t.db, "student", course_id, Some(Role::Student)).await;

        let response = upload(&t, course_id, &student.token, "notes.txt", None, b"plain notes").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get(&t, &block_uri(course_id, BLOCK_ID, "submission"), &student.token).await;
        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["data"]["mimetype"], "text/plain");
    }

    #[tokio::test]
    #[serial]
    async fn users_without_student_role_are_refused() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let outsider = create_user(&t.db, "outsider", course_id, None).await;
        let staff = create_user(&t.db, "staff", course_id, Some(Role::Staff)).await;

        for user in [&outsider, &staff] {
            let response = upload(&t, course_id, &user.token, "x.txt", Some("text/plain"), b"nope").await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }
        assert!(t.storage.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn uploads_after_the_due_date_are_refused() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let student = create_user(&t.db, "student", course_id, Some(Role::Student)).await;

        let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
        DbFieldStore::new(t.db.clone())
            .commit(
                BlockKey::new(course_id, BLOCK_ID),
                vec![FieldWrite::new(Namespace::Settings, "due", past)],
            )
            .await
            .unwrap();

        let response = upload(&t, course_id, &student.token, "late.txt", Some("text/plain"), b"late").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(t.storage.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn missing_file_field_is_a_bad_request() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let student = create_user(&t.db, "student", course_id, Some(Role::Student)).await;

        let req = multipart_request(
            &block_uri(course_id, BLOCK_ID, "upload_assignment"),
            &student.token,
            &[Part::Text {
                name: "comment",
                value: "forgot the file",
            }],
            None,
        );
        let response = t.app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["message"], "Missing file upload");
    }

    #[tokio::test]
    #[serial]
    async fn oversized_upload_is_rejected() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let student = create_user(&t.db, "student", course_id, Some(Role::Student)).await;

        AppConfig::set_max_upload_bytes(16);
        let response = upload(&t, course_id, &student.token, "big.bin", None, &[0u8; 64]).await;
        AppConfig::reset();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(t.storage.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn submission_lookup_before_upload_is_not_found() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let student = create_user(&t.db, "student", course_id, Some(Role::Student)).await;

        let response = get(&t, &block_uri(course_id, BLOCK_ID, "submission"), &student.token).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn upload_requires_a_token() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;

        let response = upload(&t, course_id, "not-a-token", "a.txt", None, b"x").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
