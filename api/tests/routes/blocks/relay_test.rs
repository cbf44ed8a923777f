#[cfg(test)]
mod tests {
    use crate::helpers::{Part, TestApp, block_uri, create_course, create_user, make_test_app, multipart_request};
    use crate::helpers::multipart::BOUNDARY;
    use api::auth::generate_jwt;
    use api::routes::blocks::post::MAX_TEXT_FIELD_BYTES;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
        response::Response,
    };
    use db::models::{mentor_message::Model as MentorMessageModel, user::Model as UserModel, user_course_role::Role};
    use serde_json::Value;
    use serial_test::serial;
    use services::email::MailError;
    use tower::ServiceExt;
    use util::config::AppConfig;

    const BLOCK_ID: i64 = 3;

    fn full_form<'a>() -> Vec<Part<'a>> {
        vec![
            Part::Text {
                name: "subject",
                value: "Hi",
            },
            Part::Text {
                name: "message",
                value: "body",
            },
            Part::File {
                name: "file",
                filename: "note.txt",
                content_type: Some("text/plain"),
                bytes: b"see attached",
            },
        ]
    }

    async fn relay(t: &TestApp, course_id: i64, token: &str, parts: &[Part<'_>], accept: Option<&str>) -> Response {
        let req = multipart_request(&block_uri(course_id, BLOCK_ID, "relay_message"), token, parts, accept);
        t.app.clone().oneshot(req).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn delivered_message_returns_created_with_empty_body() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [Some("mentor@example.com"), None, None]).await;
        let instructor = create_user(&t.db, "lecturer", course_id, Some(Role::Instructor)).await;

        let response = relay(&t, course_id, &instructor.token, &full_form(), None).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(body_text(response).await.is_empty());

        let sent = t.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["mentor@example.com".to_string()]);
        assert_eq!(sent[0].from, instructor.email);
        assert_eq!(sent[0].subject, "Hi");
        let attachment = sent[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.filename, "note.txt");
        assert_eq!(attachment.bytes, b"see attached");
    }

    #[tokio::test]
    #[serial]
    async fn refused_recipient_is_recorded_and_still_created() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [Some("gone@example.com"), None, None]).await;
        let instructor = create_user(&t.db, "lecturer", course_id, Some(Role::Instructor)).await;
        t.mailer
            .fail_next(MailError::RecipientsRefused("550 5.1.1 user unknown".into()));

        let response = relay(&t, course_id, &instructor.token, &full_form(), Some("application/json")).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let records = MentorMessageModel::find_by_course(&t.db, course_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].is_delivered);
        assert_eq!(records[0].error, "550 5.1.1 user unknown");
        assert_eq!(records[0].sent_by, instructor.id);
        assert_eq!(records[0].message, "body");
    }

    #[tokio::test]
    #[serial]
    async fn missing_file_with_json_accept_returns_json_error() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [Some("mentor@example.com"), None, None]).await;
        let instructor = create_user(&t.db, "lecturer", course_id, Some(Role::Instructor)).await;
        let parts: Vec<Part<'_>> = full_form().into_iter().take(2).collect();

        let response = relay(&t, course_id, &instructor.token, &parts, Some("application/json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["error"], "missing field 'file'");
        assert!(t.mailer.sent().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn missing_file_without_json_accept_returns_text() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [Some("mentor@example.com"), None, None]).await;
        let instructor = create_user(&t.db, "lecturer", course_id, Some(Role::Instructor)).await;
        let parts: Vec<Part<'_>> = full_form().into_iter().take(2).collect();

        let response = relay(&t, course_id, &instructor.token, &parts, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Bad Request missing field 'file'");
    }

    #[tokio::test]
    #[serial]
    async fn other_transport_failure_is_a_server_error() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [Some("mentor@example.com"), None, None]).await;
        let staff = create_user(&t.db, "tutor", course_id, Some(Role::Staff)).await;
        t.mailer.fail_next(MailError::Other("connection refused".into()));

        let response = relay(&t, course_id, &staff.token, &full_form(), None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(MentorMessageModel::find_by_course(&t.db, course_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn students_cannot_relay() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [Some("mentor@example.com"), None, None]).await;
        let student = create_user(&t.db, "student", course_id, Some(Role::Student)).await;

        let response = relay(&t, course_id, &student.token, &full_form(), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(t.mailer.sent().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn admins_relay_without_a_course_role() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [Some("mentor@example.com"), None, None]).await;
        let admin = UserModel::create(&t.db, "admin", "admin@example.com", true).await.unwrap();
        let (token, _) = generate_jwt(admin.id, true).unwrap();

        let response = relay(&t, course_id, &token, &full_form(), None).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(t.mailer.sent()[0].from, "admin@example.com");
    }

    #[tokio::test]
    #[serial]
    async fn truncated_multipart_body_is_a_bad_request() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [Some("mentor@example.com"), None, None]).await;
        let instructor = create_user(&t.db, "lecturer", course_id, Some(Role::Instructor)).await;

        let body = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"subject\"\r\n\r\nHi");
        let req = Request::builder()
            .method("POST")
            .uri(block_uri(course_id, BLOCK_ID, "relay_message"))
            .header(header::AUTHORIZATION, format!("Bearer {}", instructor.token))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .header(header::ACCEPT, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = t.app.clone().oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(json["error"].as_str().unwrap().starts_with("malformed multipart body"));
        assert!(t.mailer.sent().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn oversized_attachment_is_a_bad_request() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [Some("mentor@example.com"), None, None]).await;
        let instructor = create_user(&t.db, "lecturer", course_id, Some(Role::Instructor)).await;
        let parts = vec![
            Part::Text {
                name: "subject",
                value: "Hi",
            },
            Part::Text {
                name: "message",
                value: "body",
            },
            Part::File {
                name: "file",
                filename: "big.bin",
                content_type: None,
                bytes: &[7u8; 64],
            },
        ];

        AppConfig::set_max_upload_bytes(16);
        let response = relay(&t, course_id, &instructor.token, &parts, None).await;
        AppConfig::reset();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Bad Request malformed multipart body: field 'file' exceeds 16 bytes");
        assert!(t.mailer.sent().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn oversized_message_text_is_a_bad_request() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [Some("mentor@example.com"), None, None]).await;
        let instructor = create_user(&t.db, "lecturer", course_id, Some(Role::Instructor)).await;
        let long = "a".repeat(MAX_TEXT_FIELD_BYTES as usize + 1);
        let parts = vec![
            Part::Text {
                name: "subject",
                value: "Hi",
            },
            Part::Text {
                name: "message",
                value: &long,
            },
        ];

        let response = relay(&t, course_id, &instructor.token, &parts, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(t.mailer.sent().is_empty());
    }
}
