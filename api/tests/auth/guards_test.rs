#[cfg(test)]
mod tests {
    use crate::helpers::{TestApp, block_uri, create_course, create_user, make_test_app};
    use api::auth::{Claims, generate_jwt};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::{Duration, Utc};
    use db::models::{user::Model as UserModel, user_course_role::Role};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serial_test::serial;
    use tower::ServiceExt;
    use util::config::AppConfig;

    use crate::helpers::app::TEST_JWT_SECRET;

    async fn get_settings(t: &TestApp, course_id: i64, token: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().method("GET").uri(block_uri(course_id, 1, "settings"));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = t.app.clone().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        response.status()
    }

    #[tokio::test]
    #[serial]
    async fn staff_routes_require_a_token() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        assert_eq!(get_settings(&t, course_id, None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn expired_token_is_unauthorized() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let lecturer = create_user(&t.db, "lecturer", course_id, Some(Role::Instructor)).await;

        let claims = Claims {
            sub: lecturer.id,
            admin: false,
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(get_settings(&t, course_id, Some(&token)).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn course_roles_decide_staff_access() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let instructor = create_user(&t.db, "lecturer", course_id, Some(Role::Instructor)).await;
        let staff = create_user(&t.db, "tutor", course_id, Some(Role::Staff)).await;
        let student = create_user(&t.db, "student", course_id, Some(Role::Student)).await;
        let outsider = create_user(&t.db, "outsider", course_id, None).await;

        assert_eq!(get_settings(&t, course_id, Some(&instructor.token)).await, StatusCode::OK);
        assert_eq!(get_settings(&t, course_id, Some(&staff.token)).await, StatusCode::OK);
        assert_eq!(get_settings(&t, course_id, Some(&student.token)).await, StatusCode::FORBIDDEN);
        assert_eq!(get_settings(&t, course_id, Some(&outsider.token)).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[serial]
    async fn admins_pass_the_staff_guard() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let admin = UserModel::create(&t.db, "admin", "admin@example.com", true).await.unwrap();
        let (token, _) = generate_jwt(admin.id, true).unwrap();

        assert_eq!(get_settings(&t, course_id, Some(&token)).await, StatusCode::OK);
    }

    #[tokio::test]
    #[serial]
    async fn tokens_signed_with_an_empty_secret_are_rejected() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let claims = Claims {
            sub: 424242,
            admin: true,
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        };
        let forged = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"")).unwrap();

        AppConfig::set_jwt_secret("");
        let status = get_settings(&t, course_id, Some(&forged)).await;
        assert!(generate_jwt(1, false).is_err());
        AppConfig::reset();

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn admin_claim_for_unknown_user_is_forbidden() {
        let t = make_test_app().await;
        let course_id = create_course(&t.db, [None, None, None]).await;
        let (token, _) = generate_jwt(424242, true).unwrap();

        assert_eq!(get_settings(&t, course_id, Some(&token)).await, StatusCode::FORBIDDEN);
    }
}
