#[cfg(test)]
mod integration_tests {
    use crate::handlers::addresses::{CreateAddressRequest, UpdateAddressRequest};
    use crate::handlers::auth::{LoginRequest, REFRESH_COOKIE, RegisterRequest};
    use crate::handlers::cart_items::{AddCartItemRequest, UpdateCartItemRequest};
    use crate::handlers::categories::{CreateCategoryRequest, UpdateCategoryRequest};
    use crate::handlers::coupons::{CreateCouponRequest, UpdateCouponRequest};
    use crate::handlers::favorites::CreateFavoriteRequest;
    use crate::handlers::listings::{CreateListingRequest, UpdateListingRequest};
    use crate::handlers::messages::SendMessageRequest;
    use crate::handlers::reviews::{SubmitReviewRequest, UpdateReviewRequest};
    use crate::handlers::settings::UpdateSettingsRequest;
    use crate::handlers::transactions::CreateTransactionRequest;
    use crate::schemas::ApiResponse;
    use crate::test_utils::test_utils::{TEST_PASSWORD, setup_test_app};
    use axum::http::{HeaderValue, StatusCode, header};
    use axum_test::TestServer;

    fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }

    /// Register a fresh account with [`TEST_PASSWORD`].
    async fn register_user(server: &TestServer, email: &str) {
        let create_request = RegisterRequest {
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            confirm_password: TEST_PASSWORD.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        };

        let response = server.post("/api/register").json(&create_request).await;
        response.assert_status(StatusCode::CREATED);
    }

    /// Log an account in and return its access token.
    async fn login_token(server: &TestServer, email: &str) -> String {
        let login_request = LoginRequest {
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
        };

        let response = server.post("/api/login").json(&login_request).await;
        if response.status_code() != StatusCode::OK {
            let error_body = response.text();
            println!("Error response: {}", error_body);
            panic!("Expected 200 OK from login, got {}", response.status_code());
        }
        let body: serde_json::Value = response.json();
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn register_and_login(server: &TestServer, email: &str) -> String {
        register_user(server, email).await;
        login_token(server, email).await
    }

    /// The user listing is public, so ids can be looked up by email.
    async fn user_id_by_email(server: &TestServer, email: &str) -> i64 {
        let response = server.get("/api/users").await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<serde_json::Value>> = response.json();
        body.data
            .iter()
            .find(|user| user["email"] == email)
            .expect("user should be listed")["id"]
            .as_i64()
            .unwrap()
    }

    /// Create a listing owned by the bearer of `token` and return its id.
    async fn create_listing_with(
        server: &TestServer,
        token: &str,
        title: &str,
        price: &str,
        quantity: i32,
    ) -> i64 {
        let create_request = CreateListingRequest {
            title: title.to_string(),
            description: "Listing used by the integration tests".to_string(),
            image: None,
            price: price.parse().unwrap(),
            quantity,
            category_id: None,
            active: None,
        };

        let response = server
            .post("/api/listings")
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(&create_request)
            .await;

        if response.status_code() != StatusCode::CREATED {
            let error_body = response.text();
            println!("Error response: {}", error_body);
            panic!("Expected 201 Created for listing, got {}", response.status_code());
        }
        let body: ApiResponse<serde_json::Value> = response.json();
        body.data["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // Send GET request to health endpoint
        let response = server.get("/health").await;

        // Verify response
        response.assert_status(StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_register_user() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let create_request = RegisterRequest {
            email: "newcomer@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
            confirm_password: TEST_PASSWORD.to_string(),
            first_name: "New".to_string(),
            last_name: "Comer".to_string(),
        };

        // Send POST request to register
        let response = server.post("/api/register").json(&create_request).await;

        // Verify response
        if response.status_code() != StatusCode::CREATED {
            let error_body = response.text();
            println!("Error response: {}", error_body);
            panic!("Expected 201 Created, got {}", response.status_code());
        }
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "User registered successfully");
        assert_eq!(body["response"], "OK");

        // The new account shows up in the public user listing
        let user_id = user_id_by_email(&server, "newcomer@example.com").await;
        assert!(user_id > 0);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // The seeded alice account already holds this address
        let create_request = RegisterRequest {
            email: "alice@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
            confirm_password: TEST_PASSWORD.to_string(),
            first_name: "Alice".to_string(),
            last_name: "Again".to_string(),
        };

        let response = server.post("/api/register").json(&create_request).await;

        // Verify response
        response.assert_status(StatusCode::CONFLICT);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["status_code"], 409);
        assert_eq!(error_body["error"], "DUPLICATE_EMAIL");
        assert_eq!(error_body["message"], "User with this email already exists.");
    }

    #[tokio::test]
    async fn test_register_password_mismatch() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let create_request = RegisterRequest {
            email: "mismatch@example.com".to_string(),
            password: "one-password".to_string(),
            confirm_password: "another-password".to_string(),
            first_name: "Mis".to_string(),
            last_name: "Match".to_string(),
        };

        let response = server.post("/api/register").json(&create_request).await;

        // Verify response
        response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "PASSWORD_MISMATCH");
        assert_eq!(error_body["message"], "Confirm password does not match with password");
    }

    #[tokio::test]
    async fn test_register_invalid_email() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let create_request = RegisterRequest {
            email: "not-an-email".to_string(),
            password: TEST_PASSWORD.to_string(),
            confirm_password: TEST_PASSWORD.to_string(),
            first_name: "No".to_string(),
            last_name: "Email".to_string(),
        };

        let response = server.post("/api/register").json(&create_request).await;

        // Verify response
        response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "INVALID_EMAIL");
    }

    #[tokio::test]
    async fn test_login_returns_token_and_cookie() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let login_request = LoginRequest {
            email: "alice@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
        };

        // Send POST request to login
        let response = server.post("/api/login").json(&login_request).await;

        // Verify response
        response.assert_status(StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "User logged in successfully");
        assert_eq!(body["response"], "OK");
        assert!(!body["access_token"].as_str().unwrap().is_empty());

        // The refresh token travels in a cookie, never in the body
        let cookie = response.cookie(REFRESH_COOKIE);
        assert!(!cookie.value().is_empty());
        assert_eq!(cookie.http_only(), Some(true));
        assert!(body.get("refresh_token").is_none());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let login_request = LoginRequest {
            email: "alice@example.com".to_string(),
            password: "wrong-password".to_string(),
        };

        let response = server.post("/api/login").json(&login_request).await;

        // Verify response
        response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "INVALID_CREDENTIALS");
        assert_eq!(error_body["message"], "Unable to log in with provided credentials.");
    }

    #[tokio::test]
    async fn test_login_unknown_email_fails_the_same_way() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let login_request = LoginRequest {
            email: "nobody@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
        };

        let response = server.post("/api/login").json(&login_request).await;

        // An unknown email is indistinguishable from a wrong password
        response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "INVALID_CREDENTIALS");
        assert_eq!(error_body["message"], "Unable to log in with provided credentials.");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // No Authorization header at all
        let response = server.get("/api/settings").await;

        // Verify response
        response.assert_status(StatusCode::UNAUTHORIZED);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "NOT_AUTHENTICATED");
        assert_eq!(error_body["message"], "Authentication credentials were not provided.");
    }

    #[tokio::test]
    async fn test_protected_route_rejects_garbage_token() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server
            .get("/api/settings")
            .add_header(header::AUTHORIZATION, bearer("garbage"))
            .await;

        // Verify response
        response.assert_status(StatusCode::UNAUTHORIZED);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "INVALID_TOKEN");
        assert_eq!(error_body["message"], "Given token not valid for any token type");
    }

    #[tokio::test]
    async fn test_refresh_rotates_the_cookie() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let login_request = LoginRequest {
            email: "alice@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
        };
        let login_response = server.post("/api/login").json(&login_request).await;
        login_response.assert_status(StatusCode::OK);
        let first_cookie = login_response.cookie(REFRESH_COOKIE);

        // Redeem the refresh cookie for a new pair
        let refresh_response = server
            .post("/api/refresh")
            .add_cookie(first_cookie.clone())
            .await;
        refresh_response.assert_status(StatusCode::OK);
        let refresh_body: serde_json::Value = refresh_response.json();
        assert_eq!(refresh_body["response"], "OK");
        assert!(!refresh_body["access_token"].as_str().unwrap().is_empty());

        let second_cookie = refresh_response.cookie(REFRESH_COOKIE);
        assert_ne!(first_cookie.value(), second_cookie.value());

        // The redeemed token is dead; replaying it is rejected
        let replay_response = server.post("/api/refresh").add_cookie(first_cookie).await;
        replay_response.assert_status(StatusCode::UNAUTHORIZED);
        let error_body: serde_json::Value = replay_response.json();
        assert_eq!(error_body["error"], "INVALID_TOKEN");
        assert_eq!(error_body["message"], "Token is invalid or expired");

        // The rotated token still works
        let rotated_response = server.post("/api/refresh").add_cookie(second_cookie).await;
        rotated_response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_refresh_without_cookie() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.post("/api/refresh").await;

        // Verify response
        response.assert_status(StatusCode::UNAUTHORIZED);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "INVALID_TOKEN");
        assert_eq!(error_body["message"], "Token is invalid or expired");
    }

    #[tokio::test]
    async fn test_logout_revokes_the_refresh_token() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let login_request = LoginRequest {
            email: "alice@example.com".to_string(),
            password: TEST_PASSWORD.to_string(),
        };
        let login_response = server.post("/api/login").json(&login_request).await;
        login_response.assert_status(StatusCode::OK);
        let login_body: serde_json::Value = login_response.json();
        let access_token = login_body["access_token"].as_str().unwrap().to_string();
        let cookie = login_response.cookie(REFRESH_COOKIE);

        // Send POST request to logout
        let logout_response = server
            .post("/api/logout")
            .add_header(header::AUTHORIZATION, bearer(&access_token))
            .add_cookie(cookie.clone())
            .await;
        logout_response.assert_status(StatusCode::OK);
        let logout_body: serde_json::Value = logout_response.json();
        assert_eq!(logout_body["detail"], "User logged out successfully.");

        // The revoked refresh token can no longer be redeemed
        let replay_response = server.post("/api/refresh").add_cookie(cookie).await;
        replay_response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_get_users() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // Get all users
        let response = server.get("/api/users").await;

        // Verify response, both seeded accounts are present
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<serde_json::Value>> = response.json();
        assert!(body.success);
        assert_eq!(body.message, "Users retrieved successfully");
        assert!(body.data.len() >= 2);

        let alice = body.data.iter().find(|u| u["email"] == "alice@example.com").unwrap();
        assert_eq!(alice["first_name"], "Alice");
        assert_eq!(alice["full_name"], "Alice Market");
        assert_eq!(alice["is_staff"], false);
        assert!(alice.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_get_user_by_id() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let user_id = user_id_by_email(&server, "staff@example.com").await;

        // Get user by ID
        let response = server.get(&format!("/api/users/{}", user_id)).await;

        // Verify response
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert!(body.success);
        assert_eq!(body.message, "User retrieved successfully");
        assert_eq!(body.data["email"], "staff@example.com");
        assert_eq!(body.data["is_staff"], true);
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // Try to get non-existent user
        let response = server.get("/api/users/99999").await;

        // Verify response
        response.assert_status(StatusCode::NOT_FOUND);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "USER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_settings_default_to_light_mode() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = register_and_login(&server, "fresh@example.com").await;

        let response = server
            .get("/api/settings")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;

        // Verify response
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert!(body.success);
        assert_eq!(body.message, "Settings retrieved successfully");
        assert_eq!(body.data["dark_mode"], false);
    }

    #[tokio::test]
    async fn test_update_settings_does_not_affect_other_users() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        // Both accounts start on the shared default settings row
        let alice_token = login_token(&server, "alice@example.com").await;
        let staff_token = login_token(&server, "staff@example.com").await;

        let update_request = UpdateSettingsRequest { dark_mode: true };
        let update_response = server
            .put("/api/settings")
            .add_header(header::AUTHORIZATION, bearer(&alice_token))
            .json(&update_request)
            .await;

        // Verify response
        update_response.assert_status(StatusCode::OK);
        let update_body: ApiResponse<serde_json::Value> = update_response.json();
        assert_eq!(update_body.message, "Settings updated successfully");
        assert_eq!(update_body.data["dark_mode"], true);

        // Alice sees her change
        let alice_response = server
            .get("/api/settings")
            .add_header(header::AUTHORIZATION, bearer(&alice_token))
            .await;
        alice_response.assert_status(StatusCode::OK);
        let alice_body: ApiResponse<serde_json::Value> = alice_response.json();
        assert_eq!(alice_body.data["dark_mode"], true);

        // The other account still reads the untouched default
        let staff_response = server
            .get("/api/settings")
            .add_header(header::AUTHORIZATION, bearer(&staff_token))
            .await;
        staff_response.assert_status(StatusCode::OK);
        let staff_body: ApiResponse<serde_json::Value> = staff_response.json();
        assert_eq!(staff_body.data["dark_mode"], false);
    }

    #[tokio::test]
    async fn test_address_crud() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = login_token(&server, "alice@example.com").await;

        // Create address
        let create_request = CreateAddressRequest {
            street: "1 Main Street".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
        };
        let create_response = server
            .post("/api/addresses")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&create_request)
            .await;
        create_response.assert_status(StatusCode::CREATED);
        let create_body: ApiResponse<serde_json::Value> = create_response.json();
        assert_eq!(create_body.message, "Address created successfully");
        assert_eq!(create_body.data["street"], "1 Main Street");
        let address_id = create_body.data["id"].as_i64().unwrap();

        // List addresses
        let list_response = server
            .get("/api/addresses")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        list_response.assert_status(StatusCode::OK);
        let list_body: ApiResponse<Vec<serde_json::Value>> = list_response.json();
        assert_eq!(list_body.data.len(), 1);

        // Update the city
        let update_request = UpdateAddressRequest {
            street: None,
            city: Some("Shelbyville".to_string()),
            state: None,
            zip_code: None,
        };
        let update_response = server
            .put(&format!("/api/addresses/{}", address_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&update_request)
            .await;
        update_response.assert_status(StatusCode::OK);
        let update_body: ApiResponse<serde_json::Value> = update_response.json();
        assert_eq!(update_body.data["city"], "Shelbyville");
        assert_eq!(update_body.data["street"], "1 Main Street");

        // Delete address
        let delete_response = server
            .delete(&format!("/api/addresses/{}", address_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        delete_response.assert_status(StatusCode::NO_CONTENT);

        // Verify address is actually deleted
        let get_response = server
            .get(&format!("/api/addresses/{}", address_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        get_response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_address_of_another_user_is_not_reachable() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let alice_token = login_token(&server, "alice@example.com").await;
        let bob_token = register_and_login(&server, "bob@example.com").await;

        let create_request = CreateAddressRequest {
            street: "1 Main Street".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
        };
        let create_response = server
            .post("/api/addresses")
            .add_header(header::AUTHORIZATION, bearer(&alice_token))
            .json(&create_request)
            .await;
        create_response.assert_status(StatusCode::CREATED);
        let create_body: ApiResponse<serde_json::Value> = create_response.json();
        let address_id = create_body.data["id"].as_i64().unwrap();

        // Reads are scoped to the owner, the row looks absent
        let get_response = server
            .get(&format!("/api/addresses/{}", address_id))
            .add_header(header::AUTHORIZATION, bearer(&bob_token))
            .await;
        get_response.assert_status(StatusCode::NOT_FOUND);

        // Mutations are denied outright
        let update_request = UpdateAddressRequest {
            street: Some("Hijacked".to_string()),
            city: None,
            state: None,
            zip_code: None,
        };
        let update_response = server
            .put(&format!("/api/addresses/{}", address_id))
            .add_header(header::AUTHORIZATION, bearer(&bob_token))
            .json(&update_request)
            .await;
        update_response.assert_status(StatusCode::FORBIDDEN);
        let error_body: serde_json::Value = update_response.json();
        assert_eq!(error_body["error"], "NOT_OWNER");
    }

    #[tokio::test]
    async fn test_create_category_requires_authentication() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let create_request = CreateCategoryRequest {
            name: "Electronics".to_string(),
            description: None,
        };

        let response = server.post("/api/categories").json(&create_request).await;

        // Verify response
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_category_crud() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = login_token(&server, "alice@example.com").await;

        // Create category
        let create_request = CreateCategoryRequest {
            name: "Electronics".to_string(),
            description: Some("Phones, laptops and parts".to_string()),
        };
        let create_response = server
            .post("/api/categories")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&create_request)
            .await;
        create_response.assert_status(StatusCode::CREATED);
        let create_body: ApiResponse<serde_json::Value> = create_response.json();
        assert_eq!(create_body.message, "Category created successfully");
        assert_eq!(create_body.data["name"], "Electronics");
        let category_id = create_body.data["id"].as_i64().unwrap();

        // The listing is public
        let list_response = server.get("/api/categories").await;
        list_response.assert_status(StatusCode::OK);
        let list_body: ApiResponse<Vec<serde_json::Value>> = list_response.json();
        assert_eq!(list_body.data.len(), 1);

        // Rename it
        let update_request = UpdateCategoryRequest {
            name: Some("Gadgets".to_string()),
            description: None,
        };
        let update_response = server
            .put(&format!("/api/categories/{}", category_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&update_request)
            .await;
        update_response.assert_status(StatusCode::OK);
        let update_body: ApiResponse<serde_json::Value> = update_response.json();
        assert_eq!(update_body.data["name"], "Gadgets");

        // Delete category
        let delete_response = server
            .delete(&format!("/api/categories/{}", category_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        delete_response.assert_status(StatusCode::NO_CONTENT);

        let get_response = server.get(&format!("/api/categories/{}", category_id)).await;
        get_response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_category_duplicate_name() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = login_token(&server, "alice@example.com").await;

        let create_request = CreateCategoryRequest {
            name: "Books".to_string(),
            description: None,
        };

        let response1 = server
            .post("/api/categories")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&create_request)
            .await;
        response1.assert_status(StatusCode::CREATED);

        // Try to create category with the same name
        let response2 = server
            .post("/api/categories")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&create_request)
            .await;

        // Verify response
        response2.assert_status(StatusCode::CONFLICT);
        let error_body: serde_json::Value = response2.json();
        assert_eq!(error_body["error"], "DUPLICATE_CATEGORY");
        assert_eq!(error_body["message"], "Category with this name already exists");
    }

    #[tokio::test]
    async fn test_create_listing() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = login_token(&server, "alice@example.com").await;
        let alice_id = user_id_by_email(&server, "alice@example.com").await;

        let create_request = CreateListingRequest {
            title: "Mechanical keyboard".to_string(),
            description: "Lightly used, brown switches".to_string(),
            image: None,
            price: "49.99".parse().unwrap(),
            quantity: 3,
            category_id: None,
            active: None,
        };

        // Send POST request to create listing
        let response = server
            .post("/api/listings")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&create_request)
            .await;

        // Verify response
        if response.status_code() != StatusCode::CREATED {
            let error_body = response.text();
            println!("Error response: {}", error_body);
            panic!("Expected 201 Created, got {}", response.status_code());
        }
        let body: ApiResponse<serde_json::Value> = response.json();
        assert!(body.success);
        assert_eq!(body.message, "Listing created successfully");
        assert_eq!(body.data["title"], "Mechanical keyboard");
        assert_eq!(body.data["price"], "49.99");
        assert_eq!(body.data["quantity"], 3);
        assert_eq!(body.data["active"], true);
        assert_eq!(body.data["out_of_stock"], false);
        assert_eq!(body.data["owner_id"], alice_id);
    }

    #[tokio::test]
    async fn test_create_listing_negative_price_writes_nothing() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = login_token(&server, "alice@example.com").await;

        let create_request = CreateListingRequest {
            title: "Bad offer".to_string(),
            description: "Priced below zero".to_string(),
            image: None,
            price: "-100.00".parse().unwrap(),
            quantity: 1,
            category_id: None,
            active: None,
        };

        let response = server
            .post("/api/listings")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&create_request)
            .await;

        // Verify response
        response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "PRICE_NEGATIVE");

        // Nothing was persisted
        let list_response = server.get("/api/listings").await;
        list_response.assert_status(StatusCode::OK);
        let list_body: ApiResponse<Vec<serde_json::Value>> = list_response.json();
        assert_eq!(list_body.data.len(), 0);
    }

    #[tokio::test]
    async fn test_create_listing_with_unknown_category() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = login_token(&server, "alice@example.com").await;

        let create_request = CreateListingRequest {
            title: "Orphaned".to_string(),
            description: "Points at a category that does not exist".to_string(),
            image: None,
            price: "10.00".parse().unwrap(),
            quantity: 1,
            category_id: Some(999),
            active: None,
        };

        let response = server
            .post("/api/listings")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&create_request)
            .await;

        // Verify response
        response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "INVALID_CATEGORY_ID");
        assert_eq!(error_body["message"], "Category with ID 999 does not exist");
    }

    #[tokio::test]
    async fn test_listing_stock_drives_the_active_flag() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = login_token(&server, "alice@example.com").await;
        let listing_id = create_listing_with(&server, &token, "Desk lamp", "15.00", 2).await;

        // Selling out flips the listing inactive
        let sell_out = UpdateListingRequest {
            title: None,
            description: None,
            image: None,
            price: None,
            quantity: Some(0),
            category_id: None,
            active: None,
        };
        let sold_out_response = server
            .patch(&format!("/api/listings/{}", listing_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&sell_out)
            .await;
        sold_out_response.assert_status(StatusCode::OK);
        let sold_out_body: ApiResponse<serde_json::Value> = sold_out_response.json();
        assert_eq!(sold_out_body.data["quantity"], 0);
        assert_eq!(sold_out_body.data["active"], false);
        assert_eq!(sold_out_body.data["out_of_stock"], true);

        // Restocking brings it back
        let restock = UpdateListingRequest {
            title: None,
            description: None,
            image: None,
            price: None,
            quantity: Some(5),
            category_id: None,
            active: None,
        };
        let restock_response = server
            .patch(&format!("/api/listings/{}", listing_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&restock)
            .await;
        restock_response.assert_status(StatusCode::OK);
        let restock_body: ApiResponse<serde_json::Value> = restock_response.json();
        assert_eq!(restock_body.data["quantity"], 5);
        assert_eq!(restock_body.data["active"], true);
        assert_eq!(restock_body.data["out_of_stock"], false);
    }

    #[tokio::test]
    async fn test_delete_listing() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = login_token(&server, "alice@example.com").await;
        let listing_id = create_listing_with(&server, &token, "Going away", "5.00", 1).await;

        // Delete listing
        let delete_response = server
            .delete(&format!("/api/listings/{}", listing_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        delete_response.assert_status(StatusCode::NO_CONTENT);

        // Verify listing is actually deleted
        let get_response = server.get(&format!("/api/listings/{}", listing_id)).await;
        get_response.assert_status(StatusCode::NOT_FOUND);
        let error_body: serde_json::Value = get_response.json();
        assert_eq!(error_body["error"], "LISTING_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_favorite_lifecycle() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Poster", "12.00", 4).await;

        // Favorite the listing
        let create_request = CreateFavoriteRequest { listing_id: listing_id as i32 };
        let create_response = server
            .post("/api/favorites")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&create_request)
            .await;
        create_response.assert_status(StatusCode::CREATED);
        let create_body: ApiResponse<serde_json::Value> = create_response.json();
        assert_eq!(create_body.message, "Favorite created successfully");
        let favorite_id = create_body.data["id"].as_i64().unwrap();

        // Favoriting it again conflicts
        let duplicate_response = server
            .post("/api/favorites")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&create_request)
            .await;
        duplicate_response.assert_status(StatusCode::CONFLICT);
        let error_body: serde_json::Value = duplicate_response.json();
        assert_eq!(error_body["error"], "DUPLICATE_FAVORITE");

        // List favorites
        let list_response = server
            .get("/api/favorites")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .await;
        list_response.assert_status(StatusCode::OK);
        let list_body: ApiResponse<Vec<serde_json::Value>> = list_response.json();
        assert_eq!(list_body.data.len(), 1);

        // Remove the favorite
        let delete_response = server
            .delete(&format!("/api/favorites/{}", favorite_id))
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .await;
        delete_response.assert_status(StatusCode::NO_CONTENT);

        let empty_response = server
            .get("/api/favorites")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .await;
        let empty_body: ApiResponse<Vec<serde_json::Value>> = empty_response.json();
        assert_eq!(empty_body.data.len(), 0);
    }

    #[tokio::test]
    async fn test_favorite_unknown_listing() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = login_token(&server, "alice@example.com").await;

        let create_request = CreateFavoriteRequest { listing_id: 999 };
        let response = server
            .post("/api/favorites")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&create_request)
            .await;

        // Verify response
        response.assert_status(StatusCode::NOT_FOUND);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "LISTING_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_another_users_favorite() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let alice_token = login_token(&server, "alice@example.com").await;
        let bob_token = register_and_login(&server, "bob@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Poster", "12.00", 4).await;

        let create_request = CreateFavoriteRequest { listing_id: listing_id as i32 };
        let create_response = server
            .post("/api/favorites")
            .add_header(header::AUTHORIZATION, bearer(&alice_token))
            .json(&create_request)
            .await;
        create_response.assert_status(StatusCode::CREATED);
        let create_body: ApiResponse<serde_json::Value> = create_response.json();
        let favorite_id = create_body.data["id"].as_i64().unwrap();

        // Bob cannot remove Alice's favorite
        let delete_response = server
            .delete(&format!("/api/favorites/{}", favorite_id))
            .add_header(header::AUTHORIZATION, bearer(&bob_token))
            .await;
        delete_response.assert_status(StatusCode::FORBIDDEN);
        let error_body: serde_json::Value = delete_response.json();
        assert_eq!(error_body["error"], "NOT_OWNER");
    }

    #[tokio::test]
    async fn test_review_own_listing_is_denied() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = login_token(&server, "alice@example.com").await;
        let listing_id = create_listing_with(&server, &token, "My own wares", "20.00", 1).await;

        let submit_request = SubmitReviewRequest {
            listing_id: listing_id as i32,
            rating: 5,
            comment: "Would sell again".to_string(),
        };
        let response = server
            .post("/api/reviews")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&submit_request)
            .await;

        // Verify response
        response.assert_status(StatusCode::FORBIDDEN);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "OWN_LISTING_REVIEW");
        assert_eq!(error_body["message"], "You cannot review your own listing.");
    }

    #[tokio::test]
    async fn test_resubmitting_a_review_updates_it() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Headphones", "80.00", 2).await;

        // First submission creates the review
        let first_request = SubmitReviewRequest {
            listing_id: listing_id as i32,
            rating: 4,
            comment: "Pretty good".to_string(),
        };
        let first_response = server
            .post("/api/reviews")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&first_request)
            .await;
        first_response.assert_status(StatusCode::CREATED);
        let first_body: ApiResponse<serde_json::Value> = first_response.json();
        assert_eq!(first_body.message, "Review created successfully");
        let review_id = first_body.data["id"].as_i64().unwrap();

        // Second submission updates it in place
        let second_request = SubmitReviewRequest {
            listing_id: listing_id as i32,
            rating: 2,
            comment: "Broke after a week".to_string(),
        };
        let second_response = server
            .post("/api/reviews")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&second_request)
            .await;
        second_response.assert_status(StatusCode::OK);
        let second_body: ApiResponse<serde_json::Value> = second_response.json();
        assert_eq!(second_body.message, "Review updated successfully");
        assert_eq!(second_body.data["id"], review_id);
        assert_eq!(second_body.data["rating"], 2);

        // Still a single review for the listing
        let list_response = server.get("/api/reviews").await;
        list_response.assert_status(StatusCode::OK);
        let list_body: ApiResponse<Vec<serde_json::Value>> = list_response.json();
        assert_eq!(list_body.data.len(), 1);
        assert_eq!(list_body.data[0]["comment"], "Broke after a week");
    }

    #[tokio::test]
    async fn test_review_rating_out_of_range() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Headphones", "80.00", 2).await;

        let submit_request = SubmitReviewRequest {
            listing_id: listing_id as i32,
            rating: 6,
            comment: "Too enthusiastic".to_string(),
        };
        let response = server
            .post("/api/reviews")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&submit_request)
            .await;

        // Verify response
        response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "INVALID_RATING");
        assert_eq!(error_body["message"], "Rating must be between 1 and 5");
    }

    #[tokio::test]
    async fn test_review_edits_are_author_only() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let author_token = login_token(&server, "alice@example.com").await;
        let outsider_token = register_and_login(&server, "carol@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Headphones", "80.00", 2).await;

        let submit_request = SubmitReviewRequest {
            listing_id: listing_id as i32,
            rating: 4,
            comment: "Pretty good".to_string(),
        };
        let submit_response = server
            .post("/api/reviews")
            .add_header(header::AUTHORIZATION, bearer(&author_token))
            .json(&submit_request)
            .await;
        submit_response.assert_status(StatusCode::CREATED);
        let submit_body: ApiResponse<serde_json::Value> = submit_response.json();
        let review_id = submit_body.data["id"].as_i64().unwrap();

        // A third user can neither edit nor delete it
        let update_request = UpdateReviewRequest {
            rating: 1,
            comment: "Vandalism".to_string(),
        };
        let update_response = server
            .put(&format!("/api/reviews/{}", review_id))
            .add_header(header::AUTHORIZATION, bearer(&outsider_token))
            .json(&update_request)
            .await;
        update_response.assert_status(StatusCode::FORBIDDEN);
        let error_body: serde_json::Value = update_response.json();
        assert_eq!(error_body["error"], "NOT_OWNER");

        let delete_response = server
            .delete(&format!("/api/reviews/{}", review_id))
            .add_header(header::AUTHORIZATION, bearer(&outsider_token))
            .await;
        delete_response.assert_status(StatusCode::FORBIDDEN);

        // The author can delete it
        let author_delete = server
            .delete(&format!("/api/reviews/{}", review_id))
            .add_header(header::AUTHORIZATION, bearer(&author_token))
            .await;
        author_delete.assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_cart_is_provisioned_at_registration() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = register_and_login(&server, "fresh@example.com").await;

        // The cart exists without ever being created explicitly
        let response = server
            .get("/api/cart")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;

        // Verify response
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<serde_json::Value> = response.json();
        assert!(body.success);
        assert_eq!(body.message, "Cart retrieved successfully");
        assert_eq!(body.data["items"].as_array().unwrap().len(), 0);
        assert_eq!(body.data["total"], "0");
    }

    #[tokio::test]
    async fn test_create_cart_conflicts_with_the_provisioned_one() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = login_token(&server, "alice@example.com").await;

        let response = server
            .post("/api/cart")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;

        // Verify response
        response.assert_status(StatusCode::CONFLICT);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "DUPLICATE_CART");
        assert_eq!(error_body["message"], "User already has a cart");
    }

    #[tokio::test]
    async fn test_cart_delete_is_always_denied() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let token = login_token(&server, "alice@example.com").await;

        let cart_response = server
            .get("/api/cart")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        cart_response.assert_status(StatusCode::OK);
        let cart_body: ApiResponse<serde_json::Value> = cart_response.json();
        let cart_id = cart_body.data["id"].as_i64().unwrap();

        // Even the owner cannot delete their cart
        let delete_response = server
            .delete(&format!("/api/cart/{}", cart_id))
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        delete_response.assert_status(StatusCode::FORBIDDEN);
        let error_body: serde_json::Value = delete_response.json();
        assert_eq!(error_body["error"], "CART_DELETE_FORBIDDEN");

        // The cart is untouched
        let still_there = server
            .get("/api/cart")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        still_there.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cart_of_another_user_is_not_readable() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let alice_token = login_token(&server, "alice@example.com").await;
        let bob_token = register_and_login(&server, "bob@example.com").await;

        let cart_response = server
            .get("/api/cart")
            .add_header(header::AUTHORIZATION, bearer(&alice_token))
            .await;
        cart_response.assert_status(StatusCode::OK);
        let cart_body: ApiResponse<serde_json::Value> = cart_response.json();
        let alice_cart_id = cart_body.data["id"].as_i64().unwrap();

        let response = server
            .get(&format!("/api/cart/{}", alice_cart_id))
            .add_header(header::AUTHORIZATION, bearer(&bob_token))
            .await;

        // Verify response
        response.assert_status(StatusCode::FORBIDDEN);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "CART_NOT_OWNED");
        assert_eq!(error_body["message"], "Cart does not belong to the user");
    }

    #[tokio::test]
    async fn test_add_cart_item_and_total() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Monitor", "250.00", 10).await;

        // Add two units to the cart
        let add_request = AddCartItemRequest {
            listing_id: listing_id as i32,
            quantity: 2,
        };
        let add_response = server
            .post("/api/cart-item")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&add_request)
            .await;

        if add_response.status_code() != StatusCode::CREATED {
            let error_body = add_response.text();
            println!("Error response: {}", error_body);
            panic!("Expected 201 Created, got {}", add_response.status_code());
        }
        let add_body: ApiResponse<serde_json::Value> = add_response.json();
        assert_eq!(add_body.message, "Item added to cart successfully");
        assert_eq!(add_body.data["quantity"], 2);

        // The cart body carries the items and the priced total
        let cart_response = server
            .get("/api/cart")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .await;
        cart_response.assert_status(StatusCode::OK);
        let cart_body: ApiResponse<serde_json::Value> = cart_response.json();
        let items = cart_body.data["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["listing_id"], listing_id);
        assert_eq!(cart_body.data["total"], "500.00");
    }

    #[tokio::test]
    async fn test_add_cart_item_rejects_inactive_listing() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;

        // A listing created with zero stock starts out inactive
        let listing_id =
            create_listing_with(&server, &seller_token, "Sold out", "99.00", 0).await;

        let add_request = AddCartItemRequest {
            listing_id: listing_id as i32,
            quantity: 1,
        };
        let response = server
            .post("/api/cart-item")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&add_request)
            .await;

        // Verify response
        response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "LISTING_INACTIVE");
        assert_eq!(error_body["message"], "Listing is not active");
    }

    #[tokio::test]
    async fn test_add_cart_item_twice_conflicts() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Monitor", "250.00", 10).await;

        let add_request = AddCartItemRequest {
            listing_id: listing_id as i32,
            quantity: 1,
        };
        let first_response = server
            .post("/api/cart-item")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&add_request)
            .await;
        first_response.assert_status(StatusCode::CREATED);

        // The same listing cannot be added twice, the quantity is updated instead
        let second_response = server
            .post("/api/cart-item")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&add_request)
            .await;
        second_response.assert_status(StatusCode::CONFLICT);
        let error_body: serde_json::Value = second_response.json();
        assert_eq!(error_body["error"], "DUPLICATE_CART_ITEM");
        assert_eq!(error_body["message"], "Item already exists in cart");
    }

    #[tokio::test]
    async fn test_cart_item_quantity_bounds() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Monitor", "250.00", 10).await;

        // More than the available stock
        let too_many = AddCartItemRequest {
            listing_id: listing_id as i32,
            quantity: 20,
        };
        let too_many_response = server
            .post("/api/cart-item")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&too_many)
            .await;
        too_many_response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = too_many_response.json();
        assert_eq!(error_body["error"], "QUANTITY_OUT_OF_RANGE");
        assert_eq!(error_body["message"], "Quantity is greater than the available quantity");

        // Less than one
        let too_few = AddCartItemRequest {
            listing_id: listing_id as i32,
            quantity: 0,
        };
        let too_few_response = server
            .post("/api/cart-item")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&too_few)
            .await;
        too_few_response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = too_few_response.json();
        assert_eq!(error_body["error"], "QUANTITY_OUT_OF_RANGE");
        assert_eq!(error_body["message"], "Quantity cannot be less than 1");
    }

    #[tokio::test]
    async fn test_update_cart_item_quantity() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Monitor", "250.00", 10).await;

        let add_request = AddCartItemRequest {
            listing_id: listing_id as i32,
            quantity: 1,
        };
        let add_response = server
            .post("/api/cart-item")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&add_request)
            .await;
        add_response.assert_status(StatusCode::CREATED);
        let add_body: ApiResponse<serde_json::Value> = add_response.json();
        let item_id = add_body.data["id"].as_i64().unwrap();

        // Raise the quantity
        let update_request = UpdateCartItemRequest { quantity: 5 };
        let update_response = server
            .put(&format!("/api/cart-item/{}", item_id))
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&update_request)
            .await;
        update_response.assert_status(StatusCode::OK);
        let update_body: ApiResponse<serde_json::Value> = update_response.json();
        assert_eq!(update_body.data["quantity"], 5);

        // Zero is out of range
        let zero_request = UpdateCartItemRequest { quantity: 0 };
        let zero_response = server
            .put(&format!("/api/cart-item/{}", item_id))
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&zero_request)
            .await;
        zero_response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = zero_response.json();
        assert_eq!(error_body["error"], "QUANTITY_OUT_OF_RANGE");
    }

    #[tokio::test]
    async fn test_remove_cart_item() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Monitor", "250.00", 10).await;

        let add_request = AddCartItemRequest {
            listing_id: listing_id as i32,
            quantity: 2,
        };
        let add_response = server
            .post("/api/cart-item")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&add_request)
            .await;
        add_response.assert_status(StatusCode::CREATED);
        let add_body: ApiResponse<serde_json::Value> = add_response.json();
        let item_id = add_body.data["id"].as_i64().unwrap();

        // Remove the item
        let delete_response = server
            .delete(&format!("/api/cart-item/{}", item_id))
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .await;
        delete_response.assert_status(StatusCode::NO_CONTENT);

        // The cart is empty again
        let list_response = server
            .get("/api/cart-item")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .await;
        list_response.assert_status(StatusCode::OK);
        let list_body: ApiResponse<Vec<serde_json::Value>> = list_response.json();
        assert_eq!(list_body.data.len(), 0);
    }

    #[tokio::test]
    async fn test_cart_items_of_another_user_are_protected() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;
        let bob_token = register_and_login(&server, "bob@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Monitor", "250.00", 10).await;

        let add_request = AddCartItemRequest {
            listing_id: listing_id as i32,
            quantity: 1,
        };
        let add_response = server
            .post("/api/cart-item")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&add_request)
            .await;
        add_response.assert_status(StatusCode::CREATED);
        let add_body: ApiResponse<serde_json::Value> = add_response.json();
        let item_id = add_body.data["id"].as_i64().unwrap();

        // Another user cannot read or remove it
        let get_response = server
            .get(&format!("/api/cart-item/{}", item_id))
            .add_header(header::AUTHORIZATION, bearer(&bob_token))
            .await;
        get_response.assert_status(StatusCode::FORBIDDEN);
        let error_body: serde_json::Value = get_response.json();
        assert_eq!(error_body["error"], "CART_NOT_OWNED");

        let delete_response = server
            .delete(&format!("/api/cart-item/{}", item_id))
            .add_header(header::AUTHORIZATION, bearer(&bob_token))
            .await;
        delete_response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_transaction_derives_the_total() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;
        let seller_id = user_id_by_email(&server, "staff@example.com").await;
        let buyer_id = user_id_by_email(&server, "alice@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Monitor", "250.00", 10).await;

        let create_request = CreateTransactionRequest {
            listing_id: listing_id as i32,
            quantity: 2,
        };

        // Send POST request to record the sale
        let response = server
            .post("/api/transactions")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&create_request)
            .await;

        // Verify response
        if response.status_code() != StatusCode::CREATED {
            let error_body = response.text();
            println!("Error response: {}", error_body);
            panic!("Expected 201 Created, got {}", response.status_code());
        }
        let body: ApiResponse<serde_json::Value> = response.json();
        assert!(body.success);
        assert_eq!(body.message, "Transaction created successfully");
        assert_eq!(body.data["buyer_id"], buyer_id);
        assert_eq!(body.data["seller_id"], seller_id);
        assert_eq!(body.data["quantity"], 2);
        assert_eq!(body.data["total"], "500.00");

        // The ledger only records the sale, stock is untouched
        let listing_response = server.get(&format!("/api/listings/{}", listing_id)).await;
        listing_response.assert_status(StatusCode::OK);
        let listing_body: ApiResponse<serde_json::Value> = listing_response.json();
        assert_eq!(listing_body.data["quantity"], 10);
    }

    #[tokio::test]
    async fn test_transactions_are_visible_to_both_sides_only() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;
        let outsider_token = register_and_login(&server, "carol@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Monitor", "250.00", 10).await;

        let create_request = CreateTransactionRequest {
            listing_id: listing_id as i32,
            quantity: 1,
        };
        let create_response = server
            .post("/api/transactions")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&create_request)
            .await;
        create_response.assert_status(StatusCode::CREATED);
        let create_body: ApiResponse<serde_json::Value> = create_response.json();
        let transaction_id = create_body.data["id"].as_i64().unwrap();

        // Buyer and seller both see the sale in their listings
        for token in [&buyer_token, &seller_token] {
            let list_response = server
                .get("/api/transactions")
                .add_header(header::AUTHORIZATION, bearer(token))
                .await;
            list_response.assert_status(StatusCode::OK);
            let list_body: ApiResponse<Vec<serde_json::Value>> = list_response.json();
            assert_eq!(list_body.data.len(), 1);
        }

        // An uninvolved user sees nothing, not even by id
        let outsider_list = server
            .get("/api/transactions")
            .add_header(header::AUTHORIZATION, bearer(&outsider_token))
            .await;
        outsider_list.assert_status(StatusCode::OK);
        let outsider_body: ApiResponse<Vec<serde_json::Value>> = outsider_list.json();
        assert_eq!(outsider_body.data.len(), 0);

        let outsider_get = server
            .get(&format!("/api/transactions/{}", transaction_id))
            .add_header(header::AUTHORIZATION, bearer(&outsider_token))
            .await;
        outsider_get.assert_status(StatusCode::NOT_FOUND);
        let error_body: serde_json::Value = outsider_get.json();
        assert_eq!(error_body["error"], "TRANSACTION_NOT_FOUND");

        // The buyer can fetch it by id
        let buyer_get = server
            .get(&format!("/api/transactions/{}", transaction_id))
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .await;
        buyer_get.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_transaction_quantity_must_be_positive() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let seller_token = login_token(&server, "staff@example.com").await;
        let buyer_token = login_token(&server, "alice@example.com").await;
        let listing_id =
            create_listing_with(&server, &seller_token, "Monitor", "250.00", 10).await;

        let create_request = CreateTransactionRequest {
            listing_id: listing_id as i32,
            quantity: 0,
        };
        let response = server
            .post("/api/transactions")
            .add_header(header::AUTHORIZATION, bearer(&buyer_token))
            .json(&create_request)
            .await;

        // Verify response
        response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "QUANTITY_OUT_OF_RANGE");
        assert_eq!(error_body["message"], "Quantity cannot be less than 1");
    }

    #[tokio::test]
    async fn test_coupon_mutations_are_staff_only() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let alice_token = login_token(&server, "alice@example.com").await;
        let staff_token = login_token(&server, "staff@example.com").await;

        let create_request = CreateCouponRequest {
            code: "WELCOME10".to_string(),
            discount: "10.00".parse().unwrap(),
            active: None,
        };

        // A regular user is turned away
        let denied_response = server
            .post("/api/coupons")
            .add_header(header::AUTHORIZATION, bearer(&alice_token))
            .json(&create_request)
            .await;
        denied_response.assert_status(StatusCode::FORBIDDEN);
        let error_body: serde_json::Value = denied_response.json();
        assert_eq!(error_body["error"], "STAFF_ONLY");

        // Staff can create the coupon
        let created_response = server
            .post("/api/coupons")
            .add_header(header::AUTHORIZATION, bearer(&staff_token))
            .json(&create_request)
            .await;
        created_response.assert_status(StatusCode::CREATED);
        let created_body: ApiResponse<serde_json::Value> = created_response.json();
        assert_eq!(created_body.message, "Coupon created successfully");
        assert_eq!(created_body.data["code"], "WELCOME10");
        assert_eq!(created_body.data["discount"], "10.00");
        assert_eq!(created_body.data["active"], true);

        // Reads stay public
        let list_response = server.get("/api/coupons").await;
        list_response.assert_status(StatusCode::OK);
        let list_body: ApiResponse<Vec<serde_json::Value>> = list_response.json();
        assert_eq!(list_body.data.len(), 1);
    }

    #[tokio::test]
    async fn test_coupon_code_is_unique() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let staff_token = login_token(&server, "staff@example.com").await;

        let create_request = CreateCouponRequest {
            code: "WELCOME10".to_string(),
            discount: "10.00".parse().unwrap(),
            active: None,
        };

        let first_response = server
            .post("/api/coupons")
            .add_header(header::AUTHORIZATION, bearer(&staff_token))
            .json(&create_request)
            .await;
        first_response.assert_status(StatusCode::CREATED);

        // Try to create coupon with the same code
        let second_response = server
            .post("/api/coupons")
            .add_header(header::AUTHORIZATION, bearer(&staff_token))
            .json(&create_request)
            .await;

        // Verify response
        second_response.assert_status(StatusCode::CONFLICT);
        let error_body: serde_json::Value = second_response.json();
        assert_eq!(error_body["error"], "DUPLICATE_COUPON");
        assert_eq!(error_body["message"], "Coupon with this code already exists");
    }

    #[tokio::test]
    async fn test_coupon_update_and_delete() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let staff_token = login_token(&server, "staff@example.com").await;

        let create_request = CreateCouponRequest {
            code: "SPRING".to_string(),
            discount: "5.00".parse().unwrap(),
            active: Some(true),
        };
        let create_response = server
            .post("/api/coupons")
            .add_header(header::AUTHORIZATION, bearer(&staff_token))
            .json(&create_request)
            .await;
        create_response.assert_status(StatusCode::CREATED);
        let create_body: ApiResponse<serde_json::Value> = create_response.json();
        let coupon_id = create_body.data["id"].as_i64().unwrap();

        // Retire the coupon
        let update_request = UpdateCouponRequest {
            code: None,
            discount: Some("7.50".parse().unwrap()),
            active: Some(false),
        };
        let update_response = server
            .put(&format!("/api/coupons/{}", coupon_id))
            .add_header(header::AUTHORIZATION, bearer(&staff_token))
            .json(&update_request)
            .await;
        update_response.assert_status(StatusCode::OK);
        let update_body: ApiResponse<serde_json::Value> = update_response.json();
        assert_eq!(update_body.data["discount"], "7.50");
        assert_eq!(update_body.data["active"], false);
        assert_eq!(update_body.data["code"], "SPRING");

        // Delete coupon
        let delete_response = server
            .delete(&format!("/api/coupons/{}", coupon_id))
            .add_header(header::AUTHORIZATION, bearer(&staff_token))
            .await;
        delete_response.assert_status(StatusCode::NO_CONTENT);

        let get_response = server.get(&format!("/api/coupons/{}", coupon_id)).await;
        get_response.assert_status(StatusCode::NOT_FOUND);
        let error_body: serde_json::Value = get_response.json();
        assert_eq!(error_body["error"], "COUPON_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_send_and_receive_messages() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let alice_token = login_token(&server, "alice@example.com").await;
        let staff_token = login_token(&server, "staff@example.com").await;
        let outsider_token = register_and_login(&server, "carol@example.com").await;
        let staff_id = user_id_by_email(&server, "staff@example.com").await;

        let send_request = SendMessageRequest {
            recipient_id: staff_id as i32,
            body: "Is the monitor still available?".to_string(),
        };

        // Send POST request to send the message
        let send_response = server
            .post("/api/messages")
            .add_header(header::AUTHORIZATION, bearer(&alice_token))
            .json(&send_request)
            .await;
        send_response.assert_status(StatusCode::CREATED);
        let send_body: ApiResponse<serde_json::Value> = send_response.json();
        assert_eq!(send_body.message, "Message sent successfully");
        assert_eq!(send_body.data["recipient_id"], staff_id);

        // Sender and recipient both see the thread
        for token in [&alice_token, &staff_token] {
            let list_response = server
                .get("/api/messages")
                .add_header(header::AUTHORIZATION, bearer(token))
                .await;
            list_response.assert_status(StatusCode::OK);
            let list_body: ApiResponse<Vec<serde_json::Value>> = list_response.json();
            assert_eq!(list_body.data.len(), 1);
            assert_eq!(list_body.data[0]["body"], "Is the monitor still available?");
        }

        // An uninvolved user sees nothing
        let outsider_response = server
            .get("/api/messages")
            .add_header(header::AUTHORIZATION, bearer(&outsider_token))
            .await;
        outsider_response.assert_status(StatusCode::OK);
        let outsider_body: ApiResponse<Vec<serde_json::Value>> = outsider_response.json();
        assert_eq!(outsider_body.data.len(), 0);
    }

    #[tokio::test]
    async fn test_message_body_cannot_be_empty() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let alice_token = login_token(&server, "alice@example.com").await;
        let staff_id = user_id_by_email(&server, "staff@example.com").await;

        let send_request = SendMessageRequest {
            recipient_id: staff_id as i32,
            body: "".to_string(),
        };
        let response = server
            .post("/api/messages")
            .add_header(header::AUTHORIZATION, bearer(&alice_token))
            .json(&send_request)
            .await;

        // Verify response
        response.assert_status(StatusCode::BAD_REQUEST);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "EMPTY_BODY");
        assert_eq!(error_body["message"], "Message body cannot be empty");
    }

    #[tokio::test]
    async fn test_message_to_unknown_recipient() {
        // Setup test server
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let alice_token = login_token(&server, "alice@example.com").await;

        let send_request = SendMessageRequest {
            recipient_id: 99999,
            body: "Hello?".to_string(),
        };
        let response = server
            .post("/api/messages")
            .add_header(header::AUTHORIZATION, bearer(&alice_token))
            .json(&send_request)
            .await;

        // Verify response
        response.assert_status(StatusCode::NOT_FOUND);
        let error_body: serde_json::Value = response.json();
        assert_eq!(error_body["error"], "USER_NOT_FOUND");
    }
}
