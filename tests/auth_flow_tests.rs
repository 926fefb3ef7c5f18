//! 认证服务集成测试（内存仓储）

use credential_service::{
    error::AppError,
    models::auth::{LoginRequest, RegisterRequest},
    repository::{InMemoryUserRepository, UserRepository},
};
use std::sync::Arc;

mod common;
use common::{create_test_app_state_with, create_test_config};

fn register_request(name: &str, email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    }
}

fn login_request(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_register_login_and_resolve_principal() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let state = create_test_app_state_with(create_test_config(), repo.clone());

    let user = state
        .auth_service
        .register(register_request("John Doe", "john@example.com", "secret123"))
        .await
        .unwrap();
    assert_eq!(user.name, "John Doe");
    assert_eq!(user.email, "john@example.com");

    // 存储的是哈希而不是明文
    let stored = repo.find_by_email("john@example.com").await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "secret123");
    assert!(stored.password_hash.starts_with("$argon2id$"));

    let issued = state
        .auth_service
        .login(login_request("john@example.com", "secret123"))
        .await
        .unwrap();
    assert_eq!(state.jwt_service.verify(&issued.token), Ok(user.id));

    let current = state.auth_service.authenticate(&issued.token).await.unwrap();
    assert_eq!(current, user);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
    let state = common::create_test_app_state();
    state
        .auth_service
        .register(register_request("John Doe", "john@example.com", "secret123"))
        .await
        .unwrap();

    let wrong_password = state
        .auth_service
        .login(login_request("john@example.com", "wrong-password"))
        .await
        .unwrap_err();
    let unknown_email = state
        .auth_service
        .login(login_request("nobody@example.com", "secret123"))
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AppError::InvalidCredentials));
    assert!(matches!(unknown_email, AppError::InvalidCredentials));
    assert_eq!(wrong_password.user_message(), unknown_email.user_message());
    assert_eq!(wrong_password.status_code(), unknown_email.status_code());
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let state = create_test_app_state_with(create_test_config(), repo.clone());

    state
        .auth_service
        .register(register_request("John Doe", "john@example.com", "secret123"))
        .await
        .unwrap();

    // 大小写和空白不同的同一邮箱也视为重复
    let err = state
        .auth_service
        .register(register_request("Johnny", "  JOHN@example.com ", "another-secret"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateCredential));

    assert_eq!(repo.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_creates_one_account() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let state = create_test_app_state_with(create_test_config(), repo.clone());

    let mut handles = Vec::new();
    for i in 0..8 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            state
                .auth_service
                .register(register_request(
                    &format!("User {}", i),
                    "race@example.com",
                    "secret123",
                ))
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::DuplicateCredential) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(repo.len().await, 1);
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    let repo = Arc::new(InMemoryUserRepository::new());
    let state = create_test_app_state_with(create_test_config(), repo.clone());

    for req in [
        register_request("", "john@example.com", "secret123"),
        register_request("John Doe", "not-an-email", "secret123"),
        register_request("John Doe", "john@example.com", ""),
        register_request("John Doe", "john@example.com", "short"),
    ] {
        let err = state.auth_service.register(req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
    }

    assert!(repo.is_empty().await);
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let state = common::create_test_app_state();
    let user = state
        .auth_service
        .register(register_request("John Doe", "John@Example.com", "secret123"))
        .await
        .unwrap();
    assert_eq!(user.email, "john@example.com");

    let issued = state
        .auth_service
        .login(login_request("JOHN@EXAMPLE.COM", "secret123"))
        .await
        .unwrap();
    assert_eq!(state.jwt_service.verify(&issued.token), Ok(user.id));
}

#[tokio::test]
async fn test_token_for_missing_user_is_unauthorized() {
    let state = common::create_test_app_state();

    // 签名合法但用户不存在
    let issued = state.jwt_service.issue(999).unwrap();
    let err = state.auth_service.authenticate(&issued.token).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));

    let err = state.auth_service.authenticate("garbage").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}
