//! Tests for the product administration service.

use std::sync::Arc;

use super::*;
use crate::domain::ports::{
    FixtureAuditLogRepository, FixtureChangeFeed, MockAuditLogRepository, MockChangeFeed,
    MockProductRepository,
};
use crate::domain::{ErrorCode, Role, UserId};
use chrono::Utc;
use rstest::rstest;
use rust_decimal::Decimal;

fn actor(role: Role) -> Actor {
    Actor {
        user_id: UserId::random(),
        role,
    }
}

fn draft(code: &str) -> ProductDraft {
    ProductDraft {
        new_code: code.to_owned(),
        name: "Antimo".to_owned(),
        ..ProductDraft::default()
    }
}

fn service(repo: MockProductRepository) -> ProductService {
    ProductService::new(
        Arc::new(repo),
        AuditTrail::new(Arc::new(FixtureAuditLogRepository)),
        Arc::new(FixtureChangeFeed),
    )
}

#[tokio::test]
async fn create_stores_audits_and_publishes() {
    let admin = actor(Role::Admin);
    let mut repo = MockProductRepository::new();
    repo.expect_insert()
        .withf(|draft, by| draft.new_code == "J006" && by.is_some())
        .times(1)
        .returning(|draft, by| {
            Ok(Product::from_draft(
                ProductId::random(),
                draft.clone(),
                by,
                Utc::now(),
            ))
        });
    let mut audit = MockAuditLogRepository::new();
    audit
        .expect_append()
        .withf(|entry| entry.action == AuditAction::Create && entry.record_id.is_some())
        .times(1)
        .return_once(|_| Ok(()));
    let mut feed = MockChangeFeed::new();
    feed.expect_publish()
        .withf(|change| change.kind == CatalogueChangeKind::Inserted)
        .times(1)
        .return_const(());

    let service = ProductService::new(
        Arc::new(repo),
        AuditTrail::new(Arc::new(audit)),
        Arc::new(feed),
    );
    let product = service
        .create(&admin, draft("  J006 "))
        .await
        .expect("created");
    assert_eq!(product.new_code(), "J006");
    assert_eq!(product.created_by, Some(admin.user_id));
}

#[tokio::test]
async fn create_maps_duplicate_code_to_conflict() {
    let mut repo = MockProductRepository::new();
    repo.expect_insert()
        .return_once(|_, _| Err(ProductRepositoryError::duplicate_code("J006")));

    let err = service(repo)
        .create(&actor(Role::Admin), draft("J006"))
        .await
        .expect_err("conflict");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn create_rejects_inverted_price_range() {
    let mut repo = MockProductRepository::new();
    repo.expect_insert().never();
    let mut value = draft("J006");
    value.wholesale_price_min = Some(Decimal::from(10));
    value.wholesale_price_max = Some(Decimal::from(5));

    let err = service(repo)
        .create(&actor(Role::Admin), value)
        .await
        .expect_err("invalid");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        err.details().and_then(|d| d["field"].as_str()),
        Some("wholesalePrice")
    );
}

#[rstest]
#[case(Role::Readonly)]
#[case(Role::Pending)]
#[tokio::test]
async fn mutations_require_admin(#[case] role: Role) {
    let mut repo = MockProductRepository::new();
    repo.expect_insert().never();
    repo.expect_update().never();
    repo.expect_delete().never();
    let service = service(repo);
    let caller = actor(role);
    let id = ProductId::random();

    let results = [
        service.create(&caller, draft("J1")).await.map(|_| ()),
        service.update(&caller, &id, draft("J1")).await.map(|_| ()),
        service.delete(&caller, &id).await,
    ];
    for result in results {
        assert_eq!(result.expect_err("forbidden").code(), ErrorCode::Forbidden);
    }
}

#[tokio::test]
async fn get_reports_missing_product() {
    let mut repo = MockProductRepository::new();
    repo.expect_find_by_id().return_once(|_| Ok(None));

    let err = service(repo)
        .get(&actor(Role::Readonly), &ProductId::random())
        .await
        .expect_err("missing");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn delete_survives_audit_failure() {
    let mut repo = MockProductRepository::new();
    repo.expect_delete().times(1).return_once(|_| Ok(()));
    let mut audit = MockAuditLogRepository::new();
    audit
        .expect_append()
        .return_once(|_| Err(crate::domain::ports::AuditLogRepositoryError::connection("down")));

    let service = ProductService::new(
        Arc::new(repo),
        AuditTrail::new(Arc::new(audit)),
        Arc::new(FixtureChangeFeed),
    );
    service
        .delete(&actor(Role::Admin), &ProductId::random())
        .await
        .expect("delete succeeds");
}

#[tokio::test]
async fn update_maps_missing_product() {
    let mut repo = MockProductRepository::new();
    repo.expect_update()
        .return_once(|id, _| Err(ProductRepositoryError::not_found(id.to_string())));

    let err = service(repo)
        .update(&actor(Role::Admin), &ProductId::random(), draft("J1"))
        .await
        .expect_err("missing");
    assert_eq!(err.code(), ErrorCode::NotFound);
}
