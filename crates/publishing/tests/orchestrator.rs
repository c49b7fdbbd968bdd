mod support;

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crosslist_auth::{AuthError, CredentialState};
use crosslist_catalog::{CatalogStore, ListingStatus};
use crosslist_core::{Marketplace, ProductId};
use crosslist_listings::PublishResult;
use crosslist_publishing::{MarketplaceRegistry, PublishError, PublishOutcome};

use support::*;

const BOTH: [Marketplace; 2] = [Marketplace::Ebay, Marketplace::Etsy];

fn retryable(code: &str) -> PublishResult {
    PublishResult::error(code, "try again later", true)
}

#[tokio::test(start_paused = true)]
async fn publishes_to_every_requested_marketplace() {
    let ebay = FakePublisher::succeeding(Marketplace::Ebay);
    let etsy = FakePublisher::succeeding(Marketplace::Etsy);
    let registry = MarketplaceRegistry::new()
        .with(adapter(FakeOAuth::new(Marketplace::Ebay), FakeMapper::new(Marketplace::Ebay), ebay.clone()))
        .with(adapter(FakeOAuth::new(Marketplace::Etsy), FakeMapper::new(Marketplace::Etsy), etsy.clone()));
    let h = Harness::new(registry);
    h.authorize(valid_credential(Marketplace::Ebay));
    h.authorize(valid_credential(Marketplace::Etsy));

    let report = h
        .orchestrator
        .publish_product(h.product_id, &BOTH, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.all_published());
    let product = h.product();
    assert_eq!(product.listing_status(Marketplace::Ebay), ListingStatus::published("ebay-1"));
    assert_eq!(product.listing_status(Marketplace::Etsy), ListingStatus::published("etsy-1"));
    assert_eq!((ebay.calls(), etsy.calls()), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn marketplaces_are_isolated_from_each_other() {
    let ebay = FakePublisher::succeeding(Marketplace::Ebay);
    let registry = MarketplaceRegistry::new()
        .with(adapter(
            FakeOAuth::new(Marketplace::Ebay),
            FakeMapper::rejecting(Marketplace::Ebay),
            ebay.clone(),
        ))
        .with(adapter(
            FakeOAuth::new(Marketplace::Etsy),
            FakeMapper::new(Marketplace::Etsy),
            FakePublisher::succeeding(Marketplace::Etsy),
        ));
    let h = Harness::new(registry);
    h.authorize(valid_credential(Marketplace::Ebay));
    h.authorize(valid_credential(Marketplace::Etsy));

    let report = h
        .orchestrator
        .publish_product(h.product_id, &BOTH, &CancellationToken::new())
        .await
        .unwrap();

    match report.outcome(Marketplace::Ebay) {
        Some(PublishOutcome::Invalid(err)) => assert!(err.has_field("title")),
        other => panic!("expected a validation failure, got {other:?}"),
    }
    assert_eq!(ebay.calls(), 0);

    let product = h.product();
    assert!(matches!(product.listing_status(Marketplace::Ebay), ListingStatus::Failed { .. }));
    assert_eq!(product.listing_status(Marketplace::Etsy), ListingStatus::published("etsy-1"));
}

#[tokio::test(start_paused = true)]
async fn rate_limiting_stops_after_max_attempts() {
    let publisher = FakePublisher::always(Marketplace::Ebay, PublishResult::RateLimited(Duration::from_secs(2)));
    let registry = MarketplaceRegistry::new().with(adapter(
        FakeOAuth::new(Marketplace::Ebay),
        FakeMapper::new(Marketplace::Ebay),
        publisher.clone(),
    ));
    let h = Harness::new(registry);
    h.authorize(valid_credential(Marketplace::Ebay));

    let started = Instant::now();
    let report = h
        .orchestrator
        .publish_product(h.product_id, &[Marketplace::Ebay], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(publisher.calls(), 3);
    assert_eq!(
        report.outcome(Marketplace::Ebay),
        Some(&PublishOutcome::RateLimited {
            retry_after: Duration::from_secs(2)
        })
    );
    // max(2s, 1s) then max(2s, 2s)
    assert!(started.elapsed() >= Duration::from_secs(4));
    assert!(matches!(
        h.product().listing_status(Marketplace::Ebay),
        ListingStatus::Failed { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn retry_after_longer_than_the_backoff_cap_is_honored() {
    let publisher = FakePublisher::scripted(
        Marketplace::Etsy,
        [PublishResult::RateLimited(Duration::from_secs(45))],
        PublishResult::Success("1455".to_string()),
    );
    let registry = MarketplaceRegistry::new().with(adapter(
        FakeOAuth::new(Marketplace::Etsy),
        FakeMapper::new(Marketplace::Etsy),
        publisher.clone(),
    ));
    let h = Harness::new(registry);
    h.authorize(valid_credential(Marketplace::Etsy));

    let started = Instant::now();
    let report = h
        .orchestrator
        .publish_product(h.product_id, &[Marketplace::Etsy], &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.all_published());
    assert_eq!(publisher.calls(), 2);
    assert!(started.elapsed() >= Duration::from_secs(45));
}

#[tokio::test(start_paused = true)]
async fn retryable_errors_are_retried_and_fatal_ones_are_not() {
    let flaky = FakePublisher::scripted(
        Marketplace::Ebay,
        [retryable("25001")],
        PublishResult::Success("110011".to_string()),
    );
    let broken = FakePublisher::always(
        Marketplace::Etsy,
        PublishResult::error("http_400", "taxonomy_id is invalid", false),
    );
    let registry = MarketplaceRegistry::new()
        .with(adapter(FakeOAuth::new(Marketplace::Ebay), FakeMapper::new(Marketplace::Ebay), flaky.clone()))
        .with(adapter(FakeOAuth::new(Marketplace::Etsy), FakeMapper::new(Marketplace::Etsy), broken.clone()));
    let h = Harness::new(registry);
    h.authorize(valid_credential(Marketplace::Ebay));
    h.authorize(valid_credential(Marketplace::Etsy));

    let report = h
        .orchestrator
        .publish_product(h.product_id, &BOTH, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(flaky.calls(), 2);
    assert_eq!(broken.calls(), 1);
    assert!(report.outcome(Marketplace::Ebay).is_some_and(PublishOutcome::is_published));
    assert_eq!(
        h.product().listing_status(Marketplace::Etsy),
        ListingStatus::failed("http_400: taxonomy_id is invalid")
    );
}

#[tokio::test(start_paused = true)]
async fn failed_republish_remembers_the_existing_listing() {
    let publisher = FakePublisher::scripted(
        Marketplace::Etsy,
        [PublishResult::Success("1455720000".to_string())],
        PublishResult::error("http_400", "listing is locked", false),
    );
    let registry = MarketplaceRegistry::new().with(adapter(
        FakeOAuth::new(Marketplace::Etsy),
        FakeMapper::new(Marketplace::Etsy),
        publisher.clone(),
    ));
    let h = Harness::new(registry);
    h.authorize(valid_credential(Marketplace::Etsy));
    let cancel = CancellationToken::new();

    h.orchestrator
        .publish_product(h.product_id, &[Marketplace::Etsy], &cancel)
        .await
        .unwrap();
    h.orchestrator
        .publish_product(h.product_id, &[Marketplace::Etsy], &cancel)
        .await
        .unwrap();

    let status = h.product().listing_status(Marketplace::Etsy);
    assert_eq!(status.label(), "failed");
    assert_eq!(status.external_id(), Some("1455720000"));
    assert_eq!(publisher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn expired_token_is_refreshed_once_before_publishing() {
    let oauth = FakeOAuth::new(Marketplace::Ebay);
    let publisher = FakePublisher::succeeding(Marketplace::Ebay);
    let registry = MarketplaceRegistry::new().with(adapter(
        oauth.clone(),
        FakeMapper::new(Marketplace::Ebay),
        publisher.clone(),
    ));
    let h = Harness::new(registry);
    h.authorize(expired_credential(Marketplace::Ebay));

    let report = h
        .orchestrator
        .publish_product(h.product_id, &[Marketplace::Ebay], &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.all_published());
    assert_eq!(oauth.refreshes(), 1);
    assert_eq!(publisher.tokens(), vec!["refreshed-1".to_string()]);
    assert_eq!(h.credentials.state(Marketplace::Ebay), CredentialState::Authorized);
}

#[tokio::test(start_paused = true)]
async fn rejected_token_forces_one_refresh_and_one_retry() {
    let oauth = FakeOAuth::new(Marketplace::Ebay);
    let publisher = FakePublisher::scripted(
        Marketplace::Ebay,
        [PublishResult::AuthRejected],
        PublishResult::Success("110011".to_string()),
    );
    let registry = MarketplaceRegistry::new().with(adapter(
        oauth.clone(),
        FakeMapper::new(Marketplace::Ebay),
        publisher.clone(),
    ));
    let h = Harness::new(registry);
    h.authorize(valid_credential(Marketplace::Ebay));

    let report = h
        .orchestrator
        .publish_product(h.product_id, &[Marketplace::Ebay], &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.all_published());
    assert_eq!(oauth.refreshes(), 1);
    assert_eq!(publisher.tokens(), vec!["access-0".to_string(), "refreshed-1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn second_rejection_is_token_rejected() {
    let oauth = FakeOAuth::new(Marketplace::Etsy);
    let publisher = FakePublisher::always(Marketplace::Etsy, PublishResult::AuthRejected);
    let registry = MarketplaceRegistry::new().with(adapter(
        oauth.clone(),
        FakeMapper::new(Marketplace::Etsy),
        publisher.clone(),
    ));
    let h = Harness::new(registry);
    h.authorize(valid_credential(Marketplace::Etsy));

    let report = h
        .orchestrator
        .publish_product(h.product_id, &[Marketplace::Etsy], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report.outcome(Marketplace::Etsy),
        Some(&PublishOutcome::Auth(AuthError::TokenRejected))
    );
    assert_eq!(publisher.calls(), 2);
    assert_eq!(oauth.refreshes(), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_credential_fails_without_calling_the_marketplace() {
    let publisher = FakePublisher::succeeding(Marketplace::Ebay);
    let registry = MarketplaceRegistry::new().with(adapter(
        FakeOAuth::new(Marketplace::Ebay),
        FakeMapper::new(Marketplace::Ebay),
        publisher.clone(),
    ));
    let h = Harness::new(registry);

    let report = h
        .orchestrator
        .publish_product(h.product_id, &[Marketplace::Ebay], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report.outcome(Marketplace::Ebay),
        Some(&PublishOutcome::Auth(AuthError::Unauthenticated))
    );
    assert_eq!(publisher.calls(), 0);
    assert!(matches!(
        h.product().listing_status(Marketplace::Ebay),
        ListingStatus::Failed { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn concurrent_publishes_share_one_refresh() {
    let oauth = FakeOAuth::slow(Marketplace::Ebay, Duration::from_secs(1));
    let publisher = FakePublisher::succeeding(Marketplace::Ebay);
    let registry = MarketplaceRegistry::new().with(adapter(
        oauth.clone(),
        FakeMapper::new(Marketplace::Ebay),
        publisher.clone(),
    ));
    let h = Harness::new(registry);
    h.authorize(expired_credential(Marketplace::Ebay));
    let other = new_product("Stoneware bowl");
    let other_id = other.id();
    h.catalog.save(other).unwrap();

    let cancel = CancellationToken::new();
    let (first, second) = tokio::join!(
        h.orchestrator.publish_product(h.product_id, &[Marketplace::Ebay], &cancel),
        h.orchestrator.publish_product(other_id, &[Marketplace::Ebay], &cancel),
    );

    assert!(first.unwrap().all_published());
    assert!(second.unwrap().all_published());
    assert_eq!(oauth.refreshes(), 1);
    assert_eq!(publisher.tokens(), vec!["refreshed-1".to_string(), "refreshed-1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn transient_refresh_failures_are_retried() {
    let oauth = FakeOAuth::failing(
        Marketplace::Ebay,
        [AuthError::Transport("connection reset".to_string())],
    );
    let registry = MarketplaceRegistry::new().with(adapter(
        oauth.clone(),
        FakeMapper::new(Marketplace::Ebay),
        FakePublisher::succeeding(Marketplace::Ebay),
    ));
    let h = Harness::new(registry);
    h.authorize(expired_credential(Marketplace::Ebay));

    let report = h
        .orchestrator
        .publish_product(h.product_id, &[Marketplace::Ebay], &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.all_published());
    assert_eq!(oauth.refreshes(), 2);
}

#[tokio::test(start_paused = true)]
async fn expired_refresh_token_revokes_the_credential() {
    let oauth = FakeOAuth::failing(Marketplace::Etsy, [AuthError::RefreshExpired]);
    let publisher = FakePublisher::succeeding(Marketplace::Etsy);
    let registry = MarketplaceRegistry::new().with(adapter(
        oauth.clone(),
        FakeMapper::new(Marketplace::Etsy),
        publisher.clone(),
    ));
    let h = Harness::new(registry);
    h.authorize(expired_credential(Marketplace::Etsy));

    let report = h
        .orchestrator
        .publish_product(h.product_id, &[Marketplace::Etsy], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report.outcome(Marketplace::Etsy),
        Some(&PublishOutcome::Auth(AuthError::RefreshExpired))
    );
    assert_eq!(oauth.refreshes(), 1);
    assert_eq!(publisher.calls(), 0);
    assert_eq!(h.credentials.state(Marketplace::Etsy), CredentialState::Revoked);
}

#[tokio::test(start_paused = true)]
async fn unregistered_marketplace_is_unsupported_and_untouched() {
    let registry = MarketplaceRegistry::new().with(adapter(
        FakeOAuth::new(Marketplace::Ebay),
        FakeMapper::new(Marketplace::Ebay),
        FakePublisher::succeeding(Marketplace::Ebay),
    ));
    let h = Harness::new(registry);
    h.authorize(valid_credential(Marketplace::Ebay));

    let report = h
        .orchestrator
        .publish_product(h.product_id, &BOTH, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.outcome(Marketplace::Etsy), Some(&PublishOutcome::Unsupported));
    assert!(report.outcome(Marketplace::Ebay).is_some_and(PublishOutcome::is_published));
    assert_eq!(h.product().listing_status(Marketplace::Etsy), ListingStatus::Unpublished);
}

#[tokio::test(start_paused = true)]
async fn cancellation_restores_the_prior_listing_status() {
    let publisher = FakePublisher::delayed(
        Marketplace::Ebay,
        [],
        PublishResult::Success("110012".to_string()),
        Duration::from_secs(60),
    );
    let registry = MarketplaceRegistry::new().with(adapter(
        FakeOAuth::new(Marketplace::Ebay),
        FakeMapper::new(Marketplace::Ebay),
        publisher.clone(),
    ));
    let h = Harness::new(registry);
    h.authorize(valid_credential(Marketplace::Ebay));
    let mut product = h.product();
    product.set_listing_status(Marketplace::Ebay, ListingStatus::published("110011"));
    h.catalog.save(product).unwrap();

    let cancel = CancellationToken::new();
    let (report, ()) = tokio::join!(
        h.orchestrator.publish_product(h.product_id, &[Marketplace::Ebay], &cancel),
        async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(h.product().listing_status(Marketplace::Ebay).is_pending());
            cancel.cancel();
        },
    );

    assert_eq!(report.unwrap().outcome(Marketplace::Ebay), Some(&PublishOutcome::Cancelled));
    assert_eq!(publisher.calls(), 1);
    assert_eq!(h.product().listing_status(Marketplace::Ebay), ListingStatus::published("110011"));
}

#[tokio::test(start_paused = true)]
async fn dropped_publish_future_restores_the_prior_status() {
    let registry = MarketplaceRegistry::new().with(adapter(
        FakeOAuth::new(Marketplace::Etsy),
        FakeMapper::new(Marketplace::Etsy),
        FakePublisher::delayed(Marketplace::Etsy, [], PublishResult::Success("1".to_string()), Duration::from_secs(60)),
    ));
    let h = Harness::new(registry);
    h.authorize(valid_credential(Marketplace::Etsy));

    let cancel = CancellationToken::new();
    let publish = h.orchestrator.publish_product(h.product_id, &[Marketplace::Etsy], &cancel);
    assert!(tokio::time::timeout(Duration::from_secs(5), publish).await.is_err());

    assert_eq!(h.product().listing_status(Marketplace::Etsy), ListingStatus::Unpublished);
}

#[tokio::test(start_paused = true)]
async fn slow_marketplace_calls_time_out_as_retryable_errors() {
    let publisher = FakePublisher::delayed(
        Marketplace::Ebay,
        [],
        PublishResult::Success("never".to_string()),
        Duration::from_secs(300),
    );
    let registry = MarketplaceRegistry::new().with(adapter(
        FakeOAuth::new(Marketplace::Ebay),
        FakeMapper::new(Marketplace::Ebay),
        publisher.clone(),
    ));
    let h = Harness::with_config(
        registry,
        test_config()
            .with_max_attempts(2)
            .with_call_timeout(Duration::from_secs(5)),
    );
    h.authorize(valid_credential(Marketplace::Ebay));

    let report = h
        .orchestrator
        .publish_product(h.product_id, &[Marketplace::Ebay], &CancellationToken::new())
        .await
        .unwrap();

    match report.outcome(Marketplace::Ebay) {
        Some(PublishOutcome::MarketplaceError { code, retryable, .. }) => {
            assert_eq!(code, "timeout");
            assert!(retryable);
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert_eq!(publisher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn duplicate_marketplaces_publish_once() {
    let publisher = FakePublisher::succeeding(Marketplace::Ebay);
    let registry = MarketplaceRegistry::new().with(adapter(
        FakeOAuth::new(Marketplace::Ebay),
        FakeMapper::new(Marketplace::Ebay),
        publisher.clone(),
    ));
    let h = Harness::new(registry);
    h.authorize(valid_credential(Marketplace::Ebay));

    let report = h
        .orchestrator
        .publish_product(
            h.product_id,
            &[Marketplace::Ebay, Marketplace::Ebay],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(publisher.calls(), 1);
}

#[tokio::test]
async fn unknown_product_is_an_error() {
    let h = Harness::new(MarketplaceRegistry::new());
    let err = h
        .orchestrator
        .publish_product(ProductId::new(), &BOTH, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::ProductNotFound(_)));
}

#[test]
fn adapter_parts_must_agree_on_the_marketplace() {
    let err = crosslist_publishing::MarketplaceAdapter::new(
        FakeOAuth::new(Marketplace::Ebay),
        FakeMapper::new(Marketplace::Etsy),
        FakePublisher::succeeding(Marketplace::Ebay),
    )
    .unwrap_err();
    assert_eq!(
        err,
        crosslist_publishing::RegistryError::MismatchedParts {
            publisher: Marketplace::Ebay,
            other: Marketplace::Etsy,
            part: "mapper",
        }
    );
}
