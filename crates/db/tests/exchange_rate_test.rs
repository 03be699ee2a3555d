//! Integration tests for the exchange rate cache.
//!
//! Rows are append-only, so each test uses its own base currency and inserts
//! values that stay correct when the test is rerun against the same database.

mod common;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tally_core::currency::{ExchangeRate, ExchangeRateStore};
use tally_db::ExchangeRateRepository;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
}

#[tokio::test]
#[ignore = "requires Postgres at DATABASE_URL"]
async fn test_exact_lookup_prefers_newest_insert() {
    let db = common::connect().await;
    let base = "XTS";
    let repo = ExchangeRateRepository::new(db);

    repo.insert(&ExchangeRate::new(base, "TWD", dec!(31.4), day(10)))
        .await
        .expect("insert");
    repo.insert(&ExchangeRate::new(base, "TWD", dec!(31.6), day(10)))
        .await
        .expect("insert");

    let found = repo
        .find_exact(base, "TWD", day(10))
        .await
        .expect("lookup")
        .expect("rate exists");

    assert_eq!(found.rate, dec!(31.6));
    assert!(repo.find_exact(base, "TWD", day(11)).await.expect("lookup").is_none());
}

#[tokio::test]
#[ignore = "requires Postgres at DATABASE_URL"]
async fn test_latest_on_or_before_skips_future_rows() {
    let db = common::connect().await;
    let base = "XAG";
    let repo = ExchangeRateRepository::new(db);

    for (d, rate) in [(1, dec!(30.0)), (5, dec!(31.0)), (20, dec!(32.0))] {
        repo.insert(&ExchangeRate::new(base, "TWD", rate, day(d)))
            .await
            .expect("insert");
    }

    let found = repo
        .find_latest_on_or_before(&base.to_ascii_lowercase(), "twd", day(10))
        .await
        .expect("lookup")
        .expect("rate exists");

    assert_eq!(found.rate_date, day(5));
    assert_eq!(found.rate, dec!(31.0));
    assert!(
        repo.find_latest_on_or_before(base, "TWD", NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
            .await
            .expect("lookup")
            .is_none()
    );
}
