//! Integration tests for the expense, category and preference repositories.

mod common;

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use tally_core::expense::{Category, CategoryStore, Expense, ExpenseStore, UserPreferenceStore};
use tally_db::{CategoryRepository, ExpenseRepository, UserPreferenceRepository};
use tally_shared::types::{ExpenseId, UserId};

#[tokio::test]
#[ignore = "requires Postgres at DATABASE_URL"]
async fn test_expense_round_trip_keeps_exact_amounts() {
    let db = common::connect().await;
    let user = UserId::from(common::unique_user());
    let categories = CategoryRepository::new(db.clone());
    let category = categories
        .insert(&Category::new(user.clone(), "Food"))
        .await
        .expect("insert category");

    let at = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
    let expense = Expense {
        id: ExpenseId::new(),
        user_id: user.clone(),
        description: "dinner".to_string(),
        original_amount: dec!(100.1234),
        currency: "USD".to_string(),
        home_amount: dec!(3153.8871),
        home_currency: "TWD".to_string(),
        exchange_rate: dec!(31.5),
        category_id: Some(category.id),
        account: "Cash".to_string(),
        expense_date: at,
        created_at: at,
        updated_at: at,
    };

    let repo = ExpenseRepository::new(db);
    repo.insert(&expense).await.expect("insert expense");
    let loaded = repo
        .find_by_id(expense.id)
        .await
        .expect("find expense")
        .expect("expense exists");

    assert_eq!(loaded.original_amount, dec!(100.1234));
    assert_eq!(loaded.home_amount, dec!(3153.8871));
    assert_eq!(loaded.category_id, Some(category.id));
    assert_eq!(loaded.expense_date, at);
}

#[tokio::test]
#[ignore = "requires Postgres at DATABASE_URL"]
async fn test_categories_listed_oldest_first_per_user() {
    let db = common::connect().await;
    let user = UserId::from(common::unique_user());
    let other = UserId::from(common::unique_user());
    let repo = CategoryRepository::new(db);

    let mut first = Category::new(user.clone(), "Food");
    first.created_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let mut second = Category::new(user.clone(), "Transport");
    second.created_at = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
    repo.insert(&second).await.expect("insert");
    repo.insert(&first).await.expect("insert");
    repo.insert(&Category::new(other, "Food")).await.expect("insert");

    let names: Vec<_> = repo
        .list_for_user(&user)
        .await
        .expect("list")
        .into_iter()
        .map(|c| c.name)
        .collect();

    assert_eq!(names, vec!["Food", "Transport"]);
}

#[tokio::test]
#[ignore = "requires Postgres at DATABASE_URL"]
async fn test_home_currency_upsert() {
    let db = common::connect().await;
    let user = UserId::from(common::unique_user());
    let repo = UserPreferenceRepository::new(db);

    assert_eq!(repo.home_currency(&user).await.expect("read"), None);

    repo.set_home_currency(&user, Some("jpy")).await.expect("set");
    assert_eq!(repo.home_currency(&user).await.expect("read").as_deref(), Some("JPY"));

    repo.set_home_currency(&user, None).await.expect("clear");
    assert_eq!(repo.home_currency(&user).await.expect("read"), None);
}
