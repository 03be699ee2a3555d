//! In-memory fakes for the storage and provider seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tally_shared::types::{CategoryId, ExpenseId, PricingConfigId, UserId};
use tokio::sync::{Barrier, mpsc};

use crate::ai::{AiBackend, AiCall, AiError};
use crate::cost::{AiCostLog, CostEvent, CostLogStore, CostMeterHandle};
use crate::currency::{ExchangeRate, ExchangeRateStore, RateProvider};
use crate::error::{ProviderError, StoreError};
use crate::expense::{Category, CategoryStore, Expense, ExpenseStore, UserPreferenceStore};
use crate::parsing::ParsedExpenseCandidate;
use crate::pricing::{PricingConfig, PricingConfigInput, PricingLedger, PricingProvider};

/// A cost handle whose queue the test reads directly.
pub fn recording_cost_meter(capacity: usize) -> (CostMeterHandle, mpsc::Receiver<CostEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (CostMeterHandle::from_sender(tx), rx)
}

/// AI backend returning canned results.
pub struct ScriptedAi {
    parse: Mutex<AiCall<Vec<ParsedExpenseCandidate>>>,
    suggest: Mutex<AiCall<String>>,
    suggest_calls: AtomicUsize,
}

impl ScriptedAi {
    pub fn new() -> Self {
        Self {
            parse: Mutex::new(AiCall::failed(AiError::Disabled, None)),
            suggest: Mutex::new(AiCall::failed(AiError::Disabled, None)),
            suggest_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_parse(self, call: AiCall<Vec<ParsedExpenseCandidate>>) -> Self {
        *self.parse.lock().unwrap() = call;
        self
    }

    pub fn set_suggest(&self, call: AiCall<String>) {
        *self.suggest.lock().unwrap() = call;
    }

    pub fn suggest_calls(&self) -> usize {
        self.suggest_calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedAi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiBackend for ScriptedAi {
    fn provider(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        "gemini-2.0-flash-lite"
    }

    async fn parse_expense(
        &self,
        _text: &str,
        _user_id: &UserId,
    ) -> AiCall<Vec<ParsedExpenseCandidate>> {
        self.parse.lock().unwrap().clone()
    }

    async fn suggest_category(&self, _description: &str, _user_id: &UserId) -> AiCall<String> {
        self.suggest_calls.fetch_add(1, Ordering::SeqCst);
        self.suggest.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct InMemoryRateStore {
    rows: Mutex<Vec<ExchangeRate>>,
    fail_inserts: bool,
}

impl InMemoryRateStore {
    pub fn with_rate(self, rate: ExchangeRate) -> Self {
        self.rows.lock().unwrap().push(rate);
        self
    }

    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn rows(&self) -> Vec<ExchangeRate> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeRateStore for InMemoryRateStore {
    async fn find_exact(
        &self,
        base: &str,
        target: &str,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.is_pair(base, target) && r.rate_date == date)
            .cloned())
    }

    async fn find_latest_on_or_before(
        &self,
        base: &str,
        target: &str,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRate>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_pair(base, target) && r.rate_date <= date)
            .max_by_key(|(index, r)| (r.rate_date, *index))
            .map(|(_, r)| r.clone()))
    }

    async fn insert(&self, rate: &ExchangeRate) -> Result<(), StoreError> {
        if self.fail_inserts {
            return Err(StoreError::Database("insert rejected".to_string()));
        }
        self.rows.lock().unwrap().push(rate.clone());
        Ok(())
    }
}

pub struct StubRateProvider {
    rates: Vec<ExchangeRate>,
    error: Option<ProviderError>,
    failing_bases: Vec<String>,
    calls: AtomicUsize,
    last_symbols: Mutex<Vec<String>>,
}

impl StubRateProvider {
    pub fn new(rates: Vec<ExchangeRate>) -> Self {
        Self {
            rates,
            error: None,
            failing_bases: Vec::new(),
            calls: AtomicUsize::new(0),
            last_symbols: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(Vec::new())
        }
    }

    pub fn failing_base(mut self, base: &str) -> Self {
        self.failing_bases.push(base.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_symbols(&self) -> Vec<String> {
        self.last_symbols.lock().unwrap().clone()
    }
}

#[async_trait]
impl RateProvider for StubRateProvider {
    async fn fetch(&self, base: &str, symbols: &[String]) -> Result<Vec<ExchangeRate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_symbols.lock().unwrap() = symbols.to_vec();

        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if self.failing_bases.iter().any(|b| b.eq_ignore_ascii_case(base)) {
            return Err(ProviderError::Status {
                status: 503,
                message: format!("{base} unavailable"),
            });
        }
        Ok(self
            .rates
            .iter()
            .filter(|r| r.base_currency.eq_ignore_ascii_case(base))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryPricingLedger {
    rows: Mutex<Vec<PricingConfig>>,
    fail_deactivate: AtomicBool,
    fail_find: AtomicBool,
    read_barrier: Option<Arc<Barrier>>,
}

impl InMemoryPricingLedger {
    /// Makes `parties` concurrent `find_active` calls wait for each other.
    pub fn with_read_barrier(mut self, parties: usize) -> Self {
        self.read_barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    pub fn fail_deactivate(&self, fail: bool) {
        self.fail_deactivate.store(fail, Ordering::SeqCst);
    }

    pub fn fail_find(&self, fail: bool) {
        self.fail_find.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<PricingConfig> {
        self.rows.lock().unwrap().clone()
    }

    pub fn active_rows(&self, provider: &str, model: &str) -> Vec<PricingConfig> {
        self.rows()
            .into_iter()
            .filter(|r| r.is_active && r.provider == provider && r.model == model)
            .collect()
    }
}

#[async_trait]
impl PricingLedger for InMemoryPricingLedger {
    async fn find_active(
        &self,
        provider: &str,
        model: &str,
    ) -> Result<Option<PricingConfig>, StoreError> {
        if let Some(barrier) = &self.read_barrier {
            barrier.wait().await;
        }
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(StoreError::Database("lookup failed".to_string()));
        }
        Ok(self.active_rows(provider, model).into_iter().next())
    }

    async fn deactivate(&self, id: PricingConfigId) -> Result<(), StoreError> {
        if self.fail_deactivate.load(Ordering::SeqCst) {
            return Err(StoreError::Database("deactivate failed".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id && r.is_active)
            .ok_or_else(|| StoreError::Conflict(format!("pricing {id} is not active")))?;
        row.is_active = false;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn create(&self, input: &PricingConfigInput) -> Result<PricingConfig, StoreError> {
        let row = input.clone().into_active(Utc::now());
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }
}

pub struct StubPricingProvider {
    response: Mutex<Result<Vec<PricingConfigInput>, ProviderError>>,
}

impl StubPricingProvider {
    pub fn new(rows: Vec<PricingConfigInput>) -> Self {
        Self {
            response: Mutex::new(Ok(rows)),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            response: Mutex::new(Err(error)),
        }
    }

    pub fn set(&self, rows: Vec<PricingConfigInput>) {
        *self.response.lock().unwrap() = Ok(rows);
    }
}

#[async_trait]
impl PricingProvider for StubPricingProvider {
    async fn fetch(&self) -> Result<Vec<PricingConfigInput>, ProviderError> {
        self.response.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct InMemoryCostLogStore {
    rows: Mutex<Vec<AiCostLog>>,
    failing: bool,
    delay: Option<Duration>,
}

impl InMemoryCostLogStore {
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn rows(&self) -> Vec<AiCostLog> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl CostLogStore for InMemoryCostLogStore {
    async fn insert(&self, log: &AiCostLog) -> Result<(), StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(StoreError::Database("cost log insert failed".to_string()));
        }
        self.rows.lock().unwrap().push(log.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryExpenseStore {
    rows: Mutex<Vec<Expense>>,
    failing: bool,
}

impl InMemoryExpenseStore {
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn rows(&self) -> Vec<Expense> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExpenseStore for InMemoryExpenseStore {
    async fn insert(&self, expense: &Expense) -> Result<Expense, StoreError> {
        if self.failing {
            return Err(StoreError::Database("connection reset".to_string()));
        }
        self.rows.lock().unwrap().push(expense.clone());
        Ok(expense.clone())
    }

    async fn find_by_id(&self, id: ExpenseId) -> Result<Option<Expense>, StoreError> {
        Ok(self.rows.lock().unwrap().iter().find(|e| e.id == id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryCategoryStore {
    rows: Mutex<Vec<Category>>,
}

impl InMemoryCategoryStore {
    pub fn add(&self, category: Category) {
        self.rows.lock().unwrap().push(category);
    }
}

#[async_trait]
impl CategoryStore for InMemoryCategoryStore {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Category>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| &c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.rows.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn insert(&self, category: &Category) -> Result<Category, StoreError> {
        self.add(category.clone());
        Ok(category.clone())
    }
}

#[derive(Default)]
pub struct InMemoryPreferenceStore {
    home_currencies: Mutex<HashMap<UserId, String>>,
}

impl InMemoryPreferenceStore {
    pub fn set(&self, user_id: &UserId, currency: &str) {
        self.home_currencies
            .lock()
            .unwrap()
            .insert(user_id.clone(), currency.to_string());
    }
}

#[async_trait]
impl UserPreferenceStore for InMemoryPreferenceStore {
    async fn home_currency(&self, user_id: &UserId) -> Result<Option<String>, StoreError> {
        Ok(self.home_currencies.lock().unwrap().get(user_id).cloned())
    }
}
