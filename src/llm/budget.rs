use crate::config::BudgetConfig;
use crate::error::CostLimitExceeded;
use crate::store::{CostRecord, Store, date_key};
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use std::sync::{Arc, Mutex, PoisonError};

pub type DayClock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct DailySpend {
    day: NaiveDate,
    spent_cents: f64,
}

impl DailySpend {
    fn roll_over(&mut self, today: NaiveDate) {
        if self.day != today {
            *self = Self {
                day: today,
                spent_cents: 0.0,
            };
        }
    }
}

/// In-memory daily spend aggregate backed by the durable cost ledger.
pub struct BudgetTracker {
    store: Store,
    limit_cents: f64,
    warn_below_cents: f64,
    clock: DayClock,
    spend: Mutex<DailySpend>,
}

impl BudgetTracker {
    pub async fn new(store: Store, config: &BudgetConfig) -> anyhow::Result<Self> {
        Self::with_clock(store, config, Arc::new(|| Utc::now().date_naive())).await
    }

    /// Seeds today's aggregate from the ledger so a restart keeps intraday
    /// spend.
    pub async fn with_clock(
        store: Store,
        config: &BudgetConfig,
        clock: DayClock,
    ) -> anyhow::Result<Self> {
        let day = clock();
        let spent_cents = store
            .daily_cost(day)
            .await
            .context("seed daily spend from cost ledger")?;
        tracing::debug!(day = %day, spent_cents, "budget tracker seeded");
        Ok(Self {
            store,
            limit_cents: config.limit_cents(),
            warn_below_cents: config.warn_below_cents,
            clock,
            spend: Mutex::new(DailySpend { day, spent_cents }),
        })
    }

    /// Today's aggregate; rolls over to zero when the clock has moved to a
    /// new day.
    pub fn spent_today(&self) -> f64 {
        let today = (self.clock)();
        let mut spend = self.spend.lock().unwrap_or_else(PoisonError::into_inner);
        spend.roll_over(today);
        spend.spent_cents
    }

    pub fn limit_cents(&self) -> f64 {
        self.limit_cents
    }

    /// Refuse once spend has reached the ceiling; warn when close to it.
    pub fn check(&self) -> Result<(), CostLimitExceeded> {
        let spent_cents = self.spent_today();
        let remaining = self.limit_cents - spent_cents;
        if remaining <= 0.0 {
            return Err(CostLimitExceeded {
                spent_cents,
                limit_cents: self.limit_cents,
            });
        }
        if remaining < self.warn_below_cents {
            tracing::warn!(
                remaining_cents = remaining,
                spent_cents,
                limit_cents = self.limit_cents,
                "daily budget nearly exhausted"
            );
        }
        Ok(())
    }

    /// Add a completed call's cost to today's aggregate and the ledger.
    pub async fn record(
        &self,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        cost_cents: f64,
    ) -> anyhow::Result<()> {
        let cost_cents = cost_cents.max(0.0);
        let day = {
            let today = (self.clock)();
            let mut spend = self.spend.lock().unwrap_or_else(PoisonError::into_inner);
            spend.roll_over(today);
            spend.spent_cents += cost_cents;
            spend.day
        };

        self.store
            .record_cost(&CostRecord {
                date: date_key(day),
                model: model.to_string(),
                input_tokens,
                output_tokens,
                cost_cents,
            })
            .await
            .context("append cost ledger row")
    }
}
