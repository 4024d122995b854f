//! Token market service.
//!
//! The house token is priced deterministically off the reserve figure
//! derived from the house aggregates row; there is no order book and
//! no stored market state. Pricing is read-only and lock-free: it may
//! run concurrently with settlements and simply sees the latest
//! committed aggregates.
//!
//! A rolling price-sample log (written inside settlement units of
//! work, throttled to one row per interval) backs the 24h/7d change
//! and 24h volume figures.

use crate::amount::{Amount, SCALE};
use crate::errors::{CasinoError, CasinoResult};
use crate::games::curve::{self, CurveParams, Quote};
use crate::ledger::HouseAggregates;
use crate::store::{keys, LedgerStore, UnitOfWork};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed token supply; the curve prices the token, not a mint.
pub const TOTAL_SUPPLY: f64 = 1_000_000_000.0;

/// Minimum spacing between persisted price samples.
pub const SAMPLE_INTERVAL_SECS: i64 = 60;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceSample {
    pub ts: DateTime<Utc>,
    pub price: f64,
    /// House wagered total at sampling time, used to derive windowed
    /// volume by subtraction.
    pub total_wagered: Amount,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketStats {
    pub price: f64,
    pub market_cap: f64,
    /// Fraction of the target reserve currently filled (0..=1).
    pub reserve_ratio: f64,
    pub circulating_supply: f64,
    /// Current reserve level in SOL.
    pub reserves: f64,
    /// Relative price change over the window; 0 when no sample old
    /// enough exists.
    pub price_change_24h: f64,
    pub price_change_7d: f64,
    /// Wagered volume over the last 24 hours.
    pub volume_24h: Amount,
}

#[derive(Clone)]
pub struct TokenMarket {
    store: LedgerStore,
    params: CurveParams,
}

impl TokenMarket {
    pub fn new(store: LedgerStore, params: CurveParams) -> Self {
        TokenMarket { store, params }
    }

    pub fn params(&self) -> &CurveParams {
        &self.params
    }

    fn aggregates(&self) -> CasinoResult<HouseAggregates> {
        Ok(self
            .store
            .get_json(&keys::HOUSE_AGGREGATES.to_vec())?
            .unwrap_or_default())
    }

    /// Current reserve level in SOL (floored at one unit).
    pub fn reserves(&self) -> CasinoResult<f64> {
        Ok(self.aggregates()?.reserves_minor() as f64 / SCALE as f64)
    }

    pub fn price(&self) -> CasinoResult<f64> {
        Ok(curve::price(self.reserves()?, &self.params))
    }

    pub fn quote_buy(&self, sol_amount: f64) -> CasinoResult<Quote> {
        if !sol_amount.is_finite() || sol_amount <= 0.0 {
            return Err(CasinoError::InvalidAmount(format!(
                "buy amount must be positive, got {sol_amount}"
            )));
        }
        Ok(curve::quote_buy(sol_amount, self.reserves()?, &self.params))
    }

    pub fn quote_sell(&self, token_amount: f64) -> CasinoResult<Quote> {
        if !token_amount.is_finite() || token_amount <= 0.0 {
            return Err(CasinoError::InvalidAmount(format!(
                "sell amount must be positive, got {token_amount}"
            )));
        }
        Ok(curve::quote_sell(token_amount, self.reserves()?, &self.params))
    }

    pub fn market_stats(&self) -> CasinoResult<MarketStats> {
        let aggregates = self.aggregates()?;
        let reserves = aggregates.reserves_minor() as f64 / SCALE as f64;
        let price = curve::price(reserves, &self.params);
        let now = Utc::now();

        let day_ago = self.sample_at_or_before(now - Duration::hours(24))?;
        let week_ago = self.sample_at_or_before(now - Duration::days(7))?;

        let change = |old: &Option<PriceSample>| match old {
            Some(s) if s.price > 0.0 => (price - s.price) / s.price,
            _ => 0.0,
        };
        let volume_24h = match &day_ago {
            Some(s) => aggregates.total_wagered.saturating_sub(s.total_wagered),
            None => aggregates.total_wagered,
        };

        Ok(MarketStats {
            price,
            market_cap: price * TOTAL_SUPPLY,
            reserve_ratio: (reserves / self.params.target_reserve).clamp(0.0, 1.0),
            circulating_supply: TOTAL_SUPPLY,
            reserves,
            price_change_24h: change(&day_ago),
            price_change_7d: change(&week_ago),
            volume_24h,
        })
    }

    /// Newest sample taken at or before `cutoff`. Sample keys sort
    /// newest-first, so scanning forward from the cutoff key yields
    /// older samples in recency order.
    fn sample_at_or_before(&self, cutoff: DateTime<Utc>) -> CasinoResult<Option<PriceSample>> {
        let rows = self.store.scan_from(
            keys::PRICE_SAMPLE_PREFIX,
            &keys::price_sample(cutoff),
            1,
        )?;
        match rows.into_iter().next() {
            Some((_, value)) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }
}

/// Stage a price sample into the caller's unit of work, unless one
/// newer than the sampling interval already exists. Called from
/// settlement and deposit flows so the log only moves when reserves
/// can have moved.
pub fn stage_price_sample(
    store: &LedgerStore,
    unit: &mut UnitOfWork<'_>,
    aggregates: &HouseAggregates,
    params: &CurveParams,
    now: DateTime<Utc>,
) -> CasinoResult<()> {
    if let Some((_, value)) = store
        .scan_prefix(keys::PRICE_SAMPLE_PREFIX, 0, 1)?
        .into_iter()
        .next()
    {
        let newest: PriceSample = serde_json::from_slice(&value)?;
        if now - newest.ts < Duration::seconds(SAMPLE_INTERVAL_SECS) {
            return Ok(());
        }
    }

    let reserves = aggregates.reserves_minor() as f64 / SCALE as f64;
    let sample = PriceSample {
        ts: now,
        price: curve::price(reserves, params),
        total_wagered: aggregates.total_wagered,
    };
    unit.put_json(keys::price_sample(now), &sample)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn setup() -> (tempfile::TempDir, LedgerStore, TokenMarket) {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(dir.path()).unwrap();
        let market = TokenMarket::new(store.clone(), CurveParams::default());
        (dir, store, market)
    }

    fn put_aggregates(store: &LedgerStore, aggregates: &HouseAggregates) {
        let mut unit = store.begin();
        unit.put_json(keys::HOUSE_AGGREGATES.to_vec(), aggregates)
            .unwrap();
        unit.commit().unwrap();
    }

    #[test]
    fn empty_house_prices_at_the_floor() {
        let (_dir, _store, market) = setup();
        // Reserve floor is 1 SOL.
        assert!((market.reserves().unwrap() - 1.0).abs() < 1e-12);
        let expected = curve::price(1.0, market.params());
        assert!((market.price().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn deposits_move_the_price_up() {
        let (_dir, store, market) = setup();
        let before = market.price().unwrap();
        put_aggregates(
            &store,
            &HouseAggregates {
                total_deposits: amt("500"),
                ..Default::default()
            },
        );
        assert!(market.price().unwrap() > before);
    }

    #[test]
    fn quotes_reject_nonpositive_amounts() {
        let (_dir, _store, market) = setup();
        assert!(market.quote_buy(0.0).is_err());
        assert!(market.quote_buy(f64::NAN).is_err());
        assert!(market.quote_sell(-1.0).is_err());
    }

    #[test]
    fn market_stats_without_history_report_zero_change() {
        let (_dir, store, market) = setup();
        put_aggregates(
            &store,
            &HouseAggregates {
                total_deposits: amt("100"),
                total_wagered: amt("40"),
                total_paid_out: amt("30"),
                ..Default::default()
            },
        );
        let stats = market.market_stats().unwrap();
        assert_eq!(stats.price_change_24h, 0.0);
        assert_eq!(stats.price_change_7d, 0.0);
        // No old sample: the whole wagered total counts as 24h volume.
        assert_eq!(stats.volume_24h, amt("40"));
        assert!(stats.reserves > 100.0);
        assert!(stats.market_cap > 0.0);
    }

    #[test]
    fn windowed_change_uses_old_samples() {
        let (_dir, store, market) = setup();
        let now = Utc::now();

        let old = PriceSample {
            ts: now - Duration::hours(30),
            price: 0.0001,
            total_wagered: amt("10"),
        };
        let mut unit = store.begin();
        unit.put_json(keys::price_sample(old.ts), &old).unwrap();
        unit.commit().unwrap();

        put_aggregates(
            &store,
            &HouseAggregates {
                total_deposits: amt("1000"),
                total_wagered: amt("25"),
                ..Default::default()
            },
        );

        let stats = market.market_stats().unwrap();
        assert!(stats.price_change_24h > 0.0);
        assert_eq!(stats.volume_24h, amt("15"));
    }

    #[test]
    fn price_samples_are_throttled() {
        let (_dir, store, _market) = setup();
        let params = CurveParams::default();
        let aggregates = HouseAggregates::default();
        let now = Utc::now();

        let mut unit = store.begin();
        stage_price_sample(&store, &mut unit, &aggregates, &params, now).unwrap();
        unit.commit().unwrap();

        // Within the interval: nothing new staged.
        let mut unit = store.begin();
        stage_price_sample(
            &store,
            &mut unit,
            &aggregates,
            &params,
            now + Duration::seconds(5),
        )
        .unwrap();
        unit.commit().unwrap();
        assert_eq!(
            store
                .scan_prefix(keys::PRICE_SAMPLE_PREFIX, 0, 10)
                .unwrap()
                .len(),
            1
        );

        // Past the interval: a second sample lands.
        let mut unit = store.begin();
        stage_price_sample(
            &store,
            &mut unit,
            &aggregates,
            &params,
            now + Duration::seconds(SAMPLE_INTERVAL_SECS + 1),
        )
        .unwrap();
        unit.commit().unwrap();
        assert_eq!(
            store
                .scan_prefix(keys::PRICE_SAMPLE_PREFIX, 0, 10)
                .unwrap()
                .len(),
            2
        );
    }
}
