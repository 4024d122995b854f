//! Bonding-curve pricing for the house token.
//!
//! Price is a pure function of the house reserve: a saturating
//! logarithmic curve that starts at `base_price` with empty reserves
//! and approaches `base_price * max_multiplier` as reserves grow past
//! the target. Buys are quoted by integrating the curve over the
//! reserve growth they cause; sells invert the buy integral by binary
//! search (there is no closed form).
//!
//! All math here is f64 on purpose: quotes are advisory pricing, not
//! ledger money. Balances never pass through this module.

use serde::{Deserialize, Serialize};

/// Shape of the price curve. Loaded from config; the defaults match
/// the production deployment.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveParams {
    /// Price at zero reserves, in SOL per token.
    pub base_price: f64,
    /// Asymptotic price ceiling as a multiple of `base_price`.
    pub max_multiplier: f64,
    /// Reserve level (SOL) at which the curve saturates.
    pub target_reserve: f64,
    /// Discretization steps for the buy integral.
    pub buy_steps: u32,
    /// Convergence tolerance (SOL) for the sell inversion.
    pub sell_tolerance: f64,
}

impl Default for CurveParams {
    fn default() -> Self {
        CurveParams {
            base_price: 0.0001,
            max_multiplier: 10.0,
            target_reserve: 1_000.0,
            buy_steps: 100,
            sell_tolerance: 1e-4,
        }
    }
}

impl CurveParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.base_price <= 0.0 {
            return Err("curve.base_price must be positive".into());
        }
        if self.max_multiplier < 1.0 {
            return Err("curve.max_multiplier must be at least 1".into());
        }
        if self.target_reserve <= 0.0 {
            return Err("curve.target_reserve must be positive".into());
        }
        if self.buy_steps == 0 {
            return Err("curve.buy_steps must be positive".into());
        }
        if self.sell_tolerance <= 0.0 {
            return Err("curve.sell_tolerance must be positive".into());
        }
        Ok(())
    }
}

/// Spot price at the given reserve level.
///
/// `base_price * (1 + (max_multiplier - 1) * log10(1 + 9 * min(r/target, 1)))`
///
/// The fill fraction is clamped to 1, so the curve is flat past the
/// target reserve at exactly `base_price * max_multiplier`.
pub fn price(reserves: f64, params: &CurveParams) -> f64 {
    let fill = (reserves / params.target_reserve).clamp(0.0, 1.0);
    params.base_price * (1.0 + (params.max_multiplier - 1.0) * (1.0 + 9.0 * fill).log10())
}

/// Result of pricing a buy or sell against the curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// SOL paid in (buy) or received (sell).
    pub sol_amount: f64,
    /// Tokens received (buy) or surrendered (sell).
    pub token_amount: f64,
    /// Average execution price in SOL per token.
    pub avg_price: f64,
    /// Relative move of the average price against the spot price at
    /// the start of the trade.
    pub price_impact: f64,
}

/// Quote a purchase of `sol_amount` SOL worth of tokens at the current
/// reserve level.
///
/// The curve is integrated in `params.buy_steps` equal reserve
/// increments: each slice buys tokens at the spot price of the
/// reserves accumulated so far, so larger purchases fill at a worse
/// average price.
pub fn quote_buy(sol_amount: f64, reserves: f64, params: &CurveParams) -> Quote {
    let start_price = price(reserves, params);
    if sol_amount <= 0.0 {
        return Quote {
            sol_amount: 0.0,
            token_amount: 0.0,
            avg_price: start_price,
            price_impact: 0.0,
        };
    }

    let step = sol_amount / params.buy_steps as f64;
    let mut tokens = 0.0;
    for i in 0..params.buy_steps {
        let slice_reserves = reserves + step * i as f64;
        tokens += step / price(slice_reserves, params);
    }

    let avg_price = sol_amount / tokens;
    Quote {
        sol_amount,
        token_amount: tokens,
        avg_price,
        price_impact: (avg_price - start_price) / start_price,
    }
}

/// Quote a sale of `token_amount` tokens at the current reserve level.
///
/// Inverts the buy integral: searches for the SOL amount whose
/// purchase, made from the post-sale reserve level, would yield
/// exactly `token_amount` tokens. Bisection over `[0, reserves]`
/// converges to within `params.sell_tolerance`.
pub fn quote_sell(token_amount: f64, reserves: f64, params: &CurveParams) -> Quote {
    let spot = price(reserves, params);
    if token_amount <= 0.0 || reserves <= 0.0 {
        return Quote {
            sol_amount: 0.0,
            token_amount: 0.0,
            avg_price: spot,
            price_impact: 0.0,
        };
    }

    let mut lo = 0.0_f64;
    let mut hi = reserves;
    while hi - lo > params.sell_tolerance {
        let mid = (lo + hi) / 2.0;
        let bought = quote_buy(mid, reserves - mid, params).token_amount;
        if bought < token_amount {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let sol = (lo + hi) / 2.0;
    let avg_price = sol / token_amount;
    Quote {
        sol_amount: sol,
        token_amount,
        avg_price,
        price_impact: (avg_price - spot) / spot,
    }
}
