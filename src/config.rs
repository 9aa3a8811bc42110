//! Declaration file for pools and lending facilities.
//!
//! ```toml
//! precision_epsilon = 1e-9
//!
//! [[pools]]
//! name = "usdc_weth"
//! token0 = "usdc"
//! token1 = "weth"
//! fee = 500
//! starting_price = 0.0002
//!
//! [[lending]]
//! pool = "usdc_weth"
//! collateral = "weth"
//! ```

use crate::FastSet;
use crate::catalog::{Catalog, CatalogPool, FeeTier, Token};
use crate::math::fixed_point::{DEFAULT_PRECISION_EPSILON, FixedPointConverter};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_COLLATERAL_RATIO: f64 = 1.25;
pub const DEFAULT_LENDING_CAPITAL: f64 = 1_000_000_000.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config file {0} must have a .toml extension")]
    UnsupportedFormat(PathBuf),

    #[error("pool '{pool}': fee {fee} is not a supported fee tier")]
    UnsupportedFeeTier { pool: String, fee: u32 },

    #[error("pool '{pool}': unknown token '{symbol}'")]
    UnknownToken { pool: String, symbol: String },

    #[error("pool '{pool}': no pre-deployed pool for {token0}/{token1} at fee {fee}")]
    UnknownPool {
        pool: String,
        token0: String,
        token1: String,
        fee: u32,
    },

    #[error("pool '{0}' is declared more than once")]
    DuplicatePool(String),

    #[error("pool '{0}' has more than one lending facility")]
    DuplicateLending(String),

    #[error("lending facility refers to undeclared pool '{0}'")]
    LendingPoolMissing(String),

    #[error("lending on '{pool}': collateral '{collateral}' is not one of the pool's tokens")]
    CollateralNotInPool { pool: String, collateral: String },

    #[error("pool '{pool}': starting price {price} must be finite and positive")]
    InvalidStartingPrice { pool: String, price: f64 },

    #[error("lending on '{pool}': collateral ratio {ratio} must be at least 1 in whole basis points")]
    InvalidCollateralRatio { pool: String, ratio: f64 },

    #[error("lending on '{pool}': lending capital {capital} is not a non-negative {symbol} amount")]
    InvalidLendingCapital {
        pool: String,
        capital: f64,
        symbol: &'static str,
    },

    #[error("precision epsilon {0} must be finite and non-negative")]
    InvalidEpsilon(f64),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PoolConfig {
    pub name: String,
    pub token0: String,
    pub token1: String,
    pub fee: u32,
    /// token1 per token0, in whole tokens
    pub starting_price: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LendingConfig {
    pub pool: String,
    pub collateral: String,
    #[serde(default = "default_collateral_ratio")]
    pub collateral_ratio: f64,
    #[serde(default = "default_lending_capital")]
    pub lending_capital: f64,
}

fn default_collateral_ratio() -> f64 {
    DEFAULT_COLLATERAL_RATIO
}

fn default_lending_capital() -> f64 {
    DEFAULT_LENDING_CAPITAL
}

fn default_precision_epsilon() -> f64 {
    DEFAULT_PRECISION_EPSILON
}

/// Raw declaration, as read from disk.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_precision_epsilon")]
    pub precision_epsilon: f64,
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
    #[serde(default)]
    pub lending: Vec<LendingConfig>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            precision_epsilon: DEFAULT_PRECISION_EPSILON,
            pools: Vec::new(),
            lending: Vec::new(),
        }
    }
}

/// A declared pool resolved against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolDefinition {
    pub name: String,
    pub pool: CatalogPool,
    /// token1 per token0 in catalog order
    pub starting_price: f64,
}

impl PoolDefinition {
    pub fn token0(&self) -> &Token {
        &self.pool.token0
    }

    pub fn token1(&self) -> &Token {
        &self.pool.token1
    }

    pub fn fee(&self) -> FeeTier {
        self.pool.fee
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LendingDefinition {
    pub pool: String,
    pub collateral: Token,
    pub lending: Token,
    /// Required collateral value over debt value, in basis points.
    pub collateral_ratio_bps: u32,
    /// Bootstrap capital in lending token base units.
    pub lending_capital: U256,
}

impl LendingDefinition {
    pub fn collateral_ratio(&self) -> f64 {
        self.collateral_ratio_bps as f64 / 10_000.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub precision_epsilon: f64,
    pub pools: Vec<PoolDefinition>,
    pub lending: Vec<LendingDefinition>,
}

impl SimulatorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            return Err(ConfigError::UnsupportedFormat(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolves every declaration against `catalog`, failing on the first
    /// invalid entry. Amounts are converted to base units here, so building
    /// from the result has no conversion left that could fail.
    pub fn validate(&self, catalog: &Catalog) -> Result<ValidatedConfig, ConfigError> {
        if !self.precision_epsilon.is_finite() || self.precision_epsilon < 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.precision_epsilon));
        }
        let converter = FixedPointConverter::new(self.precision_epsilon);

        let mut names = FastSet::default();
        let pools = self
            .pools
            .iter()
            .map(|pool| {
                if !names.insert(pool.name.as_str()) {
                    return Err(ConfigError::DuplicatePool(pool.name.clone()));
                }
                pool.resolve(catalog)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut with_lending = FastSet::default();
        let lending = self
            .lending
            .iter()
            .map(|lending| {
                let pool = pools
                    .iter()
                    .find(|p| p.name == lending.pool)
                    .ok_or_else(|| ConfigError::LendingPoolMissing(lending.pool.clone()))?;
                if !with_lending.insert(lending.pool.as_str()) {
                    return Err(ConfigError::DuplicateLending(lending.pool.clone()));
                }
                lending.resolve(pool, &converter)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedConfig {
            precision_epsilon: self.precision_epsilon,
            pools,
            lending,
        })
    }
}

impl PoolConfig {
    fn resolve(&self, catalog: &Catalog) -> Result<PoolDefinition, ConfigError> {
        let fee = FeeTier::from_fee(self.fee).ok_or_else(|| ConfigError::UnsupportedFeeTier {
            pool: self.name.clone(),
            fee: self.fee,
        })?;
        let lookup = |symbol: &str| {
            catalog
                .token(symbol)
                .copied()
                .ok_or_else(|| ConfigError::UnknownToken {
                    pool: self.name.clone(),
                    symbol: symbol.to_string(),
                })
        };
        let token_a = lookup(&self.token0)?;
        let token_b = lookup(&self.token1)?;

        if !self.starting_price.is_finite() || self.starting_price <= 0.0 {
            return Err(ConfigError::InvalidStartingPrice {
                pool: self.name.clone(),
                price: self.starting_price,
            });
        }

        let pool = catalog
            .pool(&token_a, &token_b, fee)
            .copied()
            .ok_or_else(|| ConfigError::UnknownPool {
                pool: self.name.clone(),
                token0: self.token0.clone(),
                token1: self.token1.clone(),
                fee: self.fee,
            })?;

        // declared as token1/token0: flip to catalog order
        let starting_price = if pool.token0 == token_a {
            self.starting_price
        } else {
            1.0 / self.starting_price
        };

        Ok(PoolDefinition {
            name: self.name.clone(),
            pool,
            starting_price,
        })
    }
}

impl LendingConfig {
    fn resolve(
        &self,
        pool: &PoolDefinition,
        converter: &FixedPointConverter,
    ) -> Result<LendingDefinition, ConfigError> {
        let (collateral, lending) = if pool.token0().symbol.eq_ignore_ascii_case(&self.collateral) {
            (pool.pool.token0, pool.pool.token1)
        } else if pool.token1().symbol.eq_ignore_ascii_case(&self.collateral) {
            (pool.pool.token1, pool.pool.token0)
        } else {
            return Err(ConfigError::CollateralNotInPool {
                pool: self.pool.clone(),
                collateral: self.collateral.clone(),
            });
        };

        let scaled = self.collateral_ratio * 10_000.0;
        let bps = scaled.round();
        if !scaled.is_finite()
            || self.collateral_ratio < 1.0
            || (scaled - bps).abs() > 1e-6
            || bps > u32::MAX as f64
        {
            return Err(ConfigError::InvalidCollateralRatio {
                pool: self.pool.clone(),
                ratio: self.collateral_ratio,
            });
        }

        let lending_capital = converter
            .to_base_units(&lending, self.lending_capital)
            .map_err(|_| ConfigError::InvalidLendingCapital {
                pool: self.pool.clone(),
                capital: self.lending_capital,
                symbol: lending.symbol,
            })?;

        Ok(LendingDefinition {
            pool: self.pool.clone(),
            collateral,
            lending,
            collateral_ratio_bps: bps as u32,
            lending_capital,
        })
    }
}
