//! Uniswap V3 pool and lending position math for agent-based DEX simulation.
//!
//! This crate exposes:
//! - Low‑level math primitives (`math::*`) for ticks, prices, liquidity and
//!   decimal/base-unit conversion.
//! - [`PoolHandle`] and [`LendingEngine`] façades that size and submit pool
//!   and lending calls through a [`ContractEnv`].
//! - [`Registry`], which builds the façades from a TOML declaration.
//! - [`SimulatedChain`], an in-process [`ContractEnv`] holding the catalog's
//!   pools, an ERC-20 ledger and lending pools.
//!
//! # Examples
//!
//! ## Pure math
//! ```no_run
//! use dexsim::{math::tick_math, RESOLUTION, U256};
//!
//! let sqrt_price = tick_math::get_sqrt_ratio_at_tick(0).unwrap();
//! assert!(sqrt_price > U256::ZERO);
//! assert_eq!(RESOLUTION, 96);
//! ```
//!
//! ## Providing liquidity on a simulated chain
//! ```no_run
//! use std::sync::Arc;
//! use dexsim::{Catalog, Registry, SimulatedChain, SimulatorConfig};
//!
//! let config = SimulatorConfig::from_toml_str(r#"
//!     [[pools]]
//!     name = "usdc_weth"
//!     token0 = "usdc"
//!     token1 = "weth"
//!     fee = 500
//!     starting_price = 0.0002
//! "#).unwrap();
//!
//! let catalog = Catalog::snapshot();
//! let chain = Arc::new(SimulatedChain::new(&catalog));
//! let deployer = chain.create_account();
//! let registry = Registry::build(chain.clone(), &catalog, &config, deployer).unwrap();
//!
//! let pool = registry.pool("usdc_weth").unwrap();
//! let alice = chain.create_account();
//! pool.mint_tokens(10_000.0, 2.0, alice).unwrap();
//! let minted = pool
//!     .mint_liquidity_position(10_000.0, 2.0, 1.0 / 4900.0, 1.0 / 5100.0, alice)
//!     .unwrap();
//! println!("liquidity {} for {} usdc and {} weth", minted.liquidity, minted.amount0, minted.amount1);
//! ```

pub use alloy_primitives::{Address, I256, U256};

pub mod catalog;
pub mod config;
pub mod env;
pub mod error;
mod hash;
pub mod lending;
pub mod math;
pub mod pool;
pub mod registry;
pub mod sim;

pub use catalog::{Catalog, CatalogPool, FeeTier, Token};
pub use config::{SimulatorConfig, ValidatedConfig};
pub use env::{ContractEnv, EnvError, Revert, SharedEnv};
pub use error::Error;
pub use hash::{FastMap, FastSet};
pub use lending::{LendingEngine, LoanInformation, LoanState};
pub use math::fixed_point::FixedPointConverter;
pub use pool::PoolHandle;
pub use registry::Registry;
pub use sim::SimulatedChain;

const U160_MAX: U256 = U256::from_limbs([0, 0, 4294967296, 0]);
const U256_E6: U256 = U256::from_limbs([1000000, 0, 0, 0]);

pub const RESOLUTION: u8 = 96;
pub const Q96: U256 = U256::from_limbs([0, 4294967296, 0, 0]);
