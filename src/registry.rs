//! Named pools and lending facilities, built once from configuration.

use crate::FastMap;
use crate::catalog::Catalog;
use crate::config::SimulatorConfig;
use crate::env::{ContractEnv, SharedEnv};
use crate::error::Error;
use crate::lending::LendingEngine;
use crate::math::fixed_point::FixedPointConverter;
use crate::pool::PoolHandle;
use alloy_primitives::Address;
use tracing::info;

pub struct Registry<E> {
    env: SharedEnv<E>,
    pools: FastMap<String, PoolHandle<E>>,
    lending: FastMap<String, LendingEngine<E>>,
    pool_order: Vec<String>,
    lending_order: Vec<String>,
}

impl<E> std::fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("pools", &self.pool_order)
            .field("lending", &self.lending_order)
            .finish()
    }
}

impl<E: ContractEnv> Registry<E> {
    /// Validates `config` in full, then initializes every declared pool and
    /// deploys and funds every lending facility with `deployer` as its
    /// operator.
    ///
    /// Nothing reaches the environment unless the whole declaration is
    /// valid.
    pub fn build(
        env: SharedEnv<E>,
        catalog: &Catalog,
        config: &SimulatorConfig,
        deployer: Address,
    ) -> Result<Self, Error> {
        let validated = config.validate(catalog)?;
        let converter = FixedPointConverter::new(validated.precision_epsilon);

        let mut pools = FastMap::default();
        let mut pool_order = Vec::with_capacity(validated.pools.len());
        for definition in validated.pools {
            let name = definition.name.clone();
            let handle = PoolHandle::new(env.clone(), definition, converter);
            handle.initialize_if_necessary()?;
            pool_order.push(name.clone());
            pools.insert(name, handle);
        }

        let mut lending = FastMap::default();
        let mut lending_order = Vec::with_capacity(validated.lending.len());
        for definition in validated.lending {
            let pool = pools
                .get(&definition.pool)
                .cloned()
                .ok_or_else(|| Error::PoolNotFoundError(definition.pool.clone()))?;
            let name = definition.pool.clone();
            let engine = LendingEngine::deploy(pool, definition, deployer)?;
            lending_order.push(name.clone());
            lending.insert(name, engine);
        }

        info!(
            pools = pool_order.len(),
            lending = lending_order.len(),
            %deployer,
            "registry built"
        );
        Ok(Self {
            env,
            pools,
            lending,
            pool_order,
            lending_order,
        })
    }

    pub fn env(&self) -> &SharedEnv<E> {
        &self.env
    }

    pub fn pool(&self, name: &str) -> Result<&PoolHandle<E>, Error> {
        self.pools
            .get(name)
            .ok_or_else(|| Error::PoolNotFoundError(name.to_string()))
    }

    /// Lending facility keyed by the name of the pool it prices against.
    pub fn lending(&self, name: &str) -> Result<&LendingEngine<E>, Error> {
        self.lending
            .get(name)
            .ok_or_else(|| Error::LendingNotFoundError(name.to_string()))
    }

    /// Pool names in declaration order.
    pub fn pool_names(&self) -> &[String] {
        &self.pool_order
    }

    pub fn lending_names(&self) -> &[String] {
        &self.lending_order
    }

    pub fn total_number_of_pools(&self) -> usize {
        self.pools.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FeeTier, USDC, WETH};
    use crate::config::ConfigError;
    use crate::sim::SimulatedChain;
    use std::sync::Arc;

    const CONFIG: &str = r#"
        [[pools]]
        name = "usdc_weth"
        token0 = "usdc"
        token1 = "weth"
        fee = 500
        starting_price = 0.0002

        [[pools]]
        name = "usdc_dai"
        token0 = "usdc"
        token1 = "dai"
        fee = 100
        starting_price = 1.0

        [[lending]]
        pool = "usdc_weth"
        collateral = "weth"
    "#;

    fn build(content: &str) -> (Arc<SimulatedChain>, Result<Registry<SimulatedChain>, Error>) {
        let catalog = Catalog::snapshot();
        let chain = Arc::new(SimulatedChain::new(&catalog));
        let deployer = chain.create_account();
        let config = SimulatorConfig::from_toml_str(content).unwrap();
        let registry = Registry::build(chain.clone(), &catalog, &config, deployer);
        (chain, registry)
    }

    #[test]
    fn builds_declared_pools_and_lending() {
        let (_, registry) = build(CONFIG);
        let registry = registry.unwrap();

        assert_eq!(registry.total_number_of_pools(), 2);
        assert_eq!(registry.pool_names(), ["usdc_weth", "usdc_dai"]);
        assert_eq!(registry.lending_names(), ["usdc_weth"]);

        let pool = registry.pool("usdc_dai").unwrap();
        let rates = pool.exchange_rates().unwrap();
        assert!((rates.token1_per_token0 - 1.0).abs() < 1e-9);

        let lending = registry.lending("usdc_weth").unwrap();
        assert!((lending.available_to_lend().unwrap() - 1e9).abs() < 1e-3);
    }

    #[test]
    fn unknown_names_are_errors() {
        let (_, registry) = build(CONFIG);
        let registry = registry.unwrap();
        assert!(matches!(
            registry.pool("dai_weth"),
            Err(Error::PoolNotFoundError(name)) if name == "dai_weth"
        ));
        assert!(matches!(
            registry.lending("usdc_dai"),
            Err(Error::LendingNotFoundError(_))
        ));
    }

    #[test]
    fn invalid_declaration_touches_nothing() {
        let content = CONFIG.replace("fee = 100", "fee = 250");
        let (chain, registry) = build(&content);
        assert!(matches!(
            registry,
            Err(Error::ConfigError(ConfigError::UnsupportedFeeTier { fee: 250, .. }))
        ));

        let catalog = Catalog::snapshot();
        let usdc_weth = catalog.pool(&USDC, &WETH, FeeTier::Low).unwrap().address;
        assert!(!chain.slot0(usdc_weth).unwrap().is_initialized());
    }
}
