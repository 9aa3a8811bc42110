#![allow(dead_code)]

use dexsim::{Address, Catalog, Registry, SimulatedChain, SimulatorConfig};
use std::sync::Arc;

pub const CONFIG: &str = r#"
    [[pools]]
    name = "usdc_weth"
    token0 = "usdc"
    token1 = "weth"
    fee = 500
    starting_price = 0.0002

    [[pools]]
    name = "usdc_weth_30"
    token0 = "weth"
    token1 = "usdc"
    fee = 3000
    starting_price = 5000.0

    [[pools]]
    name = "dai_wbtc"
    token0 = "dai"
    token1 = "wbtc"
    fee = 500
    starting_price = 0.00002

    [[lending]]
    pool = "usdc_weth"
    collateral = "weth"
    collateral_ratio = 1.25
    lending_capital = 1000000.0
"#;

pub struct World {
    pub chain: Arc<SimulatedChain>,
    pub registry: Registry<SimulatedChain>,
    pub deployer: Address,
}

pub fn world() -> World {
    world_from(CONFIG)
}

pub fn world_from(content: &str) -> World {
    let catalog = Catalog::snapshot();
    let chain = Arc::new(SimulatedChain::new(&catalog));
    let deployer = chain.create_account();
    let config = SimulatorConfig::from_toml_str(content).expect("config parses");
    let registry =
        Registry::build(chain.clone(), &catalog, &config, deployer).expect("registry builds");
    World {
        chain,
        registry,
        deployer,
    }
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    let error = ((actual - expected) / expected).abs();
    assert!(
        error < tolerance,
        "{actual} differs from {expected} by {error} (tolerance {tolerance})"
    );
}
