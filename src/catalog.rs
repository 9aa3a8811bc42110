//! The fixed contract snapshot: test tokens, fee tiers and the pools
//! pre-deployed for each recognized pair.

use alloy_primitives::{Address, address, keccak256};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
}

pub const USDC: Token = Token {
    symbol: "usdc",
    address: address!("1c4a7e0b2a3f6f8c3b5d1f2a6e4c0d9b8a7f1001"),
    decimals: 6,
};

pub const DAI: Token = Token {
    symbol: "dai",
    address: address!("5f2d8c9a4b1e3d7f6a0c2b9e8d4f7a3c1b5e2002"),
    decimals: 18,
};

pub const WETH: Token = Token {
    symbol: "weth",
    address: address!("9a3b6e1f7c2d4a8b0e5f3c7d1a9b6e2f4c8d3003"),
    decimals: 18,
};

pub const WBTC: Token = Token {
    symbol: "wbtc",
    address: address!("c7e2f9a4d1b8c3e6f0a5d2b7e4c9f1a8d3b6e004"),
    decimals: 8,
};

/// Pool fee in hundredths of a basis point. Each tier has a fixed tick
/// spacing; no other values are deployable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeeTier {
    Lowest,
    Low,
    Medium,
    High,
}

impl FeeTier {
    pub const ALL: [FeeTier; 4] = [FeeTier::Lowest, FeeTier::Low, FeeTier::Medium, FeeTier::High];

    pub fn from_fee(fee: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.fee() == fee)
    }

    pub const fn fee(self) -> u32 {
        match self {
            FeeTier::Lowest => 100,
            FeeTier::Low => 500,
            FeeTier::Medium => 3000,
            FeeTier::High => 10000,
        }
    }

    pub const fn tick_spacing(self) -> i32 {
        match self {
            FeeTier::Lowest => 1,
            FeeTier::Low => 10,
            FeeTier::Medium => 60,
            FeeTier::High => 200,
        }
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fee())
    }
}

/// A pool present in the snapshot. Tokens are in address order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogPool {
    pub token0: Token,
    pub token1: Token,
    pub fee: FeeTier,
    pub address: Address,
}

/// Deterministic pool address for a sorted pair and fee.
pub fn pool_address(token0: Address, token1: Address, fee: FeeTier) -> Address {
    let mut preimage = Vec::with_capacity(44);
    preimage.extend_from_slice(token0.as_slice());
    preimage.extend_from_slice(token1.as_slice());
    preimage.extend_from_slice(&fee.fee().to_be_bytes());
    Address::from_slice(&keccak256(&preimage)[12..])
}

/// Orders two tokens the way pools store them.
pub fn sort_tokens(a: Token, b: Token) -> (Token, Token) {
    if a.address < b.address { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    tokens: Vec<Token>,
    pools: Vec<CatalogPool>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::snapshot()
    }
}

impl Catalog {
    /// The standard snapshot.
    pub fn snapshot() -> Self {
        let pairs = [
            (USDC, DAI, FeeTier::Lowest),
            (USDC, DAI, FeeTier::Low),
            (USDC, WETH, FeeTier::Low),
            (USDC, WETH, FeeTier::Medium),
            (DAI, WETH, FeeTier::Low),
            (WETH, WBTC, FeeTier::Low),
            (DAI, WBTC, FeeTier::Low),
            (USDC, WBTC, FeeTier::Low),
        ];
        Self::new(vec![USDC, DAI, WETH, WBTC], &pairs)
    }

    pub fn new(tokens: Vec<Token>, pairs: &[(Token, Token, FeeTier)]) -> Self {
        let pools = pairs
            .iter()
            .map(|&(a, b, fee)| {
                let (token0, token1) = sort_tokens(a, b);
                CatalogPool {
                    token0,
                    token1,
                    fee,
                    address: pool_address(token0.address, token1.address, fee),
                }
            })
            .collect();
        Self { tokens, pools }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn pools(&self) -> &[CatalogPool] {
        &self.pools
    }

    pub fn token(&self, symbol: &str) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Looks up the pool for a pair in either order.
    pub fn pool(&self, a: &Token, b: &Token, fee: FeeTier) -> Option<&CatalogPool> {
        let (token0, token1) = sort_tokens(*a, *b);
        self.pools
            .iter()
            .find(|p| p.token0 == token0 && p.token1 == token1 && p.fee == fee)
    }
}
