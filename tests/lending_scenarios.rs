mod common;

use common::{CONFIG, assert_close, world, world_from};
use dexsim::pool::strategy::full_range_liquidity;
use dexsim::{Error, LoanState, U256};
use test_case::test_case;

#[test]
fn collateral_required_follows_pool_price_and_ratio() {
    let w = world();
    let lending = w.registry.lending("usdc_weth").unwrap();

    assert_eq!(lending.collateral_token().symbol, "weth");
    assert_eq!(lending.lending_token().symbol, "usdc");
    assert_close(lending.collateral_required(10_000.0).unwrap(), 2.5, 1e-9);
    assert_close(lending.available_to_lend().unwrap(), 1_000_000.0, 1e-12);
}

#[test]
fn borrowing_without_collateral_is_undercollateralized() {
    let w = world();
    let lending = w.registry.lending("usdc_weth").unwrap();
    let alice = w.chain.create_account();

    assert!(matches!(
        lending.borrow(10_000.0, alice),
        Err(Error::UndercollateralizedError { account, .. }) if account == alice
    ));
    assert_eq!(lending.loan_state(alice).unwrap(), LoanState::NoLoan);
    assert_eq!(lending.lending_token_balance(alice).unwrap(), 0.0);
    assert_close(lending.available_to_lend().unwrap(), 1_000_000.0, 1e-12);
}

#[test]
fn full_loan_cycle() {
    let w = world();
    let lending = w.registry.lending("usdc_weth").unwrap();
    let alice = w.chain.create_account();

    let collateral = lending.collateral_required(10_000.0).unwrap() * 1.01;
    let collateral = (collateral * 1e6).round() / 1e6;
    lending.mint_collateral_token(collateral, alice).unwrap();
    lending.provide_collateral(collateral, alice).unwrap();
    lending.borrow(10_000.0, alice).unwrap();

    let info = lending.loan_information(alice).unwrap();
    assert_eq!(info.debt, U256::from(10_000_000_000u64));
    assert_eq!(
        info.collateral,
        U256::from((collateral * 1e6).round() as u64) * U256::from(1_000_000_000_000u64)
    );
    assert!(info.is_active);
    assert!(lending.is_active_loan(alice).unwrap());
    assert!(lending.is_loan_healthy(alice).unwrap());
    assert_eq!(lending.loan_state(alice).unwrap(), LoanState::Borrowed);
    assert_close(lending.available_to_lend().unwrap(), 990_000.0, 1e-12);

    assert!(matches!(
        lending.withdraw_collateral(collateral, alice),
        Err(Error::ActiveDebtError { .. })
    ));

    lending.repay(10_000.0, alice).unwrap();
    assert!(!lending.is_active_loan(alice).unwrap());
    lending.withdraw_collateral(collateral, alice).unwrap();

    let info = lending.loan_information(alice).unwrap();
    assert!(!info.is_active);
    assert_eq!(info.collateral, U256::ZERO);
    assert_eq!(lending.loan_state(alice).unwrap(), LoanState::Closed);
    assert_eq!(lending.collateral_token_balance(alice).unwrap(), collateral);
}

#[test]
fn pool_price_drop_makes_loans_liquidatable() {
    let w = world();
    let pool = w.registry.pool("usdc_weth").unwrap();
    let lending = w.registry.lending("usdc_weth").unwrap();
    let (lp, trader, borrower, keeper) = (
        w.chain.create_account(),
        w.chain.create_account(),
        w.chain.create_account(),
        w.chain.create_account(),
    );

    pool.mint_tokens(1_000_000.0, 200.0, lp).unwrap();
    full_range_liquidity(pool, 1_000_000.0, 200.0, lp).unwrap();

    lending.mint_collateral_token(1.0, borrower).unwrap();
    lending.provide_collateral(1.0, borrower).unwrap();
    lending.borrow(3_900.0, borrower).unwrap();
    assert_close(lending.collateral_price().unwrap(), 5_000.0, 1e-9);

    // dump weth until it trades at 4000 usdc
    pool.mint_tokens(0.0, 1_000.0, trader).unwrap();
    pool.move_price_to(1.0 / 4000.0, trader).unwrap().unwrap();
    assert_close(lending.rate().unwrap(), 4_000.0, 1e-9);
    assert_close(lending.collateral_required(10_000.0).unwrap(), 3.125, 1e-9);
    assert!(!lending.is_loan_healthy(borrower).unwrap());

    lending.mint_lending_token(3_900.0, keeper).unwrap();
    lending.liquidate_loan(borrower, keeper).unwrap();

    assert_close(lending.collateral_price().unwrap(), 4_000.0, 1e-9);
    assert_eq!(lending.collateral_token_balance(keeper).unwrap(), 1.0);
    assert_eq!(lending.lending_token_balance(keeper).unwrap(), 0.0);
    assert_eq!(lending.loan_state(borrower).unwrap(), LoanState::Closed);
}

#[test]
fn healthy_loans_cannot_be_liquidated() {
    let w = world();
    let lending = w.registry.lending("usdc_weth").unwrap();
    let (borrower, keeper) = (w.chain.create_account(), w.chain.create_account());

    lending.mint_collateral_token(1.0, borrower).unwrap();
    lending.provide_collateral(1.0, borrower).unwrap();
    lending.borrow(1_000.0, borrower).unwrap();
    lending.mint_lending_token(1_000.0, keeper).unwrap();

    assert!(matches!(
        lending.liquidate_loan(borrower, keeper),
        Err(Error::CollaboratorError { operation: "liquidate", .. })
    ));
    assert_eq!(lending.loan_state(borrower).unwrap(), LoanState::Borrowed);
}

#[test_case("1.25", None, 10_000.0 ; "default ratio at pool price")]
#[test_case("1.2501", None, 1_234.567891 ; "odd ratio at pool price")]
#[test_case("1.3333", Some(3_333.3333), 10_000.0 ; "odd ratio at fixed price")]
fn posting_the_quote_exactly_covers_the_borrow(ratio: &str, price: Option<f64>, borrow: f64) {
    let w = world_from(&CONFIG.replace(
        "collateral_ratio = 1.25",
        &format!("collateral_ratio = {ratio}"),
    ));
    let lending = w.registry.lending("usdc_weth").unwrap();
    if let Some(price) = price {
        lending.set_price_override(price).unwrap();
    }
    let (alice, bob) = (w.chain.create_account(), w.chain.create_account());

    let required = lending.collateral_required(borrow).unwrap();
    lending.mint_collateral_token(required, alice).unwrap();
    lending.provide_collateral(required, alice).unwrap();
    lending.borrow(borrow, alice).unwrap();
    assert!(lending.is_loan_healthy(alice).unwrap());

    let short = required - 1e-9;
    lending.mint_collateral_token(short, bob).unwrap();
    lending.provide_collateral(short, bob).unwrap();
    assert!(matches!(
        lending.borrow(borrow, bob),
        Err(Error::UndercollateralizedError { account, .. }) if account == bob
    ));
}
