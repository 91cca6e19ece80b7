use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use async_trait::async_trait;
use client_core::ControllerSettings;
use shared::protocol::{AccountsRequest, SendTransactionInput, WalletAccount, WalletData};
use wallet_integration::{WalletError, WalletMode};

#[derive(Default)]
struct CountingWallet {
    submitted: AtomicUsize,
}

#[async_trait]
impl WalletConnector for CountingWallet {
    fn mode(&self) -> WalletMode {
        WalletMode::OneShot
    }

    async fn request_accounts(&self, _request: &AccountsRequest) -> Result<WalletData, WalletError> {
        Ok(WalletData {
            accounts: vec![WalletAccount {
                address: AccountAddress::new("account_tdx_2_1main"),
                label: "Main".into(),
                appearance_id: 0,
            }],
            persona: None,
        })
    }

    async fn send_transaction(
        &self,
        _input: SendTransactionInput,
    ) -> Result<shared::domain::IntentHash, WalletError> {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        Err(WalletError::Sdk("submitted during a dry run".into()))
    }
}

fn controller(wallet: &Arc<CountingWallet>) -> InteractionController {
    InteractionController::new(
        wallet.clone(),
        Arc::new(MissingGateway),
        ControllerSettings::default(),
    )
}

#[test]
fn seed_flags_fill_the_session() {
    let cli = Cli::try_parse_from([
        "gumball",
        "--account",
        "account_tdx_2_1main",
        "--component",
        "component_tdx_2_1gum",
        "--admin-badge",
        "resource_tdx_2_1admin",
        "buy",
        "--owner-badge",
        "resource_tdx_2_1owner",
        "--amount",
        "33",
    ])
    .expect("parse");

    assert!(matches!(cli.command, Command::Buy { amount: Some(amount) } if amount == Decimal::from(33)));
    let session = cli.seed.into_session();
    assert_eq!(session.account, Some(AccountAddress::new("account_tdx_2_1main")));
    assert_eq!(session.component, Some(ComponentAddress::new("component_tdx_2_1gum")));
    assert_eq!(session.admin_badge, Some(ResourceAddress::new("resource_tdx_2_1admin")));
    assert_eq!(session.owner_badge, Some(ResourceAddress::new("resource_tdx_2_1owner")));
    assert_eq!(session.price, None);
}

#[test]
fn commands_map_to_actions() {
    let settings = Settings::default();
    let cases = [
        (Command::Connect, Action::connect()),
        (
            Command::Instantiate {
                package: "pkg1".into(),
                flavor: "BANANA".into(),
                price: Decimal::from(5),
            },
            Action::instantiate_gumball_machine(PackageAddress::new("pkg1"), Decimal::from(5), "BANANA"),
        ),
        (Command::Buy { amount: None }, Action::buy_gumball(None)),
        (
            Command::Sell {
                method: "sell_gumball".into(),
                resource: "gum1".into(),
                amount: Decimal::ONE,
            },
            Action::Invoke {
                method: "sell_gumball".into(),
                resource: Some(ResourceAddress::new("gum1")),
                amount: Some(Decimal::ONE),
            },
        ),
        (
            Command::SetPrice {
                price: Decimal::from(7),
            },
            Action::set_price(Decimal::from(7)),
        ),
        (Command::WithdrawEarnings, Action::withdraw_earnings()),
        (
            Command::MintStaffBadge { name: "Jo".into() },
            Action::mint_staff_badge("Jo"),
        ),
        (
            Command::GetPrice { field_index: None },
            Action::get_price(FieldSelector::Named("price".into())),
        ),
        (
            Command::GetPrice {
                field_index: Some(1),
            },
            Action::get_price(FieldSelector::Index(1)),
        ),
    ];
    for (command, expected) in cases {
        assert_eq!(to_action(&command, &settings), Some(expected), "{command:?}");
    }

    assert_eq!(to_action(&Command::Session, &settings), None);
    assert_eq!(to_action(&Command::Console, &settings), None);
}

#[test]
fn console_lines_honour_quotes() {
    let command = parse_console_line(r#"mint-staff-badge "Jo Smith""#).expect("parse");
    assert!(matches!(command, Command::MintStaffBadge { name } if name == "Jo Smith"));

    let command =
        parse_console_line(r#"instantiate --package pkg1 --flavor "BANANA""#).expect("parse");
    assert!(matches!(command, Command::Instantiate { flavor, .. } if flavor == "BANANA"));
}

#[test]
fn console_line_errors_are_classified() {
    let unbalanced = parse_console_line(r#"mint-staff-badge "Jo"#).expect_err("open quote");
    assert!(unbalanced.downcast_ref::<clap::Error>().is_none());

    let unknown = parse_console_line("launch-rocket").expect_err("unknown");
    assert!(unknown.downcast_ref::<clap::Error>().is_some());
}

#[tokio::test]
async fn dry_run_connects_then_previews() {
    let wallet = Arc::new(CountingWallet::default());
    let mut controller = controller(&wallet);

    let connected = run_action(&mut controller, Action::connect(), true)
        .await
        .expect("connect");
    assert_eq!(connected, None);
    assert_eq!(
        controller.session().account,
        Some(AccountAddress::new("account_tdx_2_1main"))
    );

    let text = run_action(
        &mut controller,
        Action::instantiate_gumball_machine(PackageAddress::new("pkg1"), Decimal::from(5), "BANANA"),
        true,
    )
    .await
    .expect("preview")
    .expect("manifest");
    assert!(text.starts_with("CALL_FUNCTION\n    Address(\"pkg1\")"));
    assert!(text.contains("Address(\"account_tdx_2_1main\")"));
    assert_eq!(wallet.submitted.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dry_run_previews_over_seeded_session() {
    let wallet = Arc::new(CountingWallet::default());
    let seed = SessionSeed {
        account: Some("account_tdx_2_1main".into()),
        component: Some("component_tdx_2_1gum".into()),
        ..SessionSeed::default()
    };
    let mut controller = controller(&wallet).with_session(seed.into_session());

    let text = run_action(&mut controller, Action::buy_gumball(Some(Decimal::from(33))), true)
        .await
        .expect("preview")
        .expect("manifest");

    assert!(text.contains("    Address(\"component_tdx_2_1gum\")\n    \"buy_gumball\"\n"));
    assert!(text.contains("Decimal(\"33\")"));
    assert_eq!(wallet.submitted.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn without_dry_run_the_wallet_is_asked_to_sign() {
    let wallet = Arc::new(CountingWallet::default());
    let seed = SessionSeed {
        account: Some("account_tdx_2_1main".into()),
        component: Some("component_tdx_2_1gum".into()),
        ..SessionSeed::default()
    };
    let mut controller = controller(&wallet).with_session(seed.into_session());

    let err = run_action(&mut controller, Action::buy_gumball(Some(Decimal::ONE)), false)
        .await
        .expect_err("wallet refuses");

    assert!(matches!(err, ActionError::Wallet(WalletError::Sdk(_))));
    assert_eq!(wallet.submitted.load(Ordering::SeqCst), 1);
}
