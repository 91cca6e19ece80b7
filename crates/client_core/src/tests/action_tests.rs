use super::*;
use shared::domain::{AccountAddress, ComponentAddress};

fn settings() -> ControllerSettings {
    ControllerSettings {
        xrd_resource: ResourceAddress::new("xrd1"),
        ..ControllerSettings::default()
    }
}

fn connected_session() -> SessionState {
    SessionState {
        account: Some(AccountAddress::new("addr1")),
        component: Some(ComponentAddress::new("comp1")),
        admin_badge: Some(ResourceAddress::new("admin1")),
        owner_badge: Some(ResourceAddress::new("owner1")),
        ..SessionState::default()
    }
}

fn render(action: &Action, session: &SessionState) -> String {
    action
        .build_manifest(session, &settings())
        .expect("build")
        .expect("manifest")
        .to_manifest_string()
}

#[test]
fn instantiate_calls_blueprint_then_deposits_to_account() {
    let session = SessionState {
        account: Some(AccountAddress::new("addr1")),
        ..SessionState::default()
    };
    let action =
        Action::instantiate_gumball_machine(PackageAddress::new("pkg1"), Decimal::from(5), "BANANA");

    assert_eq!(
        render(&action, &session),
        concat!(
            "CALL_FUNCTION\n",
            "    Address(\"pkg1\")\n",
            "    \"GumballMachine\"\n",
            "    \"instantiate_gumball_machine\"\n",
            "    Decimal(\"5\")\n",
            "    \"BANANA\"\n",
            ";\n",
            "CALL_METHOD\n",
            "    Address(\"addr1\")\n",
            "    \"deposit_batch\"\n",
            "    Expression(\"ENTIRE_WORKTOP\")\n",
            ";\n",
        )
    );
}

#[test]
fn buy_moves_payment_through_a_bucket() {
    let action = Action::buy_gumball(Some(Decimal::from(33)));

    assert_eq!(
        render(&action, &connected_session()),
        concat!(
            "CALL_METHOD\n",
            "    Address(\"addr1\")\n",
            "    \"withdraw\"\n",
            "    Address(\"xrd1\")\n",
            "    Decimal(\"33\")\n",
            ";\n",
            "TAKE_ALL_FROM_WORKTOP\n",
            "    Address(\"xrd1\")\n",
            "    Bucket(\"bucket1\")\n",
            ";\n",
            "CALL_METHOD\n",
            "    Address(\"comp1\")\n",
            "    \"buy_gumball\"\n",
            "    Bucket(\"bucket1\")\n",
            ";\n",
            "CALL_METHOD\n",
            "    Address(\"addr1\")\n",
            "    \"deposit_batch\"\n",
            "    Expression(\"ENTIRE_WORKTOP\")\n",
            ";\n",
        )
    );
}

#[test]
fn buy_falls_back_to_session_price() {
    let session = SessionState {
        price: Some(Decimal::new(125, 1)),
        ..connected_session()
    };
    let text = render(&Action::buy_gumball(None), &session);
    assert!(text.contains("Decimal(\"12.5\")"), "{text}");
}

#[test]
fn buy_without_any_price_is_rejected_locally() {
    let err = Action::buy_gumball(None)
        .build_manifest(&connected_session(), &settings())
        .expect_err("no price");
    assert!(matches!(err, ActionError::MissingSession("price")));
}

#[test]
fn sell_uses_explicit_resource() {
    let action = Action::Invoke {
        method: "sell_gumball".into(),
        resource: Some(ResourceAddress::new("gum1")),
        amount: Some(Decimal::ONE),
    };
    let built = action
        .build_manifest(&connected_session(), &settings())
        .expect("build")
        .expect("manifest");
    assert_eq!(
        built.instructions()[1],
        manifest::Instruction::TakeAllFromWorktop {
            resource_address: "gum1".into(),
            bucket: "bucket1".into(),
        }
    );
}

#[test]
fn admin_actions_prove_the_right_badge_first() {
    let set_price = render(&Action::set_price(Decimal::from(7)), &connected_session());
    assert!(set_price.starts_with(concat!(
        "CALL_METHOD\n",
        "    Address(\"addr1\")\n",
        "    \"create_proof_of_amount\"\n",
        "    Address(\"admin1\")\n",
        "    Decimal(\"1\")\n",
        ";\n",
        "CALL_METHOD\n",
        "    Address(\"comp1\")\n",
        "    \"set_price\"\n",
        "    Decimal(\"7\")\n",
        ";\n",
    )));

    let withdraw = render(&Action::withdraw_earnings(), &connected_session());
    assert!(withdraw.contains("Address(\"owner1\")"));
    assert!(withdraw.contains("\"withdraw_earnings\"\n;"));
    assert!(withdraw.ends_with("Expression(\"ENTIRE_WORKTOP\")\n;\n"));
}

#[test]
fn admin_action_without_badge_fails_before_building() {
    let session = SessionState {
        owner_badge: None,
        ..connected_session()
    };
    let err = Action::mint_staff_badge("jo")
        .build_manifest(&session, &settings())
        .expect_err("no badge");
    assert!(matches!(err, ActionError::MissingSession("owner badge address")));
}

#[test]
fn manifest_construction_is_deterministic() {
    let session = connected_session();
    let action = Action::buy_gumball(Some(Decimal::from(33)));
    let first = action.build_manifest(&session, &settings()).expect("first");
    let second = action.build_manifest(&session, &settings()).expect("second");
    assert_eq!(first, second);
}

#[test]
fn rendered_manifest_is_stable_through_parse() {
    let text = render(&Action::set_price(Decimal::from(9)), &connected_session());
    let reparsed = manifest::parse_manifest(&text).expect("parse");
    assert_eq!(reparsed.to_manifest_string(), text);
}

#[test]
fn connect_and_query_sign_nothing() {
    let session = SessionState::default();
    assert!(Action::connect()
        .build_manifest(&session, &settings())
        .expect("connect")
        .is_none());
    assert!(Action::get_price(FieldSelector::Named("price".into()))
        .build_manifest(&session, &settings())
        .expect("query")
        .is_none());
}

#[test]
fn labels_name_the_called_method() {
    assert_eq!(Action::connect().label(), "connect");
    assert_eq!(Action::withdraw_earnings().label(), "withdraw_earnings");
    assert_eq!(
        Action::get_price(FieldSelector::Index(2)).label(),
        "query #2"
    );
}

#[tokio::test]
async fn dump_manifest_writes_rtm_file() {
    let dir = std::env::temp_dir().join(format!("gumball_dump_{}", std::process::id()));
    dump_manifest(&dir, "query price", "DROP_ALL_PROOFS;\n")
        .await
        .expect("dump");

    let written = tokio::fs::read_to_string(dir.join("query_price.rtm"))
        .await
        .expect("read");
    assert_eq!(written, "DROP_ALL_PROOFS;\n");
    tokio::fs::remove_dir_all(dir).await.expect("cleanup");
}
