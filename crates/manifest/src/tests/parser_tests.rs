use super::*;
use crate::ManifestBuilder;

fn buy_manifest() -> TransactionManifest {
    ManifestBuilder::new()
        .withdraw_from_account("addr1", "xrd1", Decimal::from(33))
        .take_all_from_worktop("xrd1", |builder, bucket| {
            builder.call_method("comp1", "buy_gumball", vec![bucket.into()])
        })
        .deposit_batch("addr1")
        .build()
}

#[test]
fn rendered_manifest_parses_back_to_the_same_instructions() {
    let manifest = buy_manifest();
    let text = manifest.to_manifest_string();

    let parsed = parse_manifest(&text).expect("parse");
    assert_eq!(parsed, manifest);
    assert_eq!(parsed.to_manifest_string(), text);
}

#[test]
fn accepts_compact_layout_and_comments() {
    let text = r#"
        # lock nothing, just call
        CALL_METHOD Address("comp1") "set_price" Decimal("7.25");
        CREATE_PROOF_FROM_AUTH_ZONE_OF_AMOUNT Address("badge1") Decimal("1") Proof("proof1");
        DROP_ALL_PROOFS;
    "#;

    let parsed = parse_manifest(text).expect("parse");
    assert_eq!(parsed.instructions().len(), 3);
    assert_eq!(
        parsed.instructions()[0],
        Instruction::CallMethod {
            address: "comp1".into(),
            method_name: "set_price".into(),
            args: vec![ManifestValue::Decimal("7.25".parse().expect("decimal"))],
        }
    );
    assert_eq!(parsed.instructions()[2], Instruction::DropAllProofs);
}

#[test]
fn parses_integer_suffixes_and_booleans() {
    let parsed = parse_manifest(r#"CALL_METHOD Address("c") "m" 5u8 7u32 9u64 -3i64 true;"#)
        .expect("parse");
    let Instruction::CallMethod { args, .. } = &parsed.instructions()[0] else {
        panic!("expected call method");
    };
    assert_eq!(
        args,
        &vec![
            ManifestValue::U8(5),
            ManifestValue::U32(7),
            ManifestValue::U64(9),
            ManifestValue::I64(-3),
            ManifestValue::Bool(true),
        ]
    );
}

#[test]
fn escaped_strings_survive_round_trip() {
    let manifest = ManifestBuilder::new()
        .call_method("comp1", "mint_staff_badge", vec!["Jo \"the\" clerk\n".into()])
        .build();
    let parsed = parse_manifest(&manifest.to_manifest_string()).expect("parse");
    assert_eq!(parsed, manifest);
}

#[test]
fn rejects_unknown_instruction() {
    let err = parse_manifest("BURN_EVERYTHING;").expect_err("must fail");
    assert_eq!(
        err,
        ParseError::UnknownInstruction {
            name: "BURN_EVERYTHING".into(),
            line: 1,
        }
    );
}

#[test]
fn rejects_missing_terminator() {
    let err = parse_manifest(r#"CALL_METHOD Address("comp1") "buy""#).expect_err("must fail");
    assert_eq!(err, ParseError::UnexpectedEnd);
}

#[test]
fn rejects_wrong_operand_kinds() {
    let err = parse_manifest(r#"TAKE_ALL_FROM_WORKTOP "xrd1" Bucket("b");"#).expect_err("must fail");
    assert!(matches!(
        err,
        ParseError::InvalidOperands {
            instruction: "TAKE_ALL_FROM_WORKTOP",
            ..
        }
    ));
}

#[test]
fn reports_line_of_bad_decimal() {
    let err = parse_manifest("DROP_ALL_PROOFS;\nASSERT_WORKTOP_CONTAINS Address(\"r\") Decimal(\"abc\");")
        .expect_err("must fail");
    assert_eq!(
        err,
        ParseError::InvalidDecimal {
            text: "abc".into(),
            line: 2,
        }
    );
}

#[test]
fn rejects_unknown_expression() {
    let err = parse_manifest(r#"CALL_METHOD Address("a") "deposit_batch" Expression("EVERYTHING");"#)
        .expect_err("must fail");
    assert!(matches!(err, ParseError::UnknownExpression { .. }));
}
