//! Transaction manifest model, builder and canonical text renderer.
//!
//! A manifest is an ordered list of instructions. Rendering is deterministic:
//! the same instruction list always produces the same text, and
//! [`parse_manifest`] reads that text back into an equal manifest.

use std::fmt;

use rust_decimal::Decimal;

mod parser;

pub use parser::{parse_manifest, ParseError};

const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestExpression {
    EntireWorktop,
    EntireAuthZone,
}

impl ManifestExpression {
    pub fn as_str(self) -> &'static str {
        match self {
            ManifestExpression::EntireWorktop => "ENTIRE_WORKTOP",
            ManifestExpression::EntireAuthZone => "ENTIRE_AUTH_ZONE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ENTIRE_WORKTOP" => Some(Self::EntireWorktop),
            "ENTIRE_AUTH_ZONE" => Some(Self::EntireAuthZone),
            _ => None,
        }
    }
}

/// Named handle for a bucket created by a worktop instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestBucket(pub String);

/// Named handle for a proof created in the auth zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestProof(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestValue {
    Address(String),
    Decimal(Decimal),
    String(String),
    Bool(bool),
    U8(u8),
    U32(u32),
    U64(u64),
    I64(i64),
    Bucket(String),
    Proof(String),
    Expression(ManifestExpression),
}

impl ManifestValue {
    pub fn address(address: impl fmt::Display) -> Self {
        Self::Address(address.to_string())
    }
}

impl fmt::Display for ManifestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestValue::Address(address) => write!(f, "Address({})", quote(address)),
            ManifestValue::Decimal(value) => write!(f, "Decimal(\"{}\")", value.normalize()),
            ManifestValue::String(text) => f.write_str(&quote(text)),
            ManifestValue::Bool(value) => write!(f, "{value}"),
            ManifestValue::U8(value) => write!(f, "{value}u8"),
            ManifestValue::U32(value) => write!(f, "{value}u32"),
            ManifestValue::U64(value) => write!(f, "{value}u64"),
            ManifestValue::I64(value) => write!(f, "{value}i64"),
            ManifestValue::Bucket(name) => write!(f, "Bucket({})", quote(name)),
            ManifestValue::Proof(name) => write!(f, "Proof({})", quote(name)),
            ManifestValue::Expression(expr) => write!(f, "Expression(\"{}\")", expr.as_str()),
        }
    }
}

impl From<Decimal> for ManifestValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<&str> for ManifestValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ManifestValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ManifestValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u8> for ManifestValue {
    fn from(value: u8) -> Self {
        Self::U8(value)
    }
}

impl From<u32> for ManifestValue {
    fn from(value: u32) -> Self {
        Self::U32(value)
    }
}

impl From<u64> for ManifestValue {
    fn from(value: u64) -> Self {
        Self::U64(value)
    }
}

impl From<i64> for ManifestValue {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<ManifestBucket> for ManifestValue {
    fn from(value: ManifestBucket) -> Self {
        Self::Bucket(value.0)
    }
}

impl From<ManifestProof> for ManifestValue {
    fn from(value: ManifestProof) -> Self {
        Self::Proof(value.0)
    }
}

impl From<ManifestExpression> for ManifestValue {
    fn from(value: ManifestExpression) -> Self {
        Self::Expression(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    CallFunction {
        package_address: String,
        blueprint_name: String,
        function_name: String,
        args: Vec<ManifestValue>,
    },
    CallMethod {
        address: String,
        method_name: String,
        args: Vec<ManifestValue>,
    },
    TakeAllFromWorktop {
        resource_address: String,
        bucket: String,
    },
    TakeFromWorktop {
        resource_address: String,
        amount: Decimal,
        bucket: String,
    },
    ReturnToWorktop {
        bucket: String,
    },
    AssertWorktopContains {
        resource_address: String,
        amount: Decimal,
    },
    CreateProofFromAuthZoneOfAmount {
        resource_address: String,
        amount: Decimal,
        proof: String,
    },
    DropAllProofs,
}

impl Instruction {
    pub fn keyword(&self) -> &'static str {
        match self {
            Instruction::CallFunction { .. } => "CALL_FUNCTION",
            Instruction::CallMethod { .. } => "CALL_METHOD",
            Instruction::TakeAllFromWorktop { .. } => "TAKE_ALL_FROM_WORKTOP",
            Instruction::TakeFromWorktop { .. } => "TAKE_FROM_WORKTOP",
            Instruction::ReturnToWorktop { .. } => "RETURN_TO_WORKTOP",
            Instruction::AssertWorktopContains { .. } => "ASSERT_WORKTOP_CONTAINS",
            Instruction::CreateProofFromAuthZoneOfAmount { .. } => {
                "CREATE_PROOF_FROM_AUTH_ZONE_OF_AMOUNT"
            }
            Instruction::DropAllProofs => "DROP_ALL_PROOFS",
        }
    }

    /// Operands in rendering order, including the leading address/name operands.
    pub fn operands(&self) -> Vec<ManifestValue> {
        match self {
            Instruction::CallFunction {
                package_address,
                blueprint_name,
                function_name,
                args,
            } => {
                let mut operands = vec![
                    ManifestValue::Address(package_address.clone()),
                    ManifestValue::String(blueprint_name.clone()),
                    ManifestValue::String(function_name.clone()),
                ];
                operands.extend(args.iter().cloned());
                operands
            }
            Instruction::CallMethod {
                address,
                method_name,
                args,
            } => {
                let mut operands = vec![
                    ManifestValue::Address(address.clone()),
                    ManifestValue::String(method_name.clone()),
                ];
                operands.extend(args.iter().cloned());
                operands
            }
            Instruction::TakeAllFromWorktop {
                resource_address,
                bucket,
            } => vec![
                ManifestValue::Address(resource_address.clone()),
                ManifestValue::Bucket(bucket.clone()),
            ],
            Instruction::TakeFromWorktop {
                resource_address,
                amount,
                bucket,
            } => vec![
                ManifestValue::Address(resource_address.clone()),
                ManifestValue::Decimal(*amount),
                ManifestValue::Bucket(bucket.clone()),
            ],
            Instruction::ReturnToWorktop { bucket } => vec![ManifestValue::Bucket(bucket.clone())],
            Instruction::AssertWorktopContains {
                resource_address,
                amount,
            } => vec![
                ManifestValue::Address(resource_address.clone()),
                ManifestValue::Decimal(*amount),
            ],
            Instruction::CreateProofFromAuthZoneOfAmount {
                resource_address,
                amount,
                proof,
            } => vec![
                ManifestValue::Address(resource_address.clone()),
                ManifestValue::Decimal(*amount),
                ManifestValue::Proof(proof.clone()),
            ],
            Instruction::DropAllProofs => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.keyword())?;
        for operand in self.operands() {
            writeln!(f, "{INDENT}{operand}")?;
        }
        f.write_str(";")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionManifest {
    instructions: Vec<Instruction>,
}

impl TransactionManifest {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Canonical text form handed to the wallet.
    pub fn to_manifest_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TransactionManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

/// Incremental, chainable manifest construction.
///
/// Bucket and proof names are allocated from per-builder counters, so two
/// builders fed the same calls produce identical manifests.
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    instructions: Vec<Instruction>,
    next_bucket: u32,
    next_proof: u32,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_function(
        mut self,
        package_address: impl fmt::Display,
        blueprint_name: &str,
        function_name: &str,
        args: Vec<ManifestValue>,
    ) -> Self {
        self.instructions.push(Instruction::CallFunction {
            package_address: package_address.to_string(),
            blueprint_name: blueprint_name.to_string(),
            function_name: function_name.to_string(),
            args,
        });
        self
    }

    pub fn call_method(
        mut self,
        address: impl fmt::Display,
        method_name: &str,
        args: Vec<ManifestValue>,
    ) -> Self {
        self.instructions.push(Instruction::CallMethod {
            address: address.to_string(),
            method_name: method_name.to_string(),
            args,
        });
        self
    }

    pub fn withdraw_from_account(
        self,
        account: impl fmt::Display,
        resource_address: impl fmt::Display,
        amount: Decimal,
    ) -> Self {
        self.call_method(
            account,
            "withdraw",
            vec![ManifestValue::address(resource_address), amount.into()],
        )
    }

    /// Puts a proof of `amount` of `resource_address` held by `account` in the auth zone.
    pub fn create_proof_from_account_of_amount(
        self,
        account: impl fmt::Display,
        resource_address: impl fmt::Display,
        amount: Decimal,
    ) -> Self {
        self.call_method(
            account,
            "create_proof_of_amount",
            vec![ManifestValue::address(resource_address), amount.into()],
        )
    }

    pub fn take_all_from_worktop<F>(mut self, resource_address: impl fmt::Display, then: F) -> Self
    where
        F: FnOnce(Self, ManifestBucket) -> Self,
    {
        let bucket = self.allocate_bucket();
        self.instructions.push(Instruction::TakeAllFromWorktop {
            resource_address: resource_address.to_string(),
            bucket: bucket.0.clone(),
        });
        then(self, bucket)
    }

    pub fn take_from_worktop<F>(
        mut self,
        resource_address: impl fmt::Display,
        amount: Decimal,
        then: F,
    ) -> Self
    where
        F: FnOnce(Self, ManifestBucket) -> Self,
    {
        let bucket = self.allocate_bucket();
        self.instructions.push(Instruction::TakeFromWorktop {
            resource_address: resource_address.to_string(),
            amount,
            bucket: bucket.0.clone(),
        });
        then(self, bucket)
    }

    pub fn return_to_worktop(mut self, bucket: ManifestBucket) -> Self {
        self.instructions
            .push(Instruction::ReturnToWorktop { bucket: bucket.0 });
        self
    }

    pub fn assert_worktop_contains(
        mut self,
        resource_address: impl fmt::Display,
        amount: Decimal,
    ) -> Self {
        self.instructions.push(Instruction::AssertWorktopContains {
            resource_address: resource_address.to_string(),
            amount,
        });
        self
    }

    pub fn create_proof_from_auth_zone_of_amount<F>(
        mut self,
        resource_address: impl fmt::Display,
        amount: Decimal,
        then: F,
    ) -> Self
    where
        F: FnOnce(Self, ManifestProof) -> Self,
    {
        self.next_proof += 1;
        let proof = ManifestProof(format!("proof{}", self.next_proof));
        self.instructions
            .push(Instruction::CreateProofFromAuthZoneOfAmount {
                resource_address: resource_address.to_string(),
                amount,
                proof: proof.0.clone(),
            });
        then(self, proof)
    }

    /// Sweeps everything left on the worktop into `account`.
    pub fn deposit_batch(self, account: impl fmt::Display) -> Self {
        self.call_method(
            account,
            "deposit_batch",
            vec![ManifestExpression::EntireWorktop.into()],
        )
    }

    pub fn drop_all_proofs(mut self) -> Self {
        self.instructions.push(Instruction::DropAllProofs);
        self
    }

    pub fn build(self) -> TransactionManifest {
        TransactionManifest::new(self.instructions)
    }

    fn allocate_bucket(&mut self) -> ManifestBucket {
        self.next_bucket += 1;
        ManifestBucket(format!("bucket{}", self.next_bucket))
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_instantiate_then_deposit() {
        let manifest = ManifestBuilder::new()
            .call_function(
                "pkg1",
                "GumballMachine",
                "instantiate_gumball_machine",
                vec![Decimal::from(5).into(), "BANANA".into()],
            )
            .deposit_batch("addr1")
            .build();

        assert_eq!(
            manifest.to_manifest_string(),
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
    fn bucket_names_are_allocated_in_order() {
        let manifest = ManifestBuilder::new()
            .take_all_from_worktop("xrd1", |builder, bucket| {
                assert_eq!(bucket, ManifestBucket("bucket1".into()));
                builder.return_to_worktop(bucket)
            })
            .take_from_worktop("xrd1", Decimal::ONE, |builder, bucket| {
                assert_eq!(bucket, ManifestBucket("bucket2".into()));
                builder.call_method("comp1", "deposit", vec![bucket.into()])
            })
            .build();

        assert_eq!(manifest.instructions().len(), 4);
    }

    #[test]
    fn decimals_render_without_trailing_zeros() {
        let value = ManifestValue::Decimal("33.500".parse().expect("decimal"));
        assert_eq!(value.to_string(), "Decimal(\"33.5\")");
    }

    #[test]
    fn strings_are_escaped() {
        let value = ManifestValue::from("say \"hi\"\\now");
        assert_eq!(value.to_string(), "\"say \\\"hi\\\"\\\\now\"");
    }

    #[test]
    fn rendering_twice_is_identical() {
        let manifest = ManifestBuilder::new()
            .create_proof_from_account_of_amount("addr1", "badge1", Decimal::ONE)
            .call_method("comp1", "withdraw_earnings", Vec::new())
            .deposit_batch("addr1")
            .build();
        assert_eq!(manifest.to_manifest_string(), manifest.to_manifest_string());
        assert_eq!(manifest.to_manifest_string(), manifest.to_string());
    }

    #[test]
    fn auth_zone_proofs_and_worktop_asserts_render_in_order() {
        let manifest = ManifestBuilder::new()
            .assert_worktop_contains("gum1", Decimal::from(2))
            .create_proof_from_auth_zone_of_amount("badge1", Decimal::ONE, |builder, proof| {
                assert_eq!(proof, ManifestProof("proof1".into()));
                builder.call_method("comp1", "mint_staff_badge", vec![proof.into()])
            })
            .drop_all_proofs()
            .build();

        assert_eq!(
            manifest.to_manifest_string(),
            concat!(
                "ASSERT_WORKTOP_CONTAINS\n",
                "    Address(\"gum1\")\n",
                "    Decimal(\"2\")\n",
                ";\n",
                "CREATE_PROOF_FROM_AUTH_ZONE_OF_AMOUNT\n",
                "    Address(\"badge1\")\n",
                "    Decimal(\"1\")\n",
                "    Proof(\"proof1\")\n",
                ";\n",
                "CALL_METHOD\n",
                "    Address(\"comp1\")\n",
                "    \"mint_staff_badge\"\n",
                "    Proof(\"proof1\")\n",
                ";\n",
                "DROP_ALL_PROOFS\n",
                ";\n",
            )
        );
        let reparsed = crate::parse_manifest(&manifest.to_manifest_string()).expect("parse");
        assert_eq!(reparsed, manifest);
    }
}
