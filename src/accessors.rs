//! Accessor companions for union aliases.
//!
//! For `pub type Payment = OneOf2<Card, Bank>;` in `billing.rs` the
//! synthesizer renders `billing_payment_accessors.rs` next to it, containing a
//! borrowed `PaymentRef<'a>` view, a `PaymentAccessors` trait implemented for
//! the alias, and `payment_from_card` / `payment_from_bank` constructors.
//! The choice type is expected to be `Default` and to hold its alternatives
//! in `first`..`fourth` `Option` slots. The companion is a child module of the
//! alias's file (`mod billing_payment_accessors;`).

use crate::case::{to_pascal_case, to_snake_case};
use crate::catalog::{Catalog, TypeDefinition};
use crate::error::{Error, Result};
use crate::type_expr::TypeExpr;
use log::{debug, info};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const SLOTS: [&str; 4] = ["first", "second", "third", "fourth"];

const FILE_TEMPLATE: &str = "\
// Code generated by apicontract. DO NOT EDIT.
// Accessors for the {alias} union.

use super::*;

/// Borrowed view of the alternative held by a [`{alias}`].
#[derive(Debug, Clone, Copy)]
pub enum {alias}Ref<'a> {
{variants}}

/// Per-alternative accessors for [`{alias}`].
pub trait {alias}Accessors {
{signatures}
    /// The first alternative present, in declared order.
    fn value(&self) -> Option<{alias}Ref<'_>>;
}

impl {alias}Accessors for {alias} {
{methods}
    fn value(&self) -> Option<{alias}Ref<'_>> {
{value_arms}        None
    }
}
{constructors}";

const VARIANT_TEMPLATE: &str = "    {variant}(&'a {ty}),\n";

const SIGNATURE_TEMPLATE: &str = "    fn is_{label}(&self) -> bool;
    fn {label}(&self) -> Option<&{ty}>;
    /// Stores `value`, clearing every other alternative.
    fn set_{label}(&mut self, value: {ty});
";

const METHOD_TEMPLATE: &str = "    fn is_{label}(&self) -> bool {
        self.{slot}.is_some()
    }

    fn {label}(&self) -> Option<&{ty}> {
        self.{slot}.as_ref()
    }

    fn set_{label}(&mut self, value: {ty}) {
{clears}        self.{slot} = Some(value);
    }
";

const CLEAR_TEMPLATE: &str = "        self.{slot} = None;\n";

const VALUE_ARM_TEMPLATE: &str = "        if let Some(value) = &self.{slot} {
            return Some({alias}Ref::{variant}(value));
        }
";

const CONSTRUCTOR_TEMPLATE: &str = "
/// A [`{alias}`] holding `value`.
pub fn {alias_snake}_from_{label}(value: {ty}) -> {alias} {
    let mut union = {alias}::default();
    union.set_{label}(value);
    union
}
";

/// A rendered companion source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub alias: String,
    pub contents: String,
}

impl GeneratedFile {
    /// Writes the file, replacing any previous version.
    pub fn write(&self) -> Result<()> {
        fs::write(&self.path, &self.contents).map_err(|e| Error::io(&self.path, e))?;
        info!("Wrote accessors for {} to {}", self.alias, self.path.display());
        Ok(())
    }
}

struct Alternative {
    label: String,
    variant: String,
    ty: String,
    slot: &'static str,
}

/// Renders accessor companions for every union alias in a catalog.
#[derive(Debug, Default)]
pub struct AccessorSynthesizer;

impl AccessorSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Companions for all union aliases, sorted by alias name.
    pub fn render_all(&self, catalog: &Catalog) -> Vec<GeneratedFile> {
        catalog
            .union_aliases()
            .iter()
            .filter_map(|alias| self.render(alias))
            .collect()
    }

    /// The companion for one union alias; `None` for other definitions.
    pub fn render(&self, alias: &TypeDefinition) -> Option<GeneratedFile> {
        let union = alias.union.as_ref()?;
        debug!("Rendering accessors for {}", alias.name);

        let alternatives = alternatives(&union.alternatives);
        let alias_snake = to_snake_case(&alias.name);

        let mut variants = String::new();
        let mut signatures = String::new();
        let mut methods = String::new();
        let mut value_arms = String::new();
        let mut constructors = String::new();

        for (index, alt) in alternatives.iter().enumerate() {
            let vars = [
                ("alias", alias.name.as_str()),
                ("alias_snake", alias_snake.as_str()),
                ("label", alt.label.as_str()),
                ("variant", alt.variant.as_str()),
                ("ty", alt.ty.as_str()),
                ("slot", alt.slot),
            ];
            let clears: String = alternatives
                .iter()
                .filter(|other| other.slot != alt.slot)
                .map(|other| render(CLEAR_TEMPLATE, &[("slot", other.slot)]))
                .collect();

            variants.push_str(&render(VARIANT_TEMPLATE, &vars));
            signatures.push_str(&render(SIGNATURE_TEMPLATE, &vars));
            if index > 0 {
                methods.push('\n');
            }
            methods.push_str(&render(
                &render(METHOD_TEMPLATE, &[("clears", clears.as_str())]),
                &vars,
            ));
            value_arms.push_str(&render(VALUE_ARM_TEMPLATE, &vars));
            constructors.push_str(&render(CONSTRUCTOR_TEMPLATE, &vars));
        }

        let contents = render(
            FILE_TEMPLATE,
            &[
                ("variants", variants.as_str()),
                ("signatures", signatures.as_str()),
                ("methods", methods.as_str()),
                ("value_arms", value_arms.as_str()),
                ("constructors", constructors.as_str()),
                ("alias", alias.name.as_str()),
            ],
        );

        Some(GeneratedFile {
            path: companion_path(&alias.location.file, &alias.name),
            alias: alias.name.clone(),
            contents,
        })
    }
}

/// `src/billing.rs` + `Payment` -> `src/billing_payment_accessors.rs`
pub fn companion_path(source: &Path, alias: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = format!("{}_{}_accessors.rs", stem, to_snake_case(alias));
    match source.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

fn alternatives(types: &[TypeExpr]) -> Vec<Alternative> {
    let mut seen = HashSet::new();
    types
        .iter()
        .zip(SLOTS)
        .enumerate()
        .map(|(index, (ty, slot))| {
            let mut label = label(ty).unwrap_or_else(|| format!("alternative_{}", index + 1));
            if !seen.insert(label.clone()) {
                label = format!("{}_{}", label, index + 1);
                seen.insert(label.clone());
            }
            Alternative {
                variant: to_pascal_case(&label),
                label,
                ty: ty.to_string(),
                slot,
            }
        })
        .collect()
}

/// Method label of an alternative: `Card` -> `card`, `Vec<Card>` -> `card_list`.
fn label(ty: &TypeExpr) -> Option<String> {
    let (inner, _) = ty.unwrap_optional();
    match inner {
        TypeExpr::Sequence(item) => label(item).map(|l| format!("{}_list", l)),
        TypeExpr::Map { value, .. } => label(value).map(|l| format!("{}_map", l)),
        other => other.named().map(to_snake_case),
    }
}

fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{}}}", key), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AliasKind;
    use crate::union::UnionDescriptor;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn payment(file: &Path) -> TypeDefinition {
        let aliased = TypeExpr::parse("OneOf3<Card, Box<BankTransfer>, Vec<Voucher>>").unwrap();
        let mut def = TypeDefinition::alias("Payment", "billing", AliasKind::Union, aliased.clone());
        def.union = UnionDescriptor::detect(&aliased, "OneOf");
        def.location.file = file.to_path_buf();
        def
    }

    #[test]
    fn test_companion_path() {
        assert_eq!(
            companion_path(Path::new("src/billing.rs"), "PaymentMethod"),
            PathBuf::from("src/billing_payment_method_accessors.rs")
        );
    }

    #[test]
    fn test_render_union_accessors() {
        let file = AccessorSynthesizer::new()
            .render(&payment(Path::new("src/billing.rs")))
            .unwrap();
        let code = &file.contents;

        assert_eq!(file.path, PathBuf::from("src/billing_payment_accessors.rs"));
        assert!(code.starts_with("// Code generated by apicontract. DO NOT EDIT."));
        assert!(code.contains("pub enum PaymentRef<'a> {\n    Card(&'a Card),\n    BankTransfer(&'a Box<BankTransfer>),\n    VoucherList(&'a Vec<Voucher>),\n}"));
        assert!(code.contains("pub trait PaymentAccessors {"));
        assert!(code.contains("impl PaymentAccessors for Payment {"));
        assert!(code.contains("fn is_card(&self) -> bool {\n        self.first.is_some()\n    }"));
        assert!(code.contains("fn voucher_list(&self) -> Option<&Vec<Voucher>> {\n        self.third.as_ref()\n    }"));
        assert!(code.contains(
            "fn set_bank_transfer(&mut self, value: Box<BankTransfer>) {\n        self.first = None;\n        self.third = None;\n        self.second = Some(value);\n    }"
        ));
        assert!(code.contains("pub fn payment_from_card(value: Card) -> Payment {"));
        assert!(code.contains("pub fn payment_from_voucher_list(value: Vec<Voucher>) -> Payment {"));

        let first_arm = code.find("PaymentRef::Card(value)").unwrap();
        let last_arm = code.find("PaymentRef::VoucherList(value)").unwrap();
        assert!(first_arm < last_arm);
        assert!(!code.contains("{alias}") && !code.contains("{label}"));
    }

    #[test]
    fn test_duplicate_alternatives_get_distinct_labels() {
        let labels: Vec<_> = alternatives(&[
            TypeExpr::parse("Card").unwrap(),
            TypeExpr::parse("Option<Card>").unwrap(),
        ])
        .into_iter()
        .map(|a| a.label)
        .collect();
        assert_eq!(labels, vec!["card", "card_2"]);
    }

    #[test]
    fn test_non_unions_are_skipped() {
        let def = TypeDefinition::record("User", "models");
        assert!(AccessorSynthesizer::new().render(&def).is_none());
    }

    #[test]
    fn test_write_companion() {
        let temp_dir = TempDir::new().unwrap();
        let file = AccessorSynthesizer::new()
            .render(&payment(&temp_dir.path().join("billing.rs")))
            .unwrap();
        file.write().unwrap();

        let written = fs::read_to_string(temp_dir.path().join("billing_payment_accessors.rs")).unwrap();
        assert_eq!(written, file.contents);
    }
}
