//! Scalar value synthesis
//!
//! Values are produced by the first rule whose matcher accepts the element or
//! attribute name and a type from the candidate chain. The chain is walked
//! most-specific first, and for each candidate every rule is tried in table
//! order. The enumeration rule is the catch-all and stays last.

use super::generator::{GeneratorFactory, GeneratorStream};
use super::value_path::ValuePath;
use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::schema::SchemaType;
use base64::Engine;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::trace;

/// Wire format of generated instants: `uuuuMMddHHmm` followed by the offset
pub const INSTANT_FORMAT: &str = "%Y%m%d%H%M%z";

/// Decides whether a rule applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueMatcher {
    /// Exact local name of the element or attribute
    Name(&'static str),
    /// Exact local name of the candidate type
    TypeName(&'static str),
    /// Candidate type has enumeration values
    Enumeration,
}

impl ValueMatcher {
    /// Whether this matcher accepts `name` with `candidate`
    pub fn matches(&self, name: &QName, candidate: &SchemaType) -> bool {
        match self {
            ValueMatcher::Name(expected) => name.local_name == *expected,
            ValueMatcher::TypeName(expected) => candidate.name.local_name == *expected,
            ValueMatcher::Enumeration => !candidate.enumeration_values.is_empty(),
        }
    }
}

/// How a matched value is produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueGenerator {
    /// Decimal repeat index, no stream draw
    RepeatIndex,
    /// Lowercase token of the given length
    Token(usize),
    /// Base64 of a lowercase token of the given length
    Base64Token(usize),
    /// `true` or `false`
    Boolean,
    /// Fixed text
    Literal(&'static str),
    /// Instant in the generator range, formatted with [`INSTANT_FORMAT`]
    Instant,
    /// Two-decimal number in `[0.00, 10.00)`
    Decimal,
    /// Integer in `[1000, 9999)`
    Integer,
    /// One of the candidate type's enumeration values
    Enumeration,
}

/// Matcher and generator pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRule {
    /// When the rule applies
    pub matcher: ValueMatcher,
    /// What it produces
    pub generator: ValueGenerator,
}

impl ValueRule {
    /// Create a rule
    pub const fn new(matcher: ValueMatcher, generator: ValueGenerator) -> Self {
        Self { matcher, generator }
    }
}

/// Rules for the consignment grammars, in evaluation order
pub const DEFAULT_RULES: &[ValueRule] = &[
    ValueRule::new(ValueMatcher::Name("schemeAgencyId"), ValueGenerator::Token(6)),
    ValueRule::new(ValueMatcher::Name("sequenceNumber"), ValueGenerator::RepeatIndex),
    ValueRule::new(ValueMatcher::TypeName("base64Binary"), ValueGenerator::Base64Token(6)),
    ValueRule::new(ValueMatcher::TypeName("boolean"), ValueGenerator::Boolean),
    ValueRule::new(ValueMatcher::TypeName("DateTimeFormat"), ValueGenerator::Literal("205")),
    ValueRule::new(ValueMatcher::TypeName("DateTime"), ValueGenerator::Instant),
    ValueRule::new(ValueMatcher::TypeName("decimal"), ValueGenerator::Decimal),
    ValueRule::new(ValueMatcher::TypeName("Identifier17"), ValueGenerator::Token(6)),
    ValueRule::new(ValueMatcher::TypeName("integer"), ValueGenerator::Integer),
    ValueRule::new(ValueMatcher::TypeName("string"), ValueGenerator::Token(4)),
    ValueRule::new(ValueMatcher::Enumeration, ValueGenerator::Enumeration),
];

/// Produces scalar text for a site
#[derive(Debug, Clone)]
pub struct ValueSynthesizer {
    factory: GeneratorFactory,
    rules: Vec<ValueRule>,
}

impl ValueSynthesizer {
    /// Synthesizer with [`DEFAULT_RULES`]
    pub fn new(factory: GeneratorFactory) -> Self {
        Self::with_rules(factory, DEFAULT_RULES.to_vec())
    }

    /// Synthesizer with a custom rule table
    pub fn with_rules(factory: GeneratorFactory, rules: Vec<ValueRule>) -> Self {
        Self { factory, rules }
    }

    /// The rule table
    pub fn rules(&self) -> &[ValueRule] {
        &self.rules
    }

    /// Text value for the site at `path`
    pub fn synthesize(
        &self,
        path: &ValuePath,
        repeat_index: u64,
        name: &QName,
        schema_type: &SchemaType,
    ) -> Result<String> {
        for candidate in schema_type.type_chain() {
            if let Some(rule) = self.rules.iter().find(|r| r.matcher.matches(name, candidate)) {
                let value = self.generate(&rule.generator, path, repeat_index, candidate)?;
                trace!(path = %path, value = %value, "synthesized value");
                return Ok(value);
            }
        }

        let chain: Vec<String> = schema_type
            .type_chain()
            .map(|t| t.name.local_name.clone())
            .collect();
        Err(Error::Synthesis(format!(
            "no value rule matches '{}' with type chain [{}]",
            name,
            chain.join(", ")
        )))
    }

    fn generate(
        &self,
        generator: &ValueGenerator,
        path: &ValuePath,
        repeat_index: u64,
        candidate: &SchemaType,
    ) -> Result<String> {
        let mut stream = self.factory.for_path(path);
        let value = match generator {
            ValueGenerator::RepeatIndex => repeat_index.to_string(),
            ValueGenerator::Token(length) => stream.next_token(*length),
            ValueGenerator::Base64Token(length) => {
                base64::engine::general_purpose::STANDARD.encode(stream.next_token(*length))
            }
            ValueGenerator::Boolean => stream.next_bool().to_string(),
            ValueGenerator::Literal(text) => (*text).to_string(),
            ValueGenerator::Instant => stream.next_instant().format(INSTANT_FORMAT).to_string(),
            ValueGenerator::Decimal => decimal_value(&mut stream),
            ValueGenerator::Integer => stream.next_int(1000, 9999).to_string(),
            ValueGenerator::Enumeration => stream
                .next_choice(&candidate.enumeration_values)
                .cloned()
                .ok_or_else(|| {
                    Error::Synthesis(format!("type '{}' has no enumeration values", candidate.name))
                })?,
        };
        Ok(value)
    }
}

/// Two decimals, truncated so the value never reaches 10.00
fn decimal_value(stream: &mut GeneratorStream) -> String {
    let raw = stream.next_double(0.0, 10.0);
    let value = Decimal::from_f64(raw)
        .unwrap_or_default()
        .round_dp_with_strategy(2, RoundingStrategy::ToZero);
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::loader::builtin_type;
    use crate::XSD_NAMESPACE;

    fn synthesizer() -> ValueSynthesizer {
        ValueSynthesizer::new(GeneratorFactory::new(42))
    }

    fn path() -> ValuePath {
        ValuePath::root("root").append_name("value").append_index(0)
    }

    fn named(local: &str, base: &str) -> SchemaType {
        SchemaType::scalar(QName::namespaced("urn:t", local))
            .with_base_types(builtin_type(base).unwrap().type_chain().cloned().collect())
    }

    fn synth(name: &str, ty: &SchemaType) -> Result<String> {
        synthesizer().synthesize(&path(), 3, &QName::local(name), ty)
    }

    #[test]
    fn test_name_rules_win_over_type_rules() {
        let integer = builtin_type("integer").unwrap();
        assert_eq!(synth("sequenceNumber", &integer).unwrap(), "3");

        let agency = synth("schemeAgencyId", &builtin_type("token").unwrap()).unwrap();
        assert_eq!(agency.len(), 6);
        assert!(agency.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_builtin_types() {
        let integer: i64 = synth("count", &builtin_type("integer").unwrap()).unwrap().parse().unwrap();
        assert!((1000..9999).contains(&integer));

        let flag = synth("flag", &builtin_type("boolean").unwrap()).unwrap();
        assert!(flag == "true" || flag == "false");

        let text = synth("note", &builtin_type("string").unwrap()).unwrap();
        assert_eq!(text.len(), 4);

        let binary = synth("blob", &builtin_type("base64Binary").unwrap()).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(binary).unwrap();
        assert_eq!(decoded.len(), 6);
    }

    #[test]
    fn test_decimal_format() {
        for seed in 0..200 {
            let value = ValueSynthesizer::new(GeneratorFactory::new(seed))
                .synthesize(&path(), 0, &QName::local("w"), &builtin_type("decimal").unwrap())
                .unwrap();
            let (whole, fraction) = value.split_once('.').unwrap();
            assert_eq!(fraction.len(), 2, "{}", value);
            assert!(whole.parse::<u32>().unwrap() < 10, "{}", value);
        }
    }

    #[test]
    fn test_named_types() {
        let format = named("DateTimeFormat", "token").with_enumeration(["102", "203", "205"]);
        assert_eq!(synth("formatId", &format).unwrap(), "205");

        let instant = synth("when", &named("DateTime", "string")).unwrap();
        assert_eq!(instant.len(), 17);
        assert!(instant.ends_with("+0000"));
        let year: i32 = instant[..4].parse().unwrap();
        assert!((2020..2040).contains(&year));

        assert_eq!(synth("id", &named("Identifier17", "token")).unwrap().len(), 6);
    }

    #[test]
    fn test_outer_loop_is_over_types() {
        // The enumeration rule on the most specific type beats the string rule on its base.
        let code = named("Code", "token").with_enumeration(["A", "B"]);
        let value = synth("code", &code).unwrap();
        assert!(value == "A" || value == "B");
    }

    #[test]
    fn test_deterministic_per_path() {
        let ty = builtin_type("string").unwrap();
        let a = synthesizer().synthesize(&path(), 0, &QName::local("x"), &ty).unwrap();
        let b = synthesizer().synthesize(&path(), 0, &QName::local("x"), &ty).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_matching_rule() {
        let ty = SchemaType::scalar(QName::namespaced(XSD_NAMESPACE, "anyURI"));
        assert!(matches!(synth("link", &ty), Err(Error::Synthesis(_))));
    }

    #[test]
    fn test_custom_rules() {
        let synthesizer = ValueSynthesizer::with_rules(
            GeneratorFactory::new(1),
            vec![ValueRule::new(ValueMatcher::Name("fixed"), ValueGenerator::Literal("x"))],
        );
        let ty = builtin_type("string").unwrap();
        assert_eq!(synthesizer.synthesize(&path(), 0, &QName::local("fixed"), &ty).unwrap(), "x");
        assert!(synthesizer.synthesize(&path(), 0, &QName::local("other"), &ty).is_err());
    }
}
