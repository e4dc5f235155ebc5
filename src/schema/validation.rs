//! Document validation against a schema tree
//!
//! Checks a populated (or parsed) document against the grammar it was built
//! from: root name, child order and cardinality over the flattened content
//! model, declared attributes, mixed text and scalar values.

use super::{SchemaNode, SchemaType};
use crate::documents::{Document, Element};
use crate::error::{Error, Result, ValidationError};
use crate::XSD_NAMESPACE;
use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

static DATETIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d{4,}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
        .expect("valid dateTime pattern")
});

/// Validate `doc` against `schema`, returning the first problem found
pub fn validate(doc: &Document, schema: &SchemaNode) -> Option<String> {
    check(doc, schema).err().map(|e| match e {
        Error::Validation(v) => v.to_string(),
        other => other.to_string(),
    })
}

/// Validate `doc` against `schema`
pub fn check(doc: &Document, schema: &SchemaNode) -> Result<()> {
    if doc.root.qname != schema.name {
        return Err(ValidationError::new(format!(
            "Unexpected root element '{}'",
            doc.root.qname
        ))
        .with_reason(format!("expected '{}'", schema.name))
        .with_path("/")
        .into());
    }
    let path = format!("/{}", doc.root.local_name());
    check_element(&doc.root, schema, &path)
}

fn check_element(element: &Element, schema: &SchemaNode, path: &str) -> Result<()> {
    let ty = &schema.schema_type;

    for (name, value) in &element.attributes {
        if name.namespace.is_none()
            && (name.local_name == "xmlns" || name.local_name.starts_with("xmlns:"))
        {
            continue;
        }
        let declared = ty
            .attributes
            .iter()
            .find(|a| a.name.local_name == name.local_name)
            .ok_or_else(|| {
                ValidationError::new(format!("Undeclared attribute '{}'", name))
                    .with_path(path)
            })?;
        check_value(value, &declared.schema_type).map_err(|reason| {
            ValidationError::new(format!("Invalid value for attribute '{}'", name))
                .with_reason(reason)
                .with_path(format!("{}/@{}", path, name.local_name))
        })?;
    }

    if ty.is_scalar {
        if element.child_elements().next().is_some() {
            return Err(ValidationError::new(format!(
                "Element '{}' has simple content but contains child elements",
                element.local_name()
            ))
            .with_path(path)
            .into());
        }
        let text = element.text().unwrap_or_default();
        return check_value(&text, ty).map_err(|reason| {
            ValidationError::new(format!("Invalid value for element '{}'", element.local_name()))
                .with_reason(reason)
                .with_path(path)
                .into()
        });
    }

    if element.text().is_some_and(|t| !t.trim().is_empty()) {
        return Err(ValidationError::new(format!(
            "Element '{}' has element-only content but contains text",
            element.local_name()
        ))
        .with_path(path)
        .into());
    }

    let children: Vec<&Element> = element.child_elements().collect();
    let mut position = 0;
    for expected in &schema.children {
        let start = position;
        while position < children.len() && children[position].qname == expected.name {
            let child_path = format!(
                "{}/{}[{}]",
                path,
                expected.name.local_name,
                position - start + 1
            );
            check_element(children[position], expected, &child_path)?;
            position += 1;
        }

        let count = (position - start) as u64;
        if !expected.cardinality.allows(count) {
            return Err(ValidationError::new(format!(
                "Element '{}' occurs {} times",
                expected.name.local_name, count
            ))
            .with_reason(format!("allowed occurrences are {}", expected.cardinality))
            .with_path(path)
            .into());
        }
    }

    if let Some(unexpected) = children.get(position) {
        return Err(ValidationError::new(format!(
            "Unexpected child element '{}'",
            unexpected.qname
        ))
        .with_path(path)
        .into());
    }

    Ok(())
}

fn check_value(value: &str, ty: &SchemaType) -> std::result::Result<(), String> {
    if !ty.enumeration_values.is_empty() && !ty.enumeration_values.iter().any(|v| v == value) {
        return Err(format!(
            "'{}' is not one of [{}]",
            value,
            ty.enumeration_values.join(", ")
        ));
    }

    for candidate in ty.type_chain() {
        if candidate.name.namespace.as_deref() == Some(XSD_NAMESPACE) {
            check_builtin(value, &candidate.name.local_name)?;
        }
    }
    Ok(())
}

fn check_builtin(value: &str, builtin: &str) -> std::result::Result<(), String> {
    let trimmed = value.trim();
    let valid = match builtin {
        "boolean" => matches!(trimmed, "true" | "false" | "1" | "0"),
        "decimal" => trimmed.parse::<Decimal>().is_ok(),
        "integer" | "long" | "int" | "short" => trimmed.parse::<i64>().is_ok(),
        "nonNegativeInteger" => trimmed.parse::<u64>().is_ok(),
        "positiveInteger" => trimmed.parse::<u64>().is_ok_and(|v| v > 0),
        "nonPositiveInteger" => trimmed.parse::<i64>().is_ok_and(|v| v <= 0),
        "float" | "double" => trimmed.parse::<f64>().is_ok(),
        "base64Binary" => base64::engine::general_purpose::STANDARD
            .decode(trimmed.replace(' ', ""))
            .is_ok(),
        "dateTime" => is_valid_datetime(trimmed),
        "date" => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok(),
        "normalizedString" => !value.contains(['\n', '\r', '\t']),
        "token" => {
            !value.contains(['\n', '\r', '\t'])
                && !value.starts_with(' ')
                && !value.ends_with(' ')
                && !value.contains("  ")
        }
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid xs:{}", value, builtin))
    }
}

fn is_valid_datetime(value: &str) -> bool {
    DATETIME_PATTERN
        .captures(value)
        .and_then(|caps| caps.get(1))
        .is_some_and(|base| NaiveDateTime::parse_from_str(base.as_str(), "%Y-%m-%dT%H:%M:%S").is_ok())
}
