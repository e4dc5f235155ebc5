//! Path expression parser
//!
//! Compiles the restricted structural path language used by overrides:
//! child steps separated by `/`, `[N]` and `[@attr='value']` predicates, and
//! an optional trailing `@attr` or `text()` step.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::names::{is_valid_ncname, is_valid_qname, local_part};

static ATTRIBUTE_EQUALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^@\s*([^\s=]+)\s*=\s*(?:'([^']*)'|"([^"]*)")$"#)
        .expect("valid attribute predicate pattern")
});

/// Name test of a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// Local name; any prefix written in the expression is dropped
    Name(String),
    /// Wildcard test (*)
    Wildcard,
}

impl NodeTest {
    /// Parse a node test from a string
    pub fn parse(s: &str) -> Result<Self, XPathParseError> {
        let s = s.trim();
        if s == "*" {
            return Ok(Self::Wildcard);
        }
        if let Some(prefix) = s.strip_suffix(":*") {
            if is_valid_ncname(prefix) {
                return Ok(Self::Wildcard);
            }
        }
        if !is_valid_qname(s) {
            return Err(XPathParseError::InvalidSyntax(format!("invalid name '{}'", s)));
        }
        Ok(Self::Name(local_part(s).to_string()))
    }

    /// Whether a node with this local name passes the test
    pub fn matches(&self, local_name: &str) -> bool {
        match self {
            Self::Name(name) => local_part(local_name) == name,
            Self::Wildcard => true,
        }
    }
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Wildcard => f.write_str("*"),
        }
    }
}

/// Step predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// 1-based position among the step's matches under one parent
    Position(usize),
    /// Attribute equality test
    AttributeEquals {
        /// Attribute local name
        name: String,
        /// Expected value
        value: String,
    },
}

impl Predicate {
    /// Parse the text between the brackets
    pub fn parse(expression: &str) -> Result<Self, XPathParseError> {
        let trimmed = expression.trim();

        if let Ok(position) = trimmed.parse::<usize>() {
            if position == 0 {
                return Err(XPathParseError::InvalidSyntax(
                    "positions start at 1".to_string(),
                ));
            }
            return Ok(Self::Position(position));
        }

        if let Some(caps) = ATTRIBUTE_EQUALS.captures(trimmed) {
            let name = &caps[1];
            if !is_valid_qname(name) {
                return Err(XPathParseError::InvalidSyntax(format!(
                    "invalid attribute name '{}'",
                    name
                )));
            }
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            return Ok(Self::AttributeEquals {
                name: local_part(name).to_string(),
                value: value.to_string(),
            });
        }

        Err(XPathParseError::InvalidSyntax(format!(
            "unsupported predicate '[{}]'",
            expression
        )))
    }
}

/// Element step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Name test
    pub test: NodeTest,
    /// Predicates, applied left to right
    pub predicates: Vec<Predicate>,
}

/// What an expression selects once its element steps are evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The matched elements
    Element,
    /// The text nodes of the matched elements
    Text,
    /// An attribute of the matched elements
    Attribute(NodeTest),
}

/// Compiled path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    /// Original expression
    pub expression: String,
    /// Whether the expression starts with `/`
    pub is_absolute: bool,
    /// Element steps, the first one matching the document element
    pub steps: Vec<Step>,
    /// Final selection
    pub target: Target,
}

impl PathExpression {
    /// Compile an expression
    pub fn compile(expression: impl Into<String>) -> Result<Self, XPathParseError> {
        let expression = expression.into();
        let trimmed = expression.trim();
        let (is_absolute, path) = match trimmed.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let raw_steps = split_steps(path)?;
        let last = raw_steps.len().saturating_sub(1);
        let mut steps = Vec::new();
        let mut target = Target::Element;

        for (index, raw) in raw_steps.iter().enumerate() {
            let raw = raw.trim();
            let terminal = parse_terminal(raw)?;
            match terminal {
                Some(t) if index == last => target = t,
                Some(_) => {
                    return Err(XPathParseError::InvalidSyntax(format!(
                        "'{}' is only allowed as the last step",
                        raw
                    )))
                }
                None => steps.push(parse_step(raw)?),
            }
        }

        if steps.is_empty() {
            return Err(XPathParseError::InvalidSyntax(
                "expression must name at least one element".to_string(),
            ));
        }

        Ok(Self {
            expression,
            is_absolute,
            steps,
            target,
        })
    }

    /// Number of element steps
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Split on `/` outside predicates and quoted literals
fn split_steps(path: &str) -> Result<Vec<&str>, XPathParseError> {
    if path.trim().is_empty() {
        return Err(XPathParseError::UnexpectedEnd);
    }

    let mut steps = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in path.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') if depth > 0 => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    XPathParseError::InvalidSyntax("unbalanced ']'".to_string())
                })?;
            }
            (None, '/') if depth == 0 => {
                let step = &path[start..i];
                if step.trim().is_empty() {
                    return Err(XPathParseError::InvalidSyntax(
                        "empty step; descendant paths are not supported".to_string(),
                    ));
                }
                steps.push(step);
                start = i + 1;
            }
            _ => {}
        }
    }

    if quote.is_some() || depth > 0 {
        return Err(XPathParseError::UnexpectedEnd);
    }
    let step = &path[start..];
    if step.trim().is_empty() {
        return Err(XPathParseError::UnexpectedEnd);
    }
    steps.push(step);
    Ok(steps)
}

/// `text()` or an attribute step, `None` for element steps
fn parse_terminal(step: &str) -> Result<Option<Target>, XPathParseError> {
    if step == "text()" {
        return Ok(Some(Target::Text));
    }

    let attribute = match step.strip_prefix('@') {
        Some(name) => Some(name),
        None => step.strip_prefix("attribute::"),
    };
    if let Some(name) = attribute {
        if name.contains('[') {
            return Err(XPathParseError::InvalidSyntax(
                "predicates on attribute steps are not supported".to_string(),
            ));
        }
        return Ok(Some(Target::Attribute(NodeTest::parse(name)?)));
    }

    Ok(None)
}

fn parse_step(step: &str) -> Result<Step, XPathParseError> {
    let (name_part, rest) = match step.find('[') {
        Some(pos) => (&step[..pos], &step[pos..]),
        None => (step, ""),
    };

    let name_part = match name_part.find("::") {
        Some(pos) => {
            let axis = &name_part[..pos];
            if axis.trim() != "child" {
                return Err(XPathParseError::UnknownAxis(axis.to_string()));
            }
            &name_part[pos + 2..]
        }
        None => name_part,
    };

    Ok(Step {
        test: NodeTest::parse(name_part)?,
        predicates: extract_predicates(rest)?,
    })
}

fn extract_predicates(rest: &str) -> Result<Vec<Predicate>, XPathParseError> {
    let mut predicates = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in rest.chars() {
        match (quote, c) {
            (Some(q), _) => {
                if c == q {
                    quote = None;
                }
                current.push(c);
            }
            (None, '\'' | '"') if depth > 0 => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[') => {
                if depth > 0 {
                    return Err(XPathParseError::InvalidSyntax(
                        "nested predicates are not supported".to_string(),
                    ));
                }
                depth += 1;
            }
            (None, ']') => {
                depth = 0;
                predicates.push(Predicate::parse(&current)?);
                current.clear();
            }
            (None, _) if depth > 0 => current.push(c),
            (None, c) if c.is_whitespace() => {}
            (None, c) => {
                return Err(XPathParseError::InvalidSyntax(format!(
                    "unexpected '{}' after predicate",
                    c
                )))
            }
        }
    }

    Ok(predicates)
}

/// Path expression parse error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XPathParseError {
    /// Unknown or unsupported axis name
    UnknownAxis(String),
    /// Invalid syntax
    InvalidSyntax(String),
    /// Unexpected end of expression
    UnexpectedEnd,
}

impl fmt::Display for XPathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAxis(axis) => write!(f, "Unsupported XPath axis: {}", axis),
            Self::InvalidSyntax(msg) => write!(f, "Invalid XPath syntax: {}", msg),
            Self::UnexpectedEnd => write!(f, "Unexpected end of XPath expression"),
        }
    }
}

impl std::error::Error for XPathParseError {}
