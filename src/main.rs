//! Command-line interface for xmlpopulate

#[cfg(feature = "cli")]
use clap::{ArgAction, CommandFactory, FromArgMatches, Parser, ValueEnum};

#[cfg(feature = "cli")]
use std::collections::BTreeSet;
#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use xmlpopulate::documents::Document;
#[cfg(feature = "cli")]
use xmlpopulate::populate::{DocumentPopulator, Override, RepeatablePopulateMode};
#[cfg(feature = "cli")]
use xmlpopulate::pruning::{common_to_identifiers, filter_subsets};
#[cfg(feature = "cli")]
use xmlpopulate::schema::{schema_has_subset, validate, BundledSchema, SchemaNode, SubsetId};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xmlpopulate")]
#[command(author, version, about = "Generate consignment sample documents", long_about = None)]
struct Cli {
    /// Seed to use, a short time-based seed by default. Identical seeds produce identical documents
    #[arg(short, long)]
    seed: Option<u64>,

    /// Schema to generate
    #[arg(short = 'x', long, value_enum, default_value_t = SchemaOption::Common)]
    schema: SchemaOption,

    /// How many instances of a repeatable element are generated
    #[arg(short, long, value_enum, default_value_t = RepeatablePopulateMode::MinimumOne)]
    repeatable_mode: RepeatablePopulateMode,

    /// Override in the form "<xpath-expression>:=<value>". Names may omit namespaces.
    /// Overrides are applied in the order given
    #[arg(short, long, value_name = "OVERRIDE")]
    text_overrides: Vec<Override>,

    /// Delete the nodes matched by an expression, in order with the text overrides
    #[arg(short, long, value_name = "XPATH", value_parser = parse_delete)]
    delete: Vec<Override>,

    /// Keep only elements in these subsets (comma separated)
    #[arg(long, value_delimiter = ',')]
    subsets: Vec<String>,

    /// Output file for the common document
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output file for the identifiers document
    #[arg(long)]
    output_identifiers: Option<PathBuf>,

    /// Overwrite existing files
    #[arg(short = 'w', long)]
    overwrite: bool,

    /// Pretty print
    #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
    pretty: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchemaOption {
    /// Common and identifiers documents
    Both,
    /// Common document
    Common,
    /// Identifiers document
    Identifier,
}

#[cfg(feature = "cli")]
impl SchemaOption {
    fn includes_common(&self) -> bool {
        matches!(self, SchemaOption::Both | SchemaOption::Common)
    }

    fn includes_identifier(&self) -> bool {
        matches!(self, SchemaOption::Both | SchemaOption::Identifier)
    }

    fn as_str(&self) -> &'static str {
        match self {
            SchemaOption::Both => "both",
            SchemaOption::Common => "common",
            SchemaOption::Identifier => "identifier",
        }
    }
}

#[cfg(feature = "cli")]
fn parse_delete(expression: &str) -> Result<Override, xmlpopulate::Error> {
    Override::delete_node(expression.trim())
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = Cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };
    let overrides = ordered_overrides(&matches, &cli);

    if let Err(e) = cmd_generate(cli, overrides) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Text overrides and deletions merged back into command-line order
#[cfg(feature = "cli")]
fn ordered_overrides(matches: &clap::ArgMatches, cli: &Cli) -> Vec<Override> {
    let mut ordered: Vec<(usize, Override)> = Vec::new();
    for (id, values) in [("text_overrides", &cli.text_overrides), ("delete", &cli.delete)] {
        if let Some(indices) = matches.indices_of(id) {
            ordered.extend(indices.zip(values.iter().cloned()));
        }
    }
    ordered.sort_by_key(|(index, _)| *index);
    ordered.into_iter().map(|(_, item)| item).collect()
}

#[cfg(feature = "cli")]
fn cmd_generate(cli: Cli, overrides: Vec<Override>) -> Result<(), Box<dyn std::error::Error>> {
    let seed = cli.seed.unwrap_or_else(random_short_seed);
    let path_common = cli.output.clone().or_else(|| {
        cli.schema
            .includes_common()
            .then(|| PathBuf::from(format!("consignment-{}-common.xml", seed)))
    });
    let path_identifiers = cli.output_identifiers.clone().or_else(|| {
        cli.schema
            .includes_identifier()
            .then(|| PathBuf::from(format!("consignment-{}-identifiers.xml", seed)))
    });
    let subsets = cli
        .subsets
        .iter()
        .map(SubsetId::new)
        .collect::<Result<BTreeSet<_>, _>>()?;

    println!("Generating with:");
    println!("  * schema: {}", cli.schema.as_str());
    println!("  * seed: {}", seed);
    println!("  * repeatable mode: {}", cli.repeatable_mode);
    let described: Vec<String> = overrides
        .iter()
        .map(|o| match o {
            Override::SetText { expression, value } => format!("Set \"{}\" to \"{}\"", expression, value),
            Override::DeleteNode { expression } => format!("Delete \"{}\"", expression),
        })
        .collect();
    println!("  * overrides: [{}]", described.join(", "));
    if !subsets.is_empty() {
        let names: Vec<&str> = subsets.iter().map(SubsetId::as_str).collect();
        println!("  * subsets: [{}]", names.join(", "));
    }
    if let Some(path) = &path_common {
        println!("  * output common: {}", path.display());
    }
    if let Some(path) = &path_identifiers {
        println!("  * output identifiers: {}", path.display());
    }
    println!("  * overwrite: {}", cli.overwrite);
    println!("  * pretty: {}", cli.pretty);

    if !cli.overwrite {
        for path in path_common.iter().chain(path_identifiers.iter()) {
            if path.exists() {
                return Err(format!("Output file {} already exists", path.display()).into());
            }
        }
    }

    let common = BundledSchema::ConsignmentCommon.load()?;
    let identifier = BundledSchema::ConsignmentIdentifier.load()?;
    for subset in &subsets {
        if !schema_has_subset(&common, subset) {
            tracing::warn!(%subset, "subset is not used by the consignment schema");
        }
    }

    let populator = DocumentPopulator::new(seed, cli.repeatable_mode);
    let populate_schema = if cli.schema.includes_common() {
        &common
    } else {
        &identifier
    };
    let doc = populator.populate_with_overrides(populate_schema, &overrides)?;

    let write = |schema: &SchemaNode,
                 doc: &Document,
                 path: Option<&PathBuf>|
     -> Result<(), Box<dyn std::error::Error>> {
        let path = path.ok_or("missing output path")?;
        validate_and_write(schema, doc, &subsets, path, cli.pretty)
    };

    match cli.schema {
        SchemaOption::Both => {
            let identifiers = common_to_identifiers(&doc)?;
            write(&common, &doc, path_common.as_ref())?;
            write(&identifier, &identifiers, path_identifiers.as_ref())?;
        }
        SchemaOption::Common => write(&common, &doc, path_common.as_ref())?,
        SchemaOption::Identifier => write(&identifier, &doc, path_identifiers.as_ref())?,
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn validate_and_write(
    schema: &SchemaNode,
    doc: &Document,
    subsets: &BTreeSet<SubsetId>,
    path: &Path,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(error) = validate(doc, schema) {
        return Err(format!(
            "Application produced an invalid document. Please report the parameters and this error message to the maintainers. Validation error: {}",
            error
        )
        .into());
    }

    let output = if subsets.is_empty() {
        doc.serialize(pretty)?
    } else {
        filter_subsets(doc, subsets, schema)?.serialize(pretty)?
    };
    fs::write(path, output)?;
    Ok(())
}

#[cfg(feature = "cli")]
fn random_short_seed() -> u64 {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    (millis % 100_000) as u64
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
