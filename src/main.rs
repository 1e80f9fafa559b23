//! xmap CLI - format, check and round-trip XML documents against a mapping schema.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;

use xmap::prelude::*;
use xmap::schema::SchemaFile;

/// xmap - object graph and XML mapping tool
#[derive(Parser)]
#[command(name = "xmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-indent an XML document
    Fmt {
        /// Input XML file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Spaces per level; 0 writes compact output
        #[arg(long, default_value_t = 2)]
        indent: usize,
    },

    /// Read a document against a schema and report every mapping problem
    Check {
        /// JSON schema file
        #[arg(short, long, env = "XMAP_SCHEMA")]
        schema: PathBuf,

        /// Input XML file
        #[arg(short, long)]
        input: PathBuf,

        /// Root type name (defaults to the schema's root)
        #[arg(short, long)]
        root: Option<String>,

        /// JSON serializer options file
        #[arg(long, env = "XMAP_OPTIONS")]
        options: Option<PathBuf>,
    },

    /// Read a document against a schema and write it back out
    Roundtrip {
        /// JSON schema file
        #[arg(short, long, env = "XMAP_SCHEMA")]
        schema: PathBuf,

        /// Input XML file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Root type name (defaults to the schema's root)
        #[arg(short, long)]
        root: Option<String>,

        /// JSON serializer options file
        #[arg(long, env = "XMAP_OPTIONS")]
        options: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fmt { input, output, indent } => {
            cmd_fmt(&input, output.as_deref(), indent)?;
        }
        Commands::Check { schema, input, root, options } => {
            cmd_check(&schema, &input, root.as_deref(), options.as_deref())?;
        }
        Commands::Roundtrip { schema, input, output, root, options } => {
            cmd_roundtrip(&schema, &input, output.as_deref(), root.as_deref(), options.as_deref())?;
        }
    }

    Ok(())
}

fn cmd_fmt(input: &Path, output: Option<&Path>, indent: usize) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let doc = Document::parse(&text).context("Failed to parse XML")?;

    let options = WriteOptions {
        indent: (indent > 0).then_some(indent),
        declaration: true,
    };
    let xml = doc.to_xml_string(&options)?;
    write_output(output, &xml)
}

fn cmd_check(
    schema: &Path,
    input: &Path,
    root: Option<&str>,
    options: Option<&Path>,
) -> Result<()> {
    let mut options = load_options(options)?;
    options.exception_policy = ExceptionPolicy::DoNotThrow;
    let mut serializer = load_serializer(schema, root, options)?;

    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let start = Instant::now();
    let value = serializer.deserialize(&text)?;
    debug!("read {} in {:?}", input.display(), start.elapsed());

    for entry in serializer.errors() {
        println!("{}", entry);
    }
    let errors = serializer.errors().errors().count();
    let warnings = serializer.errors().warnings().count();
    println!("{}: {} error(s), {} warning(s)", input.display(), errors, warnings);

    if value.is_none() || errors > 0 {
        bail!("{} does not match the schema", input.display());
    }
    Ok(())
}

fn cmd_roundtrip(
    schema: &Path,
    input: &Path,
    output: Option<&Path>,
    root: Option<&str>,
    options: Option<&Path>,
) -> Result<()> {
    let options = load_options(options)?;
    let mut serializer = load_serializer(schema, root, options)?;

    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let value = serializer
        .deserialize(&text)
        .context("Failed to read document")?
        .ok_or_else(|| anyhow!("{} is not a well-formed document", input.display()))?;
    for entry in serializer.errors() {
        eprintln!("{}", entry);
    }

    let xml = serializer.serialize(&value).context("Failed to write document")?;
    for entry in serializer.errors() {
        eprintln!("{}", entry);
    }
    write_output(output, &xml)
}

fn load_options(path: Option<&Path>) -> Result<SerializerOptions> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            SerializerOptions::from_json(&json).context("Failed to parse serializer options")
        }
        None => Ok(SerializerOptions::default()),
    }
}

fn load_serializer(
    schema: &Path,
    root: Option<&str>,
    options: SerializerOptions,
) -> Result<XmlSerializer> {
    let json = fs::read_to_string(schema)
        .with_context(|| format!("Failed to read {}", schema.display()))?;
    let file = SchemaFile::from_json(&json).context("Failed to parse schema file")?;
    let registry = file.build().context("Invalid schema")?;

    let root_type = match root {
        Some(name) => registry
            .resolve_type_name(name)
            .ok_or_else(|| anyhow!("Unknown root type '{}'", name))?,
        None => file
            .root_type(&registry)?
            .ok_or_else(|| anyhow!("The schema names no root type; pass --root"))?,
    };
    debug!("root type {}", root_type);

    Ok(XmlSerializer::new(Arc::new(registry), root_type).with_options(options))
}

fn write_output(output: Option<&Path>, xml: &str) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, xml).with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(xml.as_bytes())?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
