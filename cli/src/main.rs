use std::path::{Path, PathBuf};
use std::rc::Rc;

use apispec_core::{FieldDescriptor, ModelLookup, ModelRegistry, ModelType, Validator, compile_model};
use apispec_document::{Document, DocumentFormat, LoadConfig, RequiredPolicy, parse_text};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Yaml,
    Json,
}

impl From<CliOutputFormat> for DocumentFormat {
    fn from(fmt: CliOutputFormat) -> Self {
        match fmt {
            CliOutputFormat::Yaml => Self::Yaml,
            CliOutputFormat::Json => Self::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "apispec", version)]
#[command(about = "Compile and validate Swagger API documents")]
struct Cli {
    #[command(flatten)]
    load: LoadArgs,
    /// Log progress and resolution details to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct LoadArgs {
    /// Load configuration YAML file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Fail on missing required attributes instead of warning.
    #[arg(long, global = true)]
    strict: bool,
    /// Do not follow `#include:` directives.
    #[arg(long, global = true)]
    no_includes: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a document, merge its includes and write the compiled result.
    Compile(CompileArgs),
    /// Check that documents load and every reference resolves.
    Validate(ValidateArgs),
    /// Show the fields of one compiled definition, or of a standalone schema file.
    Model(ModelArgs),
    /// List the files merged through include directives.
    Includes(IncludesArgs),
}

#[derive(Debug, Args)]
struct CompileArgs {
    /// Root document.
    input: PathBuf,
    /// Output file (stdout when omitted).
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Output format (default: from the output extension, else yaml).
    #[arg(long)]
    format: Option<CliOutputFormat>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Root documents to check.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct ModelArgs {
    /// Root document, or a schema file when no name is given.
    input: PathBuf,
    /// Definition name to look up in the document.
    name: Option<String>,
    /// Also build and print the instances from the schema's examples.
    #[arg(long)]
    examples: bool,
}

#[derive(Debug, Args)]
struct IncludesArgs {
    /// Root document.
    input: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(&cli.load).and_then(|config| match cli.command {
        Command::Compile(args) => run_compile(args, config),
        Command::Validate(args) => run_validate(args, config),
        Command::Model(args) => run_model(args, config),
        Command::Includes(args) => run_includes(args, config),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_config(args: &LoadArgs) -> Result<LoadConfig, String> {
    let mut config = match &args.config {
        Some(path) => LoadConfig::load(path)
            .map_err(|e| format!("failed to read config {}: {e}", path.display()))?,
        None => LoadConfig::default(),
    };
    if args.strict {
        config.required_fields = RequiredPolicy::Error;
    }
    if args.no_includes {
        config.includes.enabled = false;
    }
    tracing::debug!(?config, "Load configuration");
    Ok(config)
}

fn load(path: &Path, config: LoadConfig) -> Result<Document, String> {
    Document::from_path(path, config).map_err(|e| format!("{}: {e}", path.display()))
}

fn run_compile(args: CompileArgs, config: LoadConfig) -> Result<(), String> {
    let document = load(&args.input, config)?;
    let format = match (args.format, &args.output) {
        (Some(format), _) => format.into(),
        (None, Some(path)) => DocumentFormat::from_path(path),
        (None, None) => DocumentFormat::Yaml,
    };
    let text = document.render(format).map_err(|e| e.to_string())?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, text)
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            eprintln!(
                "Compiled {} ({} definition(s), {} include(s)) -> {}",
                args.input.display(),
                document.models().len(),
                document.includes().len(),
                path.display()
            );
        }
        None => print!("{text}"),
    }

    for failure in document.failures() {
        eprintln!("warning: unresolved reference {}: {}", failure.pointer, failure.error);
    }
    Ok(())
}

fn run_validate(args: ValidateArgs, config: LoadConfig) -> Result<(), String> {
    let mut unresolved = 0;
    for input in &args.inputs {
        let document = load(input, config.clone())?;
        let paths = document.paths().map_or(0, |p| p.len());
        println!(
            "{}: {} definition(s), {} path(s), {} include(s), {} reference(s) resolved",
            input.display(),
            document.models().len(),
            paths,
            document.includes().len(),
            document.resolution().resolved
        );
        for failure in document.failures() {
            println!("  unresolved {}: {}", failure.pointer, failure.error);
        }
        unresolved += document.failures().len();
    }

    if unresolved > 0 {
        return Err(format!("{unresolved} reference(s) could not be resolved"));
    }
    println!("Validated {} document(s).", args.inputs.len());
    Ok(())
}

fn run_model(args: ModelArgs, config: LoadConfig) -> Result<(), String> {
    match &args.name {
        Some(name) => {
            let document = load(&args.input, config)?;
            let model = document.definition(name).ok_or_else(|| {
                let known: Vec<&str> = document.models().names().collect();
                format!("no definition named '{name}' (known: {})", known.join(", "))
            })?;
            print_model(model, args.examples, &document)
        }
        None => {
            let model = load_schema(&args.input)?;
            print_model(&model, args.examples, &ModelRegistry::new())
        }
    }
}

/// Compiles a standalone schema file, naming the model after the file stem.
fn load_schema(path: &Path) -> Result<Rc<ModelType>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let schema = parse_text(&text).map_err(|e| format!("{}: {e}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("Model");
    compile_model(name, &schema).map_err(|e| format!("{}: {e}", path.display()))
}

fn print_model(model: &Rc<ModelType>, examples: bool, models: &dyn ModelLookup) -> Result<(), String> {
    println!("{}", model.name());
    if let Some(description) = model.description() {
        println!("  {description}");
    }
    println!();
    println!("{:<20} {:<24} {:<9} {:<12} CONSTRAINTS", "FIELD", "TYPE", "REQUIRED", "DEFAULT");
    for field in model.fields() {
        let default = field
            .default_value()
            .map(|v| v.to_json().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:<24} {:<9} {:<12} {}",
            field.name(),
            field.field_type().to_string(),
            if field.is_required() { "yes" } else { "no" },
            default,
            describe_constraints(field)
        );
    }

    if examples {
        match model.generate_examples(models) {
            None => println!("\n(no examples declared)"),
            Some(examples) => {
                let examples = examples.map_err(|e| format!("example for {}: {e}", model.name()))?;
                println!();
                for example in examples {
                    println!("{example}");
                }
            }
        }
    }
    Ok(())
}

fn describe_constraints(field: &FieldDescriptor) -> String {
    let parts: Vec<String> = field
        .validators()
        .iter()
        .filter_map(|validator| match validator {
            Validator::Type(_) => None,
            Validator::ExclusiveRange { minimum, maximum } => Some(format!(
                "range ({}, {})",
                minimum.map_or("-inf".to_string(), |m| m.to_string()),
                maximum.map_or("inf".to_string(), |m| m.to_string())
            )),
            Validator::Pattern(regex) => Some(format!("pattern {}", regex.as_str())),
            Validator::OneOf(values) => Some(format!(
                "one of {}",
                serde_json::Value::Array(values.clone())
            )),
            Validator::Format(format) => Some(format!("format {format:?}")),
            Validator::Instance(reference) => Some(format!("instance of {reference}")),
        })
        .collect();
    if parts.is_empty() { "-".to_string() } else { parts.join("; ") }
}

fn run_includes(args: IncludesArgs, config: LoadConfig) -> Result<(), String> {
    let document = load(&args.input, config)?;
    if document.includes().is_empty() {
        println!("{}: no includes", args.input.display());
        return Ok(());
    }
    println!("{}", args.input.display());
    for include in document.includes() {
        println!("  {}", include.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["apispec", "validate", "a.yaml", "--strict", "--no-includes"]).unwrap();
        assert!(cli.load.strict);
        assert!(cli.load.no_includes);
        let config = load_config(&cli.load).unwrap();
        assert_eq!(config.required_fields, RequiredPolicy::Error);
        assert!(!config.includes.enabled);
    }

    #[test]
    fn test_validate_requires_input() {
        assert!(Cli::try_parse_from(["apispec", "validate"]).is_err());
    }

    #[test]
    fn test_model_name_is_optional() {
        let cli = Cli::try_parse_from(["apispec", "model", "set.yaml"]).unwrap();
        let Command::Model(args) = cli.command else {
            panic!("expected model command");
        };
        assert!(args.name.is_none());
    }

    #[test]
    fn test_describe_constraints() {
        let spec = apispec_core::FieldSpec::of_type("integer").with_bounds(Some(0.0), None);
        let field = apispec_core::make_descriptor("weight", &spec).unwrap();
        assert_eq!(describe_constraints(&field), "range (0, inf)");

        let plain = apispec_core::make_descriptor("name", &apispec_core::FieldSpec::of_type("string")).unwrap();
        assert_eq!(describe_constraints(&plain), "-");
    }
}
