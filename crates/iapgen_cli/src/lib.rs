//! Command-line interface for iapgen.
//!
//! # Usage
//!
//! ```bash
//! # Generate every built-in target into a directory
//! iapgen generate --schema iap.ir.json --out-dir generated
//!
//! # Generate Kotlin only, with a custom package
//! iapgen generate --schema iap.ir.json --lang kotlin --package-name com.example.iap
//!
//! # Render with a custom template profile
//! iapgen generate --schema iap.ir.json --template dart.profile.json --out-dir generated
//!
//! # Validate a schema
//! iapgen check --schema iap.ir.json --format json
//!
//! # Decode a payload the way the generated decoders would
//! iapgen decode --schema iap.ir.json --type PurchaseIOS purchase.json
//!
//! # List built-in targets
//! iapgen languages
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use iapgen_codegen::{CodeGenerator, CodegenError, CodegenOptions, Language, Plugin, TemplatePlugin};
use iapgen_core::{Diagnostic, DiagnosticSeverity};
use iapgen_ir::{validate, IrError, IrSchema, SchemaIndex, WireCodec, WireError};
use miette::Diagnostic as MietteDiagnostic;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "iapgen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and suppress status lines
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate source files from an IR schema
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Validate an IR schema
    Check {
        /// IR schema (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Report format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Decode a JSON payload with the generated-code wire contract
    Decode {
        /// IR schema (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Enum, object, input, interface or union to decode as
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Payload file, or `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Use the null-propagating decoder instead of the throwing one
        #[arg(long)]
        strict: bool,
    },

    /// List built-in target languages
    Languages,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// IR schema (JSON)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Target languages, comma separated, or `all`
    #[arg(short, long, value_delimiter = ',', default_value = "all")]
    pub lang: Vec<String>,

    /// Template profile (JSON) to render instead of the built-in targets
    #[arg(long, conflicts_with = "lang")]
    pub template: Option<PathBuf>,

    /// Output directory; prints to stdout when omitted
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// File name without extension
    #[arg(long, default_value = "IapTypes")]
    pub stem: String,

    /// Banner comment at the top of each file
    #[arg(long)]
    pub header: Option<String>,

    /// Kotlin package
    #[arg(long)]
    pub package_name: Option<String>,

    /// Swift access modifier (`public`, `internal`, or empty)
    #[arg(long)]
    pub swift_access: Option<String>,

    /// Swift modules to import (repeatable)
    #[arg(long = "swift-import")]
    pub swift_imports: Vec<String>,

    /// GDScript `class_name`
    #[arg(long)]
    pub gdscript_class: Option<String>,

    /// Indent with this many spaces
    #[arg(long, conflicts_with = "tabs")]
    pub indent: Option<usize>,

    /// Indent with tabs
    #[arg(long)]
    pub tabs: bool,
}

impl GenerateArgs {
    /// Maps the flags onto generation options; unset flags keep the defaults.
    #[must_use]
    pub fn options(&self) -> CodegenOptions {
        let defaults = CodegenOptions::default();
        let indent = if self.tabs {
            Some("\t".to_string())
        } else {
            self.indent.map(|n| " ".repeat(n))
        };
        CodegenOptions {
            header: self.header.clone().unwrap_or(defaults.header),
            package_name: self.package_name.clone().unwrap_or(defaults.package_name),
            swift_access: self.swift_access.clone().unwrap_or(defaults.swift_access),
            swift_imports: if self.swift_imports.is_empty() {
                defaults.swift_imports
            } else {
                self.swift_imports.clone()
            },
            gdscript_class_name: self
                .gdscript_class
                .clone()
                .unwrap_or(defaults.gdscript_class_name),
            indent,
            file_stem: self.stem.clone(),
        }
    }
}

/// Errors reported by the CLI.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum CliError {
    #[error("failed to read `{path}`")]
    #[diagnostic(code(iapgen::cli::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write `{path}`")]
    #[diagnostic(code(iapgen::cli::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown language `{0}`")]
    #[diagnostic(
        code(iapgen::cli::language),
        help("expected one of: swift, kotlin, gdscript, typescript, all")
    )]
    UnknownLanguage(String),

    #[error("payload is not valid JSON: {0}")]
    #[diagnostic(code(iapgen::cli::payload))]
    Payload(#[source] serde_json::Error),

    #[error("failed to serialize output: {0}")]
    #[diagnostic(code(iapgen::cli::json))]
    Json(#[source] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ir(#[from] IrError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Wire(#[from] WireError),
}

/// Runs a parsed command and returns the process exit code.
pub fn run(cli: Cli) -> Result<i32, CliError> {
    match cli.command {
        Commands::Generate(args) => generate_code(&args, cli.quiet),
        Commands::Check {
            schema,
            format,
            strict,
        } => check_schema(&schema, format, strict, cli.quiet),
        Commands::Decode {
            schema,
            type_name,
            input,
            strict,
        } => decode_payload(&schema, &type_name, &input, strict),
        Commands::Languages => {
            list_languages();
            Ok(0)
        }
    }
}

/// Expands `all` and resolves names, keeping first-seen order.
pub fn parse_languages(names: &[String]) -> Result<Vec<Language>, CliError> {
    let mut languages = Vec::new();
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let resolved: Vec<Language> = if name.eq_ignore_ascii_case("all") {
            Language::ALL.to_vec()
        } else {
            let language = Language::from_name(name)
                .ok_or_else(|| CliError::UnknownLanguage(name.to_string()))?;
            vec![language]
        };
        for language in resolved {
            if !languages.contains(&language) {
                languages.push(language);
            }
        }
    }
    if languages.is_empty() {
        return Ok(Language::ALL.to_vec());
    }
    Ok(languages)
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_input(path: &Path) -> Result<String, CliError> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|source| CliError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(text)
    } else {
        read_file(path)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn generate_code(args: &GenerateArgs, quiet: bool) -> Result<i32, CliError> {
    let (schema, _warnings) = iapgen_ir::load(&read_file(&args.schema)?)?;
    let options = args.options();
    let generator = CodeGenerator::with_options(&schema, options.clone());

    let files: Vec<(String, String)> = match &args.template {
        Some(profile) => {
            let plugin = TemplatePlugin::from_json(&read_file(profile)?, &options)?;
            let contents = generator.generate_with(&plugin)?;
            vec![(
                format!("{}.{}", options.file_stem, plugin.file_extension()),
                contents,
            )]
        }
        None => generator
            .generate_all(&parse_languages(&args.lang)?)?
            .into_iter()
            .map(|file| (file.file_name, file.contents))
            .collect(),
    };

    let Some(out_dir) = &args.out_dir else {
        for (_, contents) in &files {
            print!("{contents}");
        }
        return Ok(0);
    };

    std::fs::create_dir_all(out_dir).map_err(|source| CliError::Write {
        path: out_dir.clone(),
        source,
    })?;
    for (file_name, contents) in &files {
        let path = out_dir.join(file_name);
        write_file(&path, contents)?;
        if !quiet {
            println!("{} {}", "Generated".green(), path.display());
        }
    }
    Ok(0)
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    let severity = match diagnostic.severity {
        DiagnosticSeverity::Error => "error".red().bold(),
        DiagnosticSeverity::Warning => "warning".yellow().bold(),
    };
    eprintln!("{}[{}]: {}", severity, diagnostic.code, diagnostic.title);
    for label in &diagnostic.labels {
        eprintln!("  {} {}: {}", "-->".blue(), label.path, label.message);
    }
    if let Some(message) = &diagnostic.message {
        eprintln!("      {message}");
    }
}

fn check_schema(
    path: &Path,
    format: OutputFormat,
    strict: bool,
    quiet: bool,
) -> Result<i32, CliError> {
    let schema = IrSchema::from_json(&read_file(path)?).map_err(IrError::from)?;
    let diagnostics = validate(&schema).diagnostics;
    let failed = diagnostics.has_errors() || (strict && !diagnostics.is_empty());

    match format {
        OutputFormat::Json => {
            let report = serde_json::to_string_pretty(&diagnostics).map_err(CliError::Json)?;
            println!("{report}");
        }
        OutputFormat::Text => {
            for diagnostic in diagnostics.iter() {
                print_diagnostic(diagnostic);
            }
            if failed {
                eprintln!(
                    "{} {} error(s), {} warning(s) in {}",
                    "Failed:".red().bold(),
                    diagnostics.error_count(),
                    diagnostics.warnings().count(),
                    path.display()
                );
            } else if !quiet {
                println!(
                    "{} {} ({} enums, {} objects, {} inputs, {} unions, {} operations)",
                    "Success:".green().bold(),
                    path.display(),
                    schema.enums.len(),
                    schema.objects.len(),
                    schema.inputs.len(),
                    schema.unions.len(),
                    schema.operations.len()
                );
            }
        }
    }

    Ok(i32::from(failed))
}

fn decode_payload(
    schema_path: &Path,
    type_name: &str,
    input: &Path,
    strict: bool,
) -> Result<i32, CliError> {
    let (schema, _warnings) = iapgen_ir::load(&read_file(schema_path)?)?;
    if SchemaIndex::new(&schema).kind_of(type_name).is_none() {
        return Err(WireError::UnknownType(type_name.to_string()).into());
    }
    let payload: Value = serde_json::from_str(&read_input(input)?).map_err(CliError::Payload)?;

    let codec = WireCodec::new(&schema);
    let decoded = if strict {
        codec.decode_or_null(type_name, &payload).unwrap_or(Value::Null)
    } else {
        codec.decode(type_name, &payload)?
    };
    tracing::debug!(type_name, strict, "decoded payload");

    let output = serde_json::to_string_pretty(&decoded).map_err(CliError::Json)?;
    println!("{output}");
    Ok(0)
}

fn list_languages() {
    let options = CodegenOptions::default();
    for language in Language::ALL {
        let plugin = language.plugin(&options);
        println!(
            "{:<12} {}",
            language.name().bold(),
            format!(".{}", plugin.file_extension()).dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_languages() {
        let names = |list: &[&str]| list.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        assert_eq!(
            parse_languages(&names(&["all"])).unwrap(),
            Language::ALL.to_vec()
        );
        assert_eq!(
            parse_languages(&names(&["kotlin", "swift", "kt"])).unwrap(),
            vec![Language::Kotlin, Language::Swift]
        );
        assert!(matches!(
            parse_languages(&names(&["swift", "rust"])),
            Err(CliError::UnknownLanguage(name)) if name == "rust"
        ));
    }

    #[test]
    fn test_generate_args_options() {
        let cli = Cli::try_parse_from([
            "iapgen",
            "generate",
            "--schema",
            "iap.ir.json",
            "--lang",
            "swift,gdscript",
            "--package-name",
            "com.example.iap",
            "--swift-import",
            "Foundation",
            "--swift-import",
            "StoreKit",
            "--tabs",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.lang, vec!["swift", "gdscript"]);
        let options = args.options();
        assert_eq!(options.package_name, "com.example.iap");
        assert_eq!(options.swift_imports, vec!["Foundation", "StoreKit"]);
        assert_eq!(options.indent.as_deref(), Some("\t"));
        assert_eq!(options.swift_access, "public");
        assert_eq!(options.file_stem, "IapTypes");
    }

    #[test]
    fn test_template_conflicts_with_lang() {
        let result = Cli::try_parse_from([
            "iapgen",
            "generate",
            "--schema",
            "iap.ir.json",
            "--lang",
            "swift",
            "--template",
            "profile.json",
        ]);
        assert!(result.is_err());
    }
}
