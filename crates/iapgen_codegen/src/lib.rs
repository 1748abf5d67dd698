//! Code generation for iapgen.
//!
//! This crate turns a validated IR schema into source files for:
//! - Swift (structs, enums with legacy-alias decoding, resolver protocols)
//! - Kotlin (data classes, sealed interfaces, handler type aliases)
//! - GDScript (inner classes with enum lookup tables)
//! - TypeScript, or any language described by a template profile
//!
//! # Example
//!
//! ```ignore
//! use iapgen_codegen::{CodeGenerator, Language};
//!
//! let generator = CodeGenerator::new(&schema);
//! let swift = generator.generate(Language::Swift)?;
//! ```

mod context;
mod error;
mod plugin;
pub mod plugins;
mod writer;

pub use context::GenerationContext;
pub use error::{CodegenError, CodegenResult};
pub use plugin::Plugin;
pub use plugins::{
    CaseStyle, Condition, GdscriptPlugin, KotlinPlugin, Rule, SwiftPlugin, TemplatePlugin,
    TemplateProfile, Templates, TypeCategory,
};
pub use writer::CodeWriter;

use iapgen_ir::IrSchema;
use rayon::prelude::*;

/// Target language for code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Swift,
    Kotlin,
    GDScript,
    TypeScript,
}

impl Language {
    /// Every built-in target, in output order.
    pub const ALL: [Language; 4] = [
        Language::Swift,
        Language::Kotlin,
        Language::GDScript,
        Language::TypeScript,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::GDScript => "gdscript",
            Language::TypeScript => "typescript",
        }
    }

    /// Parses a language name or its file extension.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "swift" => Some(Language::Swift),
            "kotlin" | "kt" => Some(Language::Kotlin),
            "gdscript" | "gd" | "godot" => Some(Language::GDScript),
            "typescript" | "ts" => Some(Language::TypeScript),
            _ => None,
        }
    }

    /// Instantiates the plugin for this language.
    #[must_use]
    pub fn plugin(self, options: &CodegenOptions) -> Box<dyn Plugin> {
        match self {
            Language::Swift => Box::new(SwiftPlugin::new(options)),
            Language::Kotlin => Box::new(KotlinPlugin::new(options)),
            Language::GDScript => Box::new(GdscriptPlugin::new(options)),
            Language::TypeScript => Box::new(TemplatePlugin::typescript(options)),
        }
    }
}

/// Code generation options.
#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// Banner written as a comment at the top of every file.
    pub header: String,
    /// Kotlin package name.
    pub package_name: String,
    /// Swift access modifier for generated declarations.
    pub swift_access: String,
    /// Swift modules imported by the generated file.
    pub swift_imports: Vec<String>,
    /// `class_name` of the generated GDScript file.
    pub gdscript_class_name: String,
    /// Overrides each plugin's indentation unit.
    pub indent: Option<String>,
    /// File name, without extension, used when writing output.
    pub file_stem: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            header: "Generated by iapgen. Do not edit.".to_string(),
            package_name: "dev.iapgen.generated".to_string(),
            swift_access: "public".to_string(),
            swift_imports: vec!["Foundation".to_string()],
            gdscript_class_name: "IapTypes".to_string(),
            indent: None,
            file_stem: "IapTypes".to_string(),
        }
    }
}

impl CodegenOptions {
    pub(crate) fn indent_or(&self, default: &str) -> String {
        self.indent.clone().unwrap_or_else(|| default.to_string())
    }
}

/// One rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub language: Language,
    pub file_name: String,
    pub contents: String,
}

/// Main code generator.
pub struct CodeGenerator<'a> {
    schema: &'a IrSchema,
    options: CodegenOptions,
}

impl<'a> CodeGenerator<'a> {
    /// Creates a new code generator.
    #[must_use]
    pub fn new(schema: &'a IrSchema) -> Self {
        Self {
            schema,
            options: CodegenOptions::default(),
        }
    }

    /// Creates a new code generator with options.
    #[must_use]
    pub fn with_options(schema: &'a IrSchema, options: CodegenOptions) -> Self {
        Self { schema, options }
    }

    /// Sets code generation options.
    #[must_use]
    pub fn options(mut self, options: CodegenOptions) -> Self {
        self.options = options;
        self
    }

    /// Generates code for the specified language.
    pub fn generate(&self, language: Language) -> CodegenResult<String> {
        self.generate_with(language.plugin(&self.options).as_ref())
    }

    /// Generates code with an arbitrary plugin, e.g. a custom template profile.
    pub fn generate_with(&self, plugin: &dyn Plugin) -> CodegenResult<String> {
        let span = tracing::debug_span!("generate", plugin = plugin.name());
        let _guard = span.enter();
        let output = plugin.generate(self.schema)?;
        tracing::info!(
            plugin = plugin.name(),
            bytes = output.len(),
            "generated source"
        );
        Ok(output)
    }

    /// Generates several languages in parallel over the shared schema.
    ///
    /// Output order follows `languages`; any failure fails the whole call.
    pub fn generate_all(&self, languages: &[Language]) -> CodegenResult<Vec<GeneratedFile>> {
        languages
            .par_iter()
            .map(|&language| {
                let plugin = language.plugin(&self.options);
                let contents = self.generate_with(plugin.as_ref())?;
                Ok(GeneratedFile {
                    language,
                    file_name: format!("{}.{}", self.options.file_stem, plugin.file_extension()),
                    contents,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codegen_options_default() {
        let options = CodegenOptions::default();
        assert_eq!(options.swift_access, "public");
        assert_eq!(options.package_name, "dev.iapgen.generated");
        assert_eq!(options.indent_or("    "), "    ");
    }

    #[test]
    fn test_language_names() {
        let names: Vec<_> = Language::ALL.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["swift", "kotlin", "gdscript", "typescript"]);
    }

    #[test]
    fn test_language_from_name() {
        assert_eq!(Language::from_name("Swift"), Some(Language::Swift));
        assert_eq!(Language::from_name("kt"), Some(Language::Kotlin));
        assert_eq!(Language::from_name("gd"), Some(Language::GDScript));
        assert_eq!(Language::from_name("ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_name("rust"), None);
        for language in Language::ALL {
            assert_eq!(Language::from_name(language.name()), Some(language));
        }
    }

    #[test]
    fn test_plugin_extensions() {
        let options = CodegenOptions::default();
        let extensions: Vec<_> = Language::ALL
            .iter()
            .map(|l| l.plugin(&options).file_extension().to_string())
            .collect();
        assert_eq!(extensions, vec!["swift", "kt", "gd", "ts"]);
    }
}
