//! Content processors.
//!
//! A processor maps `(resource, content)` to new content. Returning `None`
//! leaves the content unchanged; returning `Some(String::new())` blanks it.
//!
//! Built-in processors:
//! - [`Processor::enclose`]: wrap scripts in an IIFE, optionally exporting globals
//! - [`Processor::minify`]: oxc for JavaScript, lightningcss for CSS

use std::borrow::Cow;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::Resource;
use crate::error::{ResourceError, Result};
use crate::utils::mime::types;

type ProcessFn = dyn Fn(&Resource, &str) -> Result<Option<String>> + Send + Sync;

/// Named content transform.
///
/// The name takes part in etag derivation, so two processors that transform
/// differently should not share a name.
#[derive(Clone)]
pub struct Processor {
    name: Cow<'static, str>,
    apply: Arc<ProcessFn>,
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Processor").field(&self.name).finish()
    }
}

impl Processor {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, apply: F) -> Self
    where
        F: Fn(&Resource, &str) -> Result<Option<String>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            apply: Arc::new(apply),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the transform. Errors pass through unchanged; a panic becomes
    /// `ResourceError::Processor`.
    pub(crate) fn run(&self, resource: &Resource, content: String) -> Result<String> {
        let outcome = catch_unwind(AssertUnwindSafe(|| (self.apply)(resource, &content)));
        match outcome {
            Ok(Ok(Some(processed))) => Ok(processed),
            Ok(Ok(None)) => Ok(content),
            Ok(Err(err)) => Err(err),
            Err(panic) => Err(ResourceError::Processor {
                path: resource.path().to_string(),
                message: panic_message(panic.as_ref()),
            }),
        }
    }

    /// Wrap content in an immediately invoked function, exporting `exports`
    /// onto the global object.
    pub fn enclose(exports: Vec<String>) -> Self {
        let name = format!("enclose:{}", exports.join(","));
        Self::new(name, move |_, content| Ok(Some(enclose(content, &exports))))
    }

    /// Minify scripts and stylesheets; anything else, or content the
    /// minifier cannot parse, is left unchanged.
    pub fn minify() -> Self {
        Self::new("minify", |resource, content| {
            Ok(match resource.mime_type().as_str() {
                types::JAVASCRIPT => minify_js(content),
                types::CSS => minify_css(content),
                _ => None,
            })
        })
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}

fn enclose(content: &str, exports: &[String]) -> String {
    if exports.is_empty() {
        return format!("(function () {{{content}}}.call(this));");
    }
    let mut statements: String = exports
        .iter()
        .map(|name| format!("global.{name}={name};"))
        .collect();
    if !content.trim_end().ends_with(';') {
        statements.insert(0, ';');
    }
    format!(
        "(function (global) {{{content}{statements}}}.call(this, typeof global != \"undefined\" ? global : this));"
    )
}

/// Minify JavaScript source code.
pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::cjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::default()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}
