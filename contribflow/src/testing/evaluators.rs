//! Stand-in evaluators for tests and benches.
//!
//! These understand just enough syntax to drive the registry; they are not
//! the expression or template languages.

use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::context::{is_truthy, ContextSnapshot};
use crate::errors::{ExpressionError, TemplateError};
use crate::evaluation::{ExpressionEvaluator, TemplateEvaluator};

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").unwrap_or_else(|e| panic!("invalid pattern: {e}"))
    })
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}")
            .unwrap_or_else(|e| panic!("invalid pattern: {e}"))
    })
}

/// Evaluates literals, context lookups and `!` negation.
///
/// Supported: `true`, `false`, `null`, numbers, `'quoted'` strings,
/// dotted context keys (missing keys are `null`), and a leading `!`.
/// Anything else is an `ExpressionError`.
#[derive(Debug, Default)]
pub struct LiteralExpressionEvaluator {
    calls: AtomicUsize,
}

impl LiteralExpressionEvaluator {
    /// Creates the evaluator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `evaluate` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn eval(
        expression: &str,
        original: &str,
        context: &ContextSnapshot,
    ) -> Result<Value, ExpressionError> {
        let expression = expression.trim();
        if let Some(rest) = expression.strip_prefix('!') {
            let inner = Self::eval(rest, original, context)?;
            return Ok(Value::Bool(!is_truthy(&inner)));
        }
        match expression {
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            "null" => return Ok(Value::Null),
            _ => {}
        }
        if let Ok(number) = serde_json::from_str::<serde_json::Number>(expression) {
            return Ok(Value::Number(number));
        }
        if let Some(quoted) = expression
            .strip_prefix('\'')
            .and_then(|rest| rest.strip_suffix('\''))
        {
            return Ok(Value::String(quoted.to_string()));
        }
        if identifier_pattern().is_match(expression) {
            return Ok(context.lookup(expression).cloned().unwrap_or(Value::Null));
        }
        Err(ExpressionError::new(original, "unsupported expression syntax"))
    }
}

impl ExpressionEvaluator for LiteralExpressionEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        context: &ContextSnapshot,
    ) -> Result<Value, ExpressionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Self::eval(expression, expression, context)
    }
}

/// Always fails with the configured message.
#[derive(Debug, Clone)]
pub struct FailingExpressionEvaluator {
    message: String,
}

impl FailingExpressionEvaluator {
    /// Creates the evaluator.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ExpressionEvaluator for FailingExpressionEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        _context: &ContextSnapshot,
    ) -> Result<Value, ExpressionError> {
        Err(ExpressionError::new(expression, self.message.clone()))
    }
}

/// Replaces `${key}` / `${a.b}` placeholders with context values.
///
/// Strings are inserted verbatim, other values as JSON. A missing key or an
/// unterminated `${` is a `TemplateError`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderTemplateEvaluator;

impl PlaceholderTemplateEvaluator {
    /// Creates the evaluator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TemplateEvaluator for PlaceholderTemplateEvaluator {
    fn evaluate_template(
        &self,
        template: &str,
        context: &ContextSnapshot,
    ) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(template.len());
        let mut last = 0;
        for captures in placeholder_pattern().captures_iter(template) {
            let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            output.push_str(&template[last..whole.start()]);
            let value = context.lookup(key.as_str()).ok_or_else(|| {
                TemplateError::new(template, format!("unknown key '{}'", key.as_str()))
            })?;
            match value {
                Value::String(s) => output.push_str(s),
                other => output.push_str(&other.to_string()),
            }
            last = whole.end();
        }
        let rest = &template[last..];
        if rest.contains("${") {
            return Err(TemplateError::new(template, "unterminated placeholder"));
        }
        output.push_str(rest);
        Ok(output)
    }
}

/// Wraps a template evaluator and records every call.
#[derive(Debug, Default)]
pub struct CountingTemplateEvaluator<T> {
    inner: T,
    evaluated: Mutex<Vec<String>>,
    checks: AtomicUsize,
}

impl<T: TemplateEvaluator> CountingTemplateEvaluator<T> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            evaluated: Mutex::new(Vec::new()),
            checks: AtomicUsize::new(0),
        }
    }

    /// Number of `evaluate_template` calls.
    #[must_use]
    pub fn evaluations(&self) -> usize {
        self.evaluated.lock().len()
    }

    /// Templates passed to `evaluate_template`, in call order.
    #[must_use]
    pub fn evaluated_templates(&self) -> Vec<String> {
        self.evaluated.lock().clone()
    }

    /// Number of `needs_evaluation` calls.
    #[must_use]
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    /// Forgets recorded calls.
    pub fn reset(&self) {
        self.evaluated.lock().clear();
        self.checks.store(0, Ordering::SeqCst);
    }
}

impl CountingTemplateEvaluator<PlaceholderTemplateEvaluator> {
    /// Counts calls into a `PlaceholderTemplateEvaluator`.
    #[must_use]
    pub fn placeholder() -> Arc<Self> {
        Arc::new(Self::new(PlaceholderTemplateEvaluator))
    }
}

impl<T: TemplateEvaluator> TemplateEvaluator for CountingTemplateEvaluator<T> {
    fn evaluate_template(
        &self,
        template: &str,
        context: &ContextSnapshot,
    ) -> Result<String, TemplateError> {
        self.evaluated.lock().push(template.to_string());
        self.inner.evaluate_template(template, context)
    }

    fn needs_evaluation(&self, text: &str) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.inner.needs_evaluation(text)
    }
}
