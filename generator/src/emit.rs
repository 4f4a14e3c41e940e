// emit.rs — C# interceptor generation
//
// Turns call-site records into one generated C# unit. Each record becomes a
// routine tagged with the host's InterceptsLocation attribute whose body is a
// two-state machine:
//
//   pass-through  every marked argument is non-null → forward unchanged
//   synthesize    otherwise fill each null marked argument with its literal
//                 (independently) and forward
//
// The logic lives in `InterceptorPlan`; `render_routine` is the only template
// and `InterceptorPlan::bind` evaluates the same plan without a C# compiler.
//
// Preconditions: records come from `collect` (or satisfy the same invariants).
// Postconditions: one routine per valid record, in input order; output is a
//                 pure function of (records, options).
// Failure modes: a marked ordinal outside the parameter list → E0002 for that
//                record; its routine is absent, all others are emitted.
// Side effects: none.

use std::fmt::Write as _;

use serde::Serialize;

use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::location::SourceLocation;
use crate::site::{CallSiteRecord, ParameterInfo, SiteId};

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Namespace of the generated interceptor class.
    pub namespace: String,
    pub class_name: String,
    /// File name the host's source sink stores the unit under.
    pub hint_name: String,
    /// Emit a file-local `InterceptsLocationAttribute` declaration.
    pub attribute_polyfill: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            namespace: "UniqueId.Generated".to_string(),
            class_name: "UniqueIdInterceptors".to_string(),
            hint_name: "UniqueIdInterceptors.g.cs".to_string(),
            attribute_polyfill: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    pub hint_name: String,
    pub text: String,
}

/// Index entry tying a generated routine to the call site it replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedSite {
    pub site_id: SiteId,
    pub routine: String,
    pub location_key: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug)]
pub struct EmitResult {
    pub generated: GeneratedSource,
    pub sites: Vec<EmittedSite>,
    pub diagnostics: Vec<Diagnostic>,
}

// ── Interceptor plan ────────────────────────────────────────────────────────

/// Literal substitution for one marked parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fill {
    index: usize,
    name: String,
    literal: String,
}

/// Everything needed to render (or evaluate) one interceptor routine.
#[derive(Debug, Clone)]
pub struct InterceptorPlan {
    pub site_id: SiteId,
    pub routine: String,
    pub location: SourceLocation,
    pub location_key: String,
    pub return_type: String,
    /// Receiver type and parameter name for instance targets.
    receiver: Option<(String, String)>,
    /// Call target up to the argument list.
    callee: String,
    parameters: Vec<ParameterInfo>,
    fills: Vec<Fill>,
}

/// Which state the routine took and the arguments it forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    PassThrough(Vec<Option<String>>),
    Synthesized(Vec<Option<String>>),
}

impl Binding {
    pub fn arguments(&self) -> &[Option<String>] {
        match self {
            Binding::PassThrough(args) | Binding::Synthesized(args) => args,
        }
    }
}

impl InterceptorPlan {
    pub fn for_record(record: &CallSiteRecord) -> Result<Self, Diagnostic> {
        let mut fills = Vec::with_capacity(record.marked_parameters.len());
        for marked in &record.marked_parameters {
            let Some(param) = record.marked_parameter_info(marked) else {
                return Err(Diagnostic::new(
                    DiagLevel::Error,
                    format!(
                        "marked parameter ordinal {} is out of range for {} parameter(s)",
                        marked.ordinal,
                        record.parameters.len()
                    ),
                )
                .with_code(codes::E0002)
                .with_location(record.location.clone())
                .with_target(record.target_display()));
            };
            fills.push(Fill {
                index: marked.ordinal,
                name: param.name.clone(),
                literal: record.literal_for(marked),
            });
        }

        let (receiver, callee) = if record.is_static {
            (
                None,
                format!("{}.{}", record.target_type, record.method_name),
            )
        } else {
            let name = receiver_name(&record.parameters);
            let callee = format!("{}.{}", name, record.method_name);
            (Some((record.target_type.clone(), name)), callee)
        };

        Ok(Self {
            site_id: record.site_id,
            routine: routine_name(&record.method_name, record.site_id),
            location: record.location.clone(),
            location_key: record.location_key.to_string(),
            return_type: record.return_type.clone(),
            receiver,
            callee,
            parameters: record.parameters.clone(),
            fills,
        })
    }

    pub fn is_void(&self) -> bool {
        self.return_type == "void"
    }

    /// Literal the routine injects for the parameter at `ordinal`, if marked.
    pub fn literal(&self, ordinal: usize) -> Option<&str> {
        self.fills
            .iter()
            .find(|f| f.index == ordinal)
            .map(|f| f.literal.as_str())
    }

    /// Evaluate the routine for the arguments bound at the call site (one per
    /// declared parameter; `None` is null, missing trailing entries are
    /// omitted arguments).
    pub fn bind(&self, supplied: &[Option<&str>]) -> Binding {
        let mut args: Vec<Option<String>> = (0..self.parameters.len())
            .map(|i| supplied.get(i).copied().flatten().map(str::to_string))
            .collect();

        if self.fills.iter().all(|f| args[f.index].is_some()) {
            return Binding::PassThrough(args);
        }
        for fill in &self.fills {
            let slot = &mut args[fill.index];
            if slot.is_none() {
                *slot = Some(fill.literal.clone());
            }
        }
        Binding::Synthesized(args)
    }

    fn signature(&self) -> String {
        let mut parts = Vec::with_capacity(self.parameters.len() + 1);
        if let Some((ty, name)) = &self.receiver {
            parts.push(format!("this {} {}", ty, name));
        }
        for p in &self.parameters {
            match &p.default {
                Some(default) => {
                    parts.push(format!("{} {} = {}", p.ty, csharp_identifier(&p.name), default))
                }
                None => parts.push(format!("{} {}", p.ty, csharp_identifier(&p.name))),
            }
        }
        parts.join(", ")
    }

    fn guard(&self) -> String {
        self.fills
            .iter()
            .map(|f| format!("{} is not null", csharp_identifier(&f.name)))
            .collect::<Vec<_>>()
            .join(" && ")
    }

    fn call(&self) -> String {
        let args: Vec<String> = self
            .parameters
            .iter()
            .map(|p| csharp_identifier(&p.name))
            .collect();
        format!("{}({})", self.callee, args.join(", "))
    }

    fn emitted_site(&self) -> EmittedSite {
        EmittedSite {
            site_id: self.site_id,
            routine: self.routine.clone(),
            location_key: self.location_key.clone(),
            file: self.location.file.clone(),
            line: self.location.line,
            column: self.location.column,
        }
    }
}

/// `@this`, extended with `_` until no parameter identifier uses it.
fn receiver_name(parameters: &[ParameterInfo]) -> String {
    let mut name = "@this".to_string();
    while parameters.iter().any(|p| csharp_identifier(&p.name) == name) {
        name.push('_');
    }
    name
}

// ── Public entry point ──────────────────────────────────────────────────────

pub fn emit(records: &[CallSiteRecord], options: &EmitOptions) -> EmitResult {
    let mut diagnostics = Vec::new();
    let mut plans = Vec::with_capacity(records.len());
    for record in records {
        match InterceptorPlan::for_record(record) {
            Ok(plan) => plans.push(plan),
            Err(diag) => {
                tracing::debug!(site = record.site_id.0, "skipping record: {}", diag.message);
                diagnostics.push(diag);
            }
        }
    }

    let mut out = String::with_capacity(1024 + plans.len() * 512);
    emit_preamble(&mut out);
    if options.attribute_polyfill {
        emit_attribute_polyfill(&mut out);
    }
    emit_interceptor_class(&mut out, options, &plans);

    EmitResult {
        generated: GeneratedSource {
            hint_name: options.hint_name.clone(),
            text: out,
        },
        sites: plans.iter().map(InterceptorPlan::emitted_site).collect(),
        diagnostics,
    }
}

// ── Templates ───────────────────────────────────────────────────────────────

const INDENT: &str = "    ";

fn emit_preamble(out: &mut String) {
    out.push_str("// <auto-generated/>\n");
    out.push_str("// Generated by uidgen. Do not edit.\n");
    out.push_str("#nullable enable\n");
}

fn emit_attribute_polyfill(out: &mut String) {
    out.push('\n');
    out.push_str("namespace System.Runtime.CompilerServices\n{\n");
    out.push_str("    [global::System.AttributeUsage(global::System.AttributeTargets.Method, AllowMultiple = true)]\n");
    out.push_str("    file sealed class InterceptsLocationAttribute : global::System.Attribute\n");
    out.push_str("    {\n");
    out.push_str("        public InterceptsLocationAttribute(string filePath, int line, int column)\n");
    out.push_str("        {\n");
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n");
}

fn emit_interceptor_class(out: &mut String, options: &EmitOptions, plans: &[InterceptorPlan]) {
    out.push('\n');
    let _ = writeln!(out, "namespace {}", options.namespace);
    out.push_str("{\n");
    let _ = writeln!(out, "{INDENT}file static class {}", options.class_name);
    let _ = writeln!(out, "{INDENT}{{");
    for (i, plan) in plans.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_routine(out, plan);
    }
    let _ = writeln!(out, "{INDENT}}}");
    out.push_str("}\n");
}

fn render_routine(out: &mut String, plan: &InterceptorPlan) {
    let member = INDENT.repeat(2);
    let body = INDENT.repeat(3);
    let nested = INDENT.repeat(4);

    let _ = writeln!(
        out,
        "{member}[global::System.Runtime.CompilerServices.InterceptsLocation({}, {}, {})]",
        csharp_verbatim_string(&plan.location.file),
        plan.location.line,
        plan.location.column
    );
    let _ = writeln!(
        out,
        "{member}public static {} {}({})",
        plan.return_type,
        plan.routine,
        plan.signature()
    );
    let _ = writeln!(out, "{member}{{");

    let call = plan.call();
    let _ = writeln!(out, "{body}if ({})", plan.guard());
    let _ = writeln!(out, "{body}{{");
    if plan.is_void() {
        let _ = writeln!(out, "{nested}{};", call);
        let _ = writeln!(out, "{nested}return;");
    } else {
        let _ = writeln!(out, "{nested}return {};", call);
    }
    let _ = writeln!(out, "{body}}}");
    out.push('\n');

    for fill in &plan.fills {
        let _ = writeln!(
            out,
            "{body}{} ??= {};",
            csharp_identifier(&fill.name),
            csharp_string(&fill.literal)
        );
    }
    if plan.is_void() {
        let _ = writeln!(out, "{body}{};", call);
    } else {
        let _ = writeln!(out, "{body}return {};", call);
    }
    let _ = writeln!(out, "{member}}}");
}

// ── C# text helpers ─────────────────────────────────────────────────────────

/// `{method}_{site}`, with characters invalid in an identifier replaced.
fn routine_name(method_name: &str, site: SiteId) -> String {
    let mut name: String = method_name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    format!("{}_{}", name, site.0)
}

/// Regular C# string literal.
fn csharp_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() || c == '\u{2028}' || c == '\u{2029}' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Parameter names arrive without their verbatim `@`; always adding it keeps
/// keyword names such as `class` valid.
fn csharp_identifier(name: &str) -> String {
    format!("@{}", name.trim_start_matches('@'))
}

/// Verbatim C# string literal (`@"..."`), used for file paths.
fn csharp_verbatim_string(s: &str) -> String {
    format!("@\"{}\"", s.replace('"', "\"\""))
}

// ── Tests ───────────────────────────────────────────────────────────────────
