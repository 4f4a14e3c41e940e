// collect.rs — Call-site collection
//
// Maps the facility's candidate invocations into `CallSiteRecord`s. A
// candidate is kept iff its target declares at least one marked parameter,
// whether or not the call supplies an argument for it.
//
// Preconditions: manifest decoded (`descriptor::InvocationManifest`).
// Postconditions: records are in manifest order with consecutive `SiteId`s;
//                 every record has a non-empty `marked_parameters` and a
//                 location key unique within the pass.
// Failure modes: per candidate only. No position → W0001 (dropped);
//                duplicate key → W0003 (dropped); bad marker format → E0001
//                (dropped). Other candidates are unaffected.
// Side effects: none.

use std::collections::HashSet;

use crate::descriptor::{InvocationManifest, RawFormat, RawInvocation, RawMarker};
use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::format::IdFormat;
use crate::location::LocationKey;
use crate::site::{CallSiteRecord, MarkedParameter, ParameterInfo, SiteIdAllocator};

#[derive(Debug)]
pub struct CollectResult {
    pub records: Vec<CallSiteRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn collect(manifest: &InvocationManifest) -> CollectResult {
    let mut collector = Collector::default();
    for invocation in &manifest.invocations {
        collector.visit(invocation);
    }
    tracing::debug!(
        candidates = manifest.invocations.len(),
        records = collector.records.len(),
        "collected call sites"
    );
    CollectResult {
        records: collector.records,
        diagnostics: collector.diagnostics,
    }
}

#[derive(Default)]
struct Collector {
    ids: SiteIdAllocator,
    seen: HashSet<LocationKey>,
    records: Vec<CallSiteRecord>,
    diagnostics: Vec<Diagnostic>,
}

impl Collector {
    fn visit(&mut self, invocation: &RawInvocation) {
        let method = &invocation.method;
        let markers: Vec<(usize, &RawMarker)> = method
            .parameters
            .iter()
            .enumerate()
            .filter_map(|(ordinal, p)| p.unique_id.as_ref().map(|m| (ordinal, m)))
            .collect();
        if markers.is_empty() {
            tracing::trace!(method = %method.display_name(), "no marked parameters");
            return;
        }

        let location = match &invocation.location {
            Some(loc) if !loc.file.is_empty() => loc.clone(),
            _ => {
                tracing::debug!(method = %method.display_name(), "dropping call without location");
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagLevel::Warning,
                        "call site has no source location; no interceptor generated",
                    )
                    .with_code(codes::W0001)
                    .with_target(method.display_name()),
                );
                return;
            }
        };

        let location_key = location.key();
        if self.seen.contains(&location_key) {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagLevel::Warning,
                    "call site reported more than once; keeping the first",
                )
                .with_code(codes::W0003)
                .with_location(location)
                .with_target(method.display_name()),
            );
            return;
        }

        let mut marked = Vec::with_capacity(markers.len());
        for (ordinal, marker) in markers {
            let format = match decode_format(marker.format.as_ref()) {
                Some(format) => format,
                None => {
                    let raw = marker
                        .format
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    self.diagnostics.push(
                        Diagnostic::new(
                            DiagLevel::Error,
                            format!(
                                "parameter `{}` requests unknown id format {}",
                                method.parameters[ordinal].name, raw
                            ),
                        )
                        .with_code(codes::E0001)
                        .with_location(location.clone())
                        .with_target(method.display_name())
                        .with_hint("expected Guid (0), HtmlId (1), Timestamp (2) or ShortHash (3)"),
                    );
                    return;
                }
            };
            marked.push(MarkedParameter {
                ordinal,
                format,
                prefix: marker.prefix.clone(),
                deterministic: marker.deterministic,
            });
        }

        for m in marked.iter().filter(|m| !m.deterministic) {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagLevel::Warning,
                    format!(
                        "`deterministic: false` on parameter `{}` has no effect",
                        method.parameters[m.ordinal].name
                    ),
                )
                .with_code(codes::W0002)
                .with_location(location.clone())
                .with_target(method.display_name()),
            );
        }

        let parameters = method
            .parameters
            .iter()
            .map(|p| ParameterInfo {
                name: p.name.clone(),
                ty: p.ty.clone(),
                default: p.default.clone(),
            })
            .collect();

        self.seen.insert(location_key.clone());
        self.records.push(CallSiteRecord {
            site_id: self.ids.alloc(),
            target_type: method.containing_type.clone(),
            method_name: method.name.clone(),
            return_type: method.return_type.clone(),
            is_static: method.is_static,
            location,
            location_key,
            parameters,
            marked_parameters: marked,
        });
    }
}

/// Absent means `Guid`; anything unrecognised is `None`.
fn decode_format(raw: Option<&RawFormat>) -> Option<IdFormat> {
    match raw {
        None => Some(IdFormat::Guid),
        Some(RawFormat::Ordinal(n)) => IdFormat::from_ordinal(*n),
        Some(RawFormat::Name(name)) => IdFormat::from_name(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::SiteId;

    fn manifest(json: &str) -> InvocationManifest {
        InvocationManifest::from_json(json).unwrap()
    }

    fn invocation(location: &str, params: &str) -> String {
        format!(
            r#"{{ "location": {location}, "method": {{
                "containing_type": "global::Demo.Html", "name": "Form",
                "return_type": "string", "parameters": [{params}] }} }}"#
        )
    }

    const FORM_PARAMS: &str = r#"
        { "name": "formId", "type": "string?", "default": "null",
          "unique_id": { "prefix": "form-" } },
        { "name": "action", "type": "string" },
        { "name": "method", "type": "string", "default": "\"post\"" },
        { "name": "submitId", "type": "string?", "default": "null",
          "unique_id": { "format": "Guid" } }"#;

    fn at(line: u32) -> String {
        format!(r#"{{ "file": "/src/Page.cs", "line": {line}, "column": 9 }}"#)
    }

    #[test]
    fn keeps_marked_call_with_declaration_ordinals() {
        let m = manifest(&format!(
            r#"{{ "invocations": [{}] }}"#,
            invocation(&at(12), FORM_PARAMS)
        ));
        let result = collect(&m);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.records.len(), 1);

        let rec = &result.records[0];
        assert_eq!(rec.site_id, SiteId(0));
        assert_eq!(rec.location_key.as_str(), "/src/Page.cs:12:9");
        assert_eq!(rec.parameters.len(), 4);
        assert_eq!(rec.parameters[2].default.as_deref(), Some("\"post\""));
        let ordinals: Vec<usize> = rec.marked_parameters.iter().map(|m| m.ordinal).collect();
        assert_eq!(ordinals, vec![0, 3]);
        assert_eq!(rec.marked_parameters[0].format, IdFormat::Guid);
        assert_eq!(rec.marked_parameters[0].prefix.as_deref(), Some("form-"));
        assert_eq!(rec.marked_parameters[1].prefix, None);
    }

    #[test]
    fn skips_unmarked_targets_silently() {
        let m = manifest(&format!(
            r#"{{ "invocations": [{}] }}"#,
            invocation(&at(1), r#"{ "name": "x", "type": "string" }"#)
        ));
        let result = collect(&m);
        assert!(result.records.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn drops_call_without_location() {
        let m = manifest(&format!(
            r#"{{ "invocations": [{}, {}, {}] }}"#,
            invocation("null", FORM_PARAMS),
            invocation(r#"{ "file": "", "line": 1, "column": 1 }"#, FORM_PARAMS),
            invocation(&at(3), FORM_PARAMS)
        ));
        let result = collect(&m);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].site_id, SiteId(0));
        assert_eq!(result.diagnostics.len(), 2);
        assert!(result
            .diagnostics
            .iter()
            .all(|d| d.code == Some(codes::W0001) && !d.is_error()));
    }

    #[test]
    fn duplicate_location_keeps_first() {
        let m = manifest(&format!(
            r#"{{ "invocations": [{}, {}] }}"#,
            invocation(&at(5), FORM_PARAMS),
            invocation(&at(5), FORM_PARAMS)
        ));
        let result = collect(&m);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.diagnostics[0].code, Some(codes::W0003));
    }

    #[test]
    fn bad_format_fails_only_that_call() {
        let bad = r#"{ "name": "id", "type": "string?", "unique_id": { "format": 9 } }"#;
        let m = manifest(&format!(
            r#"{{ "invocations": [{}, {}, {}] }}"#,
            invocation(&at(1), FORM_PARAMS),
            invocation(&at(2), bad),
            invocation(&at(3), FORM_PARAMS)
        ));
        let result = collect(&m);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].site_id, SiteId(1));
        assert_eq!(result.records[1].location.line, 3);
        assert_eq!(result.diagnostics.len(), 1);
        let diag = &result.diagnostics[0];
        assert!(diag.is_error());
        assert_eq!(diag.code, Some(codes::E0001));
        assert_eq!(diag.location.as_ref().map(|l| l.line), Some(2));
    }

    #[test]
    fn unknown_format_name_is_error() {
        let bad = r#"{ "name": "id", "type": "string?", "unique_id": { "format": "Uuid" } }"#;
        let m = manifest(&format!(
            r#"{{ "invocations": [{}] }}"#,
            invocation(&at(1), bad)
        ));
        let result = collect(&m);
        assert!(result.records.is_empty());
        assert!(result.diagnostics[0].message.contains("\"Uuid\""));
    }

    #[test]
    fn non_deterministic_flag_warns_but_keeps_record() {
        let params = r#"{ "name": "id", "type": "string?",
            "unique_id": { "format": 2, "deterministic": false } }"#;
        let m = manifest(&format!(
            r#"{{ "invocations": [{}] }}"#,
            invocation(&at(1), params)
        ));
        let result = collect(&m);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].marked_parameters[0].format, IdFormat::Timestamp);
        assert_eq!(result.diagnostics[0].code, Some(codes::W0002));
    }
}
