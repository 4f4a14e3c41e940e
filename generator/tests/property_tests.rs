// Property-based tests for literal derivation and interceptor binding.
//
// Two categories:
// 1. Literal invariants: determinism, format salting, prefix composition,
//    HtmlId/Guid shape, ordinal sensitivity
// 2. Routine binding: pass-through fidelity and per-parameter synthesis
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use proptest::prelude::*;

use uidgen::emit::{Binding, InterceptorPlan};
use uidgen::format::{format_literal, IdFormat};
use uidgen::location::{derive_location_key, SourceLocation};
use uidgen::site::{CallSiteRecord, MarkedParameter, ParameterInfo, SiteId};

// ── Generators ─────────────────────────────────────────────────────────────

fn arb_format() -> impl Strategy<Value = IdFormat> {
    prop_oneof![
        Just(IdFormat::Guid),
        Just(IdFormat::HtmlId),
        Just(IdFormat::Timestamp),
        Just(IdFormat::ShortHash),
    ]
}

fn arb_location() -> impl Strategy<Value = SourceLocation> {
    (
        prop_oneof![
            "/src/[A-Za-z]{1,12}\\.cs",
            "C:\\\\repo\\\\[A-Za-z]{1,8}\\.cs",
            "[a-z:/ ._-]{1,24}",
        ],
        1u32..5000,
        1u32..240,
    )
        .prop_map(|(file, line, column)| SourceLocation::new(file, line, column))
}

/// A record with `arity` string parameters, of which `marked` are marked.
fn arb_record() -> impl Strategy<Value = CallSiteRecord> {
    (arb_location(), 1usize..6)
        .prop_flat_map(|(location, arity)| {
            (
                Just(location),
                Just(arity),
                prop::collection::vec((any::<bool>(), arb_format()), arity),
            )
        })
        .prop_filter("needs at least one marked parameter", |(_, _, marks)| {
            marks.iter().any(|(m, _)| *m)
        })
        .prop_map(|(location, arity, marks)| {
            let parameters = (0..arity)
                .map(|i| ParameterInfo {
                    name: format!("p{}", i),
                    ty: "string?".to_string(),
                    default: Some("null".to_string()),
                })
                .collect();
            let marked_parameters = marks
                .iter()
                .enumerate()
                .filter(|(_, (m, _))| *m)
                .map(|(ordinal, (_, format))| MarkedParameter {
                    ordinal,
                    format: *format,
                    prefix: None,
                    deterministic: true,
                })
                .collect();
            CallSiteRecord {
                site_id: SiteId(0),
                target_type: "global::Demo.Html".to_string(),
                method_name: "Render".to_string(),
                return_type: "string".to_string(),
                is_static: true,
                location_key: location.key(),
                location,
                parameters,
                marked_parameters,
            }
        })
}

// ── Literal invariants ─────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn literal_is_deterministic(
        loc in arb_location(),
        ordinal in 0usize..16,
        format in arb_format(),
        prefix in proptest::option::of("[a-z-]{0,6}"),
    ) {
        let key = loc.key();
        let a = format_literal(&key, ordinal, format, prefix.as_deref());
        let b = format_literal(&loc.key(), ordinal, format, prefix.as_deref());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn formats_never_share_a_literal(loc in arb_location(), ordinal in 0usize..16) {
        let key = loc.key();
        let literals: Vec<String> = IdFormat::ALL
            .iter()
            .map(|f| format_literal(&key, ordinal, *f, None))
            .collect();
        for i in 0..literals.len() {
            for j in i + 1..literals.len() {
                prop_assert_ne!(&literals[i], &literals[j]);
            }
        }
    }

    #[test]
    fn prefix_composes(
        loc in arb_location(),
        ordinal in 0usize..16,
        format in arb_format(),
        prefix in "[ -~]{0,10}",
    ) {
        let key = loc.key();
        let bare = format_literal(&key, ordinal, format, None);
        let prefixed = format_literal(&key, ordinal, format, Some(&prefix));
        prop_assert_eq!(prefixed, format!("{}{}", prefix, bare));
    }

    #[test]
    fn html_id_starts_with_letter(loc in arb_location(), ordinal in 0usize..64) {
        let lit = format_literal(&loc.key(), ordinal, IdFormat::HtmlId, None);
        prop_assert!(lit.starts_with(|c: char| c.is_ascii_alphabetic()), "{}", lit);
        prop_assert!(lit.len() == 8 || (lit.len() == 9 && lit.starts_with('x')));
    }

    #[test]
    fn guid_is_32_lowercase_hex(loc in arb_location(), ordinal in 0usize..64) {
        let lit = format_literal(&loc.key(), ordinal, IdFormat::Guid, None);
        prop_assert_eq!(lit.len(), 32);
        prop_assert!(lit.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')), "{}", lit);
    }

    #[test]
    fn ordinals_do_not_collide(loc in arb_location(), a in 0usize..32, b in 0usize..32) {
        prop_assume!(a != b);
        let key = loc.key();
        prop_assert_ne!(
            format_literal(&key, a, IdFormat::Guid, None),
            format_literal(&key, b, IdFormat::Guid, None)
        );
    }

    #[test]
    fn distinct_sites_do_not_collide(
        x in arb_location(),
        y in arb_location(),
        format in arb_format(),
    ) {
        prop_assume!(x != y);
        prop_assert_ne!(x.key(), y.key());
        // ShortHash keeps 48 bits; collisions there are possible but not at this scale.
        prop_assert_ne!(
            format_literal(&x.key(), 0, format, None),
            format_literal(&y.key(), 0, format, None)
        );
    }

    #[test]
    fn key_round_trips(loc in arb_location()) {
        let key = derive_location_key(&loc.file, loc.line, loc.column);
        prop_assert_eq!(key.components(), Some((loc.file.as_str(), loc.line, loc.column)));
    }
}

// ── Routine binding ────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn all_marked_supplied_passes_through(
        rec in arb_record(),
        values in prop::collection::vec("[a-z0-9]{1,6}", 6),
    ) {
        let plan = InterceptorPlan::for_record(&rec).unwrap();
        let supplied: Vec<Option<&str>> = values
            .iter()
            .take(rec.parameters.len())
            .map(|v| Some(v.as_str()))
            .collect();
        let binding = plan.bind(&supplied);
        let expected: Vec<Option<String>> =
            supplied.iter().map(|v| v.map(str::to_string)).collect();
        prop_assert_eq!(binding, Binding::PassThrough(expected));
    }

    #[test]
    fn each_marked_parameter_is_synthesized_independently(
        rec in arb_record(),
        present in prop::collection::vec(any::<bool>(), 6),
    ) {
        let plan = InterceptorPlan::for_record(&rec).unwrap();
        let supplied: Vec<Option<String>> = (0..rec.parameters.len())
            .map(|i| present[i].then(|| format!("caller-{}", i)))
            .collect();
        let refs: Vec<Option<&str>> = supplied.iter().map(|v| v.as_deref()).collect();
        let binding = plan.bind(&refs);

        let any_marked_missing = rec
            .marked_parameters
            .iter()
            .any(|m| supplied[m.ordinal].is_none());
        prop_assert_eq!(matches!(binding, Binding::Synthesized(_)), any_marked_missing);

        let args = binding.arguments();
        for (i, arg) in args.iter().enumerate() {
            let marked = rec.marked_parameters.iter().find(|m| m.ordinal == i);
            match (&supplied[i], marked) {
                (Some(v), _) => prop_assert_eq!(arg.as_deref(), Some(v.as_str())),
                (None, Some(m)) => {
                    let expected = rec.literal_for(m);
                    prop_assert_eq!(arg.as_deref(), Some(expected.as_str()));
                }
                (None, None) => prop_assert_eq!(arg, &None),
            }
        }
    }
}

// ── Concrete scenarios ─────────────────────────────────────────────────────

#[test]
fn html_id_scenario_is_stable() {
    let key = derive_location_key("/src/Html.cs", 10, 5);
    let html = format_literal(&key, 0, IdFormat::HtmlId, None);
    let guid = format_literal(&key, 0, IdFormat::Guid, None);
    assert_eq!(html, "x5Z5JHAyN");
    assert_eq!(guid, "8e5c1f9870a2dd69bf3ff824fded7ddc");
    assert!(!guid.contains(&html));
}
