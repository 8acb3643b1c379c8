use matgraph_model::relationship::{group_item_values, item_reference, is_canonical_group};
use matgraph_model::{Domain, Presentation, RelationshipGroup, RelationshipItem, SectionMetadata};
use proptest::prelude::*;

fn slug() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9]{0,8}(-[a-z0-9]{1,6}){0,2}").unwrap()
}

fn domain() -> impl Strategy<Value = Domain> {
    prop_oneof![
        Just(Domain::Material),
        Just(Domain::Contaminant),
        Just(Domain::Compound),
        Just(Domain::Setting),
        Just(Domain::Application),
    ]
}

fn presentation() -> impl Strategy<Value = Presentation> {
    prop_oneof![
        Just(Presentation::Card),
        Just(Presentation::Table),
        Just(Presentation::Descriptive),
    ]
}

fn section() -> impl Strategy<Value = SectionMetadata> {
    (
        proptest::option::of(slug()),
        proptest::option::of(slug()),
        proptest::option::of(0i64..50),
        proptest::option::of(slug()),
    )
        .prop_map(|(title, icon, order, variant)| SectionMetadata {
            title,
            icon,
            order,
            variant,
            ..Default::default()
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn canonical_groups_are_recognized_and_expose_their_references(
        p in presentation(),
        s in section(),
        refs in proptest::collection::vec((slug(), domain()), 0..6),
    ) {
        let mut g = RelationshipGroup::new(p, Some(s));
        for (id, d) in &refs {
            g.items.push(RelationshipItem::reference(id.clone(), *d));
        }
        let v = g.to_value().unwrap();
        prop_assert!(is_canonical_group(&v));

        let items = group_item_values(&v);
        prop_assert_eq!(items.len(), refs.len());
        for (item, (id, d)) in items.iter().zip(&refs) {
            let (got_id, got_type) = item_reference(item).unwrap();
            prop_assert_eq!(got_id, id.as_str());
            prop_assert_eq!(got_type.and_then(Domain::from_tag), Some(*d));
        }
    }

    #[test]
    fn section_fill_is_a_left_biased_merge(a in section(), b in section()) {
        let merged = a.filled_from(&b);
        prop_assert_eq!(merged.title.clone(), a.title.clone().or(b.title.clone()));
        prop_assert_eq!(merged.icon.clone(), a.icon.clone().or(b.icon.clone()));
        prop_assert_eq!(merged.order, a.order.or(b.order));
        // Filling twice changes nothing.
        prop_assert_eq!(merged.filled_from(&b), merged);
    }

    #[test]
    fn presentation_parses_its_own_name(p in presentation()) {
        prop_assert_eq!(Presentation::parse(p.as_str()), Some(p));
    }
}
