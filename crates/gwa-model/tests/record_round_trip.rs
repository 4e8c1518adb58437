/// Round-trip properties for every supported record type
///
/// Each record is built with arbitrary values in all modelled fields,
/// encoded under an arbitrary index and identifier tag, and read back.
/// Optional fields with a non-empty wire default are always set, since an
/// unset one reads back as its default.

use gwa_codec::{CommandVerb, Decoded, RecordCodec, SidTag, TagGroup, TaggedList, join_tokens};
use gwa_model::records::{
    Activity, Axis, AxisKind, Combination, Element, ElementType, Exposure, GridElementKind,
    GridExpansion, GridPlane, GridPlaneType, GridSpan, GridSurface, LoadCaseType, LoadTitle,
    MaterialType, Member, MemberType, Node, Section, SectionComp, SectionComponent,
    SectionConcrete, SectionPart, SectionSteel, TOPOLOGY_TAGS,
};
use proptest::collection::vec;
use proptest::option;
use proptest::prelude::*;
use proptest::sample::select;
use proptest::test_runner::TestCaseError;

/// Free text that never reads as a keyword, verb or empty token.
fn text() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 ]{0,10}"
}

fn number() -> impl Strategy<Value = f64> {
    -1.0e6..1.0e6f64
}

fn xyz() -> impl Strategy<Value = [f64; 3]> {
    (number(), number(), number()).prop_map(|(x, y, z)| [x, y, z])
}

fn word() -> impl Strategy<Value = String> {
    "[A-Z0-9]{1,6}"
}

fn sid() -> impl Strategy<Value = SidTag> {
    (option::of("[a-z0-9/]{1,8}"), option::of("[a-z0-9]{1,8}"))
        .prop_map(|(app, stream)| SidTag::new(app.as_deref(), stream.as_deref()))
}

fn index() -> impl Strategy<Value = u32> {
    1u32..100_000
}

fn reread<T: RecordCodec>(
    record: &T,
    index: u32,
    sid: &SidTag,
) -> Result<Decoded<T>, TestCaseError> {
    let line = record.encode(CommandVerb::Set, index, sid);
    let decoded = T::decode(&line).map_err(|e| TestCaseError::fail(format!("{line}: {e}")))?;
    prop_assert_eq!(decoded.header.index, index);
    prop_assert_eq!(&decoded.header.sid, sid);
    prop_assert!(decoded.trailing.is_empty(), "trailing tokens in {}", line);
    Ok(decoded)
}

fn axis() -> impl Strategy<Value = Axis> {
    (text(), select(AxisKind::ALL), xyz(), xyz(), xyz()).prop_map(
        |(name, kind, origin, x_dir, xy_dir)| Axis {
            name,
            kind,
            origin,
            x_dir,
            xy_dir,
        },
    )
}

fn node() -> impl Strategy<Value = Node> {
    (
        option::of(text()),
        text(),
        xyz(),
        text(),
        any::<u32>(),
        number(),
    )
        .prop_map(|(name, colour, [x, y, z], restraint, axis, mesh_size)| Node {
            name,
            colour: Some(colour),
            x,
            y,
            z,
            restraint: Some(restraint),
            axis: Some(axis),
            mesh_size: Some(mesh_size),
        })
}

fn element() -> impl Strategy<Value = Element> {
    let topology = select(ElementType::ALL)
        .prop_flat_map(|kind| (Just(kind), vec(1u32..10_000, kind.node_count())));
    (
        topology,
        option::of(text()),
        text(),
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
        number(),
        vec(word(), 1..6),
    )
        .prop_map(
            |(
                (element_type, topology),
                name,
                colour,
                property,
                group,
                orient_node,
                angle,
                releases,
            )| {
                Element {
                    name,
                    colour: Some(colour),
                    element_type,
                    property,
                    group: Some(group),
                    topology,
                    orient_node: Some(orient_node),
                    orient_angle: Some(angle),
                    releases,
                }
            },
        )
}

fn topology() -> impl Strategy<Value = TaggedList<u32>> {
    let group = (select(TOPOLOGY_TAGS), vec(1u32..10_000, 0..4))
        .prop_map(|(tag, items)| TagGroup { tag, items });
    (vec(1u32..10_000, 0..6), vec(group, 0..3))
        .prop_map(|(main, groups)| TaggedList { main, groups })
}

fn member() -> impl Strategy<Value = Member> {
    (
        (
            option::of(text()),
            text(),
            select(MemberType::ALL),
            select(Exposure::ALL),
            any::<u32>(),
            any::<u32>(),
        ),
        (
            topology(),
            any::<u32>(),
            number(),
            number(),
            select(Activity::ALL),
            vec(word(), 1..8),
        ),
    )
        .prop_map(
            |(
                (name, colour, member_type, exposure, property, group),
                (topology, orient_node, orient_angle, mesh_size, activity, tail),
            )| Member {
                name,
                colour: Some(colour),
                member_type,
                exposure,
                property: Some(property),
                group: Some(group),
                topology,
                orient_node: Some(orient_node),
                orient_angle: Some(orient_angle),
                mesh_size: Some(mesh_size),
                activity: Some(activity),
                tail,
            },
        )
}

fn section_comp() -> impl Strategy<Value = SectionComp> {
    (
        (
            option::of(text()),
            option::of(text()),
            any::<u32>(),
            select(MaterialType::ALL),
            any::<u32>(),
            text(),
        ),
        (number(), number(), number(), text(), any::<u32>()),
    )
        .prop_map(
            |(
                (reference, name, analysis_material, material_type, material, profile),
                (offset_y, offset_z, rotation, reflect, pool),
            )| SectionComp {
                reference,
                name,
                analysis_material: Some(analysis_material),
                material_type,
                material,
                profile,
                offset_y: Some(offset_y),
                offset_z: Some(offset_z),
                rotation: Some(rotation),
                reflect: Some(reflect),
                pool: Some(pool),
            },
        )
}

fn section_steel() -> impl Strategy<Value = SectionSteel> {
    (
        option::of(text()),
        any::<u32>(),
        (number(), number(), number(), number()),
        (text(), text(), text()),
    )
        .prop_map(
            |(
                reference,
                grade,
                (plastic_elastic, net_gross, exposed, beta),
                (classification, plate, lock),
            )| {
                SectionSteel {
                    reference,
                    grade,
                    plastic_elastic: Some(plastic_elastic),
                    net_gross: Some(net_gross),
                    exposed: Some(exposed),
                    beta: Some(beta),
                    classification: Some(classification),
                    plate: Some(plate),
                    lock: Some(lock),
                }
            },
        )
}

fn section_concrete() -> impl Strategy<Value = SectionConcrete> {
    (option::of(text()), any::<u32>(), number()).prop_map(|(reference, grade, aggregate)| {
        SectionConcrete {
            reference,
            grade,
            aggregate_size: Some(aggregate),
        }
    })
}

/// Leftover tokens, empty ones included, that follow a component.
fn loose_tokens() -> impl Strategy<Value = Vec<String>> {
    vec("[a-z0-9]{0,4}", 0..3)
}

fn section_part() -> impl Strategy<Value = SectionPart> {
    let component = prop_oneof![
        section_comp().prop_map(SectionComponent::Comp),
        section_steel().prop_map(SectionComponent::Steel),
        section_concrete().prop_map(SectionComponent::Concrete),
    ];
    (component, loose_tokens()).prop_map(|(component, unsupported)| SectionPart {
        component,
        unsupported,
    })
}

fn section() -> impl Strategy<Value = Section> {
    (
        (
            text(),
            text(),
            text(),
            any::<u32>(),
            text(),
            number(),
            number(),
        ),
        (number(), number(), number(), number(), number(), number()),
        (
            vec(section_part(), 0..4),
            loose_tokens(),
            vec("[a-z0-9]{1,6}", 3),
        ),
    )
        .prop_map(
            |(
                (colour, name, member_type, pool, reference_point, ref_y, ref_z),
                (mass, fraction, cost, left, right, slab),
                (components, unsupported, environment),
            )| Section {
                colour: Some(colour),
                name,
                member_type: Some(member_type),
                pool: Some(pool),
                reference_point: Some(reference_point),
                ref_y: Some(ref_y),
                ref_z: Some(ref_z),
                mass: Some(mass),
                fraction: Some(fraction),
                cost: Some(cost),
                left: Some(left),
                right: Some(right),
                slab: Some(slab),
                components,
                unsupported,
                environment,
            },
        )
}

fn grid_plane() -> impl Strategy<Value = GridPlane> {
    (
        text(),
        select(GridPlaneType::ALL),
        any::<u32>(),
        number(),
        number(),
        number(),
    )
        .prop_map(|(name, plane_type, axis, elevation, below, above)| GridPlane {
            name,
            plane_type,
            axis,
            elevation,
            tolerance_below: Some(below),
            tolerance_above: Some(above),
        })
}

fn grid_surface() -> impl Strategy<Value = GridSurface> {
    (
        (text(), any::<u32>(), select(GridElementKind::ALL), text()),
        (number(), select(GridSpan::ALL), number(), select(GridExpansion::ALL)),
    )
        .prop_map(
            |((name, plane, element_kind, elements), (tolerance, span, angle, expansion))| {
                GridSurface {
                    name,
                    plane,
                    element_kind,
                    elements: Some(elements),
                    tolerance: Some(tolerance),
                    span,
                    angle: Some(angle),
                    expansion: Some(expansion),
                }
            },
        )
}

fn load_title() -> impl Strategy<Value = LoadTitle> {
    (
        text(),
        select(LoadCaseType::ALL),
        any::<u32>(),
        text(),
        text(),
        text(),
    )
        .prop_map(|(title, case_type, source, category, direction, include)| LoadTitle {
            title,
            case_type,
            source: Some(source),
            category: Some(category),
            direction: Some(direction),
            include: Some(include),
        })
}

/// Sums of factored cases such as `1.35L1 + C2 + 0.9A7`.
fn case_expression() -> impl Strategy<Value = String> {
    let factors: &'static [&'static str] = &["", "1.35", "1.5", "0.9", "2"];
    let term = (select(factors), select(&['L', 'C', 'A'][..]), 1u32..60)
        .prop_map(|(factor, letter, case)| format!("{factor}{letter}{case}"));
    vec(term, 1..5).prop_map(|terms| terms.join(" + "))
}

fn combination() -> impl Strategy<Value = Combination> {
    (text(), case_expression(), option::of(text()), option::of(text())).prop_map(
        |(name, description, bridge, note)| Combination {
            name,
            description,
            bridge,
            note,
        },
    )
}

proptest! {
    #[test]
    fn test_axis_round_trip(record in axis(), index in index(), sid in sid()) {
        prop_assert_eq!(reread(&record, index, &sid)?.record, record);
    }

    #[test]
    fn test_node_round_trip(record in node(), index in index(), sid in sid()) {
        prop_assert_eq!(reread(&record, index, &sid)?.record, record);
    }

    #[test]
    fn test_element_round_trip(record in element(), index in index(), sid in sid()) {
        prop_assert_eq!(reread(&record, index, &sid)?.record, record);
    }

    #[test]
    fn test_member_round_trip(record in member(), index in index(), sid in sid()) {
        prop_assert_eq!(reread(&record, index, &sid)?.record, record);
    }

    #[test]
    fn test_section_round_trip(record in section(), index in index(), sid in sid()) {
        prop_assert_eq!(reread(&record, index, &sid)?.record, record);
    }

    #[test]
    fn test_section_components_round_trip_on_their_own(
        comp in section_comp(),
        steel in section_steel(),
        concrete in section_concrete(),
    ) {
        let tokens = comp.encode_embedded();
        prop_assert_eq!(SectionComp::decode_embedded(&join_tokens(&tokens))?, (comp, Vec::new()));
        let tokens = steel.encode_embedded();
        prop_assert_eq!(SectionSteel::decode_embedded(&join_tokens(&tokens))?, (steel, Vec::new()));
        let tokens = concrete.encode_embedded();
        let decoded = SectionConcrete::decode_embedded(&join_tokens(&tokens))?;
        prop_assert_eq!(decoded, (concrete, Vec::new()));
    }

    #[test]
    fn test_grid_plane_round_trip(record in grid_plane(), index in index(), sid in sid()) {
        prop_assert_eq!(reread(&record, index, &sid)?.record, record);
    }

    #[test]
    fn test_grid_surface_round_trip(record in grid_surface(), index in index(), sid in sid()) {
        prop_assert_eq!(reread(&record, index, &sid)?.record, record);
    }

    #[test]
    fn test_load_title_round_trip(record in load_title(), index in index(), sid in sid()) {
        prop_assert_eq!(reread(&record, index, &sid)?.record, record);
    }

    #[test]
    fn test_combination_round_trip(record in combination(), index in index(), sid in sid()) {
        prop_assert_eq!(reread(&record, index, &sid)?.record, record);
    }
}

#[test]
fn test_unset_optionals_read_back_as_wire_defaults() {
    let line = Node::at(1.0, 2.0, 3.0).encode(CommandVerb::Set, 4, &SidTag::default());
    let node = Node::decode(&line).expect("node").record;
    assert_eq!(node.name, None);
    assert_eq!(node.colour.as_deref(), Some("NO_RGB"));
    assert_eq!(node.restraint.as_deref(), Some("free"));
    assert_eq!(node.axis, Some(0));
    assert_eq!(node.mesh_size, Some(0.0));

    let line = LoadTitle::new("dead", LoadCaseType::Dead).encode(
        CommandVerb::Set,
        1,
        &SidTag::default(),
    );
    let title = LoadTitle::decode(&line).expect("load title").record;
    assert_eq!(title.source, Some(1));
    assert_eq!(title.category.as_deref(), Some("~"));
    assert_eq!(title.include.as_deref(), Some("INC_BOTH"));
}
