use gwa_codec::{CommandVerb, RecordCodec, SidTag};

use crate::records::{
    Axis, Combination, Element, GridPlane, GridSurface, LoadTitle, Member, Node, Section,
};

/// A link from one record to another by `(keyword, index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reference {
    pub keyword: &'static str,
    pub index: u32,
}

impl Reference {
    pub fn new(keyword: &'static str, index: u32) -> Self {
        Self { keyword, index }
    }
}

/// Every record shape this crate understands, plus the opaque remainder.
#[derive(Debug, Clone, PartialEq)]
pub enum GwaObject {
    Axis(Axis),
    Node(Node),
    Element(Element),
    Member(Member),
    Section(Section),
    GridPlane(GridPlane),
    GridSurface(GridSurface),
    LoadTitle(LoadTitle),
    Combination(Combination),
    /// A keyword with no codec; the line is carried verbatim.
    Unsupported { keyword: String, gwa: String },
}

macro_rules! object_variants {
    ($($variant:ident),+ $(,)?) => {
        $(impl From<$variant> for GwaObject {
            fn from(record: $variant) -> Self {
                GwaObject::$variant(record)
            }
        })+

        impl GwaObject {
            pub fn keyword(&self) -> &str {
                match self {
                    $(GwaObject::$variant(_) => $variant::SCHEMA.keyword,)+
                    GwaObject::Unsupported { keyword, .. } => keyword,
                }
            }

            /// Writes the record; an unsupported record keeps its original
            /// fields under the given verb, index and identifier tag.
            pub fn encode(&self, verb: CommandVerb, index: u32, sid: &SidTag) -> String {
                match self {
                    $(GwaObject::$variant(r) => r.encode(verb, index, sid),)+
                    GwaObject::Unsupported { gwa, .. } => {
                        gwa_codec::set_header(gwa, verb, index, sid)
                    }
                }
            }
        }
    };
}

object_variants!(
    Axis,
    Node,
    Element,
    Member,
    Section,
    GridPlane,
    GridSurface,
    LoadTitle,
    Combination,
);

impl GwaObject {
    pub fn is_supported(&self) -> bool {
        !matches!(self, GwaObject::Unsupported { .. })
    }

    /// Records this one points at. Index 0 means "none" on the wire and is
    /// never reported.
    pub fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        let mut push = |keyword: &'static str, index: u32| {
            if index > 0 {
                refs.push(Reference::new(keyword, index));
            }
        };

        match self {
            GwaObject::Node(node) => {
                if let Some(axis) = node.local_axis() {
                    push("AXIS", axis);
                }
            }
            GwaObject::Element(el) => {
                for &n in &el.topology {
                    push("NODE", n);
                }
                push("NODE", el.orient_node.unwrap_or(0));
                push("SECTION", el.property);
            }
            GwaObject::Member(memb) => {
                for n in memb.nodes() {
                    push("NODE", n);
                }
                push("SECTION", memb.property.unwrap_or(0));
            }
            GwaObject::Section(section) => {
                for (keyword, index) in section.materials() {
                    push(keyword, index);
                }
            }
            GwaObject::GridPlane(plane) => push("AXIS", plane.axis),
            GwaObject::GridSurface(surface) => push("GRID_PLANE", surface.plane),
            GwaObject::Combination(combo) => {
                for case in combo.cases().unwrap_or_default() {
                    let keyword = match case.letter() {
                        'L' => "LOAD_TITLE",
                        'C' => "COMBINATION",
                        'A' => "ANAL",
                        _ => continue,
                    };
                    push(keyword, case.number().unwrap_or(0));
                }
            }
            GwaObject::Axis(_) | GwaObject::LoadTitle(_) | GwaObject::Unsupported { .. } => {}
        }

        refs.sort();
        refs.dedup();
        refs
    }
}
