use gwa_codec::{
    FieldReader, FieldSpec, FieldWriter, FormatError, RecordCodec, RecordSchema, TaggedList,
    wire_enum,
};

wire_enum! {
    pub enum MemberType {
        Beam => "BEAM",
        Column => "COLUMN",
        Generic1d => "1D_GENERIC",
        Slab => "SLAB",
        Wall => "WALL",
        Generic2d => "2D_GENERIC",
        VoidCutter1d => "1D_VOID_CUTTER",
        VoidCutter2d => "2D_VOID_CUTTER",
    }
}

impl MemberType {
    pub fn is_1d(self) -> bool {
        matches!(
            self,
            MemberType::Beam | MemberType::Column | MemberType::Generic1d | MemberType::VoidCutter1d
        )
    }
}

wire_enum! {
    pub enum Exposure {
        All => "ALL",
        Top => "TOP",
        Sides => "SIDES",
        Bottom => "BOTTOM",
        None => "NONE",
    }
}

wire_enum! {
    pub enum Activity {
        Active => "ACTIVE",
        Dummy => "DUMMY",
    }
}

/// Tags allowed after a member's main topology: `V` voids, `P` points,
/// `L` lines and `A` areas.
pub const TOPOLOGY_TAGS: &[char] = &['V', 'P', 'L', 'A'];

const TAIL_DEFAULTS: &[&str] = &[
    "FFFFFF",
    "FFFFFF",
    "AUTOMATIC",
    "0",
    "0",
    "0",
    "NO_OFFSET",
];

/// `MEMB.8`: a design member spanning a topology of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: Option<String>,
    pub colour: Option<String>,
    pub member_type: MemberType,
    pub exposure: Exposure,
    /// `SECTION` index.
    pub property: Option<u32>,
    pub group: Option<u32>,
    /// `NODE` indices, `1 2 3 V(4 5) P(6)`.
    pub topology: TaggedList<u32>,
    pub orient_node: Option<u32>,
    pub orient_angle: Option<f64>,
    pub mesh_size: Option<f64>,
    pub activity: Option<Activity>,
    /// Releases, restraint and offset slots.
    pub tail: Vec<String>,
}

impl Member {
    pub fn new(member_type: MemberType, topology: TaggedList<u32>) -> Self {
        Self {
            name: None,
            colour: None,
            member_type,
            exposure: Exposure::All,
            property: None,
            group: None,
            topology,
            orient_node: None,
            orient_angle: None,
            mesh_size: None,
            activity: None,
            tail: Vec::new(),
        }
    }

    /// Every node referenced by the topology, voids and inclusions included.
    pub fn nodes(&self) -> impl Iterator<Item = u32> + '_ {
        self.topology
            .all_items()
            .copied()
            .chain(self.orient_node.filter(|n| *n > 0))
    }
}

impl RecordCodec for Member {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        keyword: "MEMB",
        version: 8,
        fields: &[
            FieldSpec::optional("name", ""),
            FieldSpec::optional("colour", "NO_RGB"),
            FieldSpec::required("type"),
            FieldSpec::required("exposure"),
            FieldSpec::optional("property", "0"),
            FieldSpec::optional("group", "0"),
            FieldSpec::tagged("topology", TOPOLOGY_TAGS),
            FieldSpec::optional("orient_node", "0"),
            FieldSpec::optional("orient_angle", "0"),
            FieldSpec::optional("mesh_size", "0"),
            FieldSpec::optional("activity", "ACTIVE"),
            FieldSpec::unmodelled("tail", TAIL_DEFAULTS),
        ],
    };

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            name: r.optional()?,
            colour: r.optional()?,
            member_type: r.required()?,
            exposure: r.required()?,
            property: r.optional()?,
            group: r.optional()?,
            topology: r.tagged()?,
            orient_node: r.optional()?,
            orient_angle: r.optional()?,
            mesh_size: r.optional()?,
            activity: r.optional()?,
            tail: r.unmodelled()?,
        })
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.optional(self.name.as_ref())
            .optional(self.colour.as_ref())
            .required(&self.member_type)
            .required(&self.exposure)
            .optional(self.property.as_ref())
            .optional(self.group.as_ref())
            .tagged(&self.topology)
            .optional(self.orient_node.as_ref())
            .optional(self.orient_angle.as_ref())
            .optional(self.mesh_size.as_ref())
            .optional(self.activity.as_ref())
            .unmodelled(&self.tail);
    }
}
