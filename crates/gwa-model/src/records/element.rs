use gwa_codec::{FieldReader, FieldSpec, FieldWriter, FormatError, RecordCodec, RecordSchema, wire_enum};

wire_enum! {
    pub enum ElementType {
        Bar => "BAR",
        Beam => "BEAM",
        Rod => "ROD",
        Spring => "SPRING",
        Tri3 => "TRI3",
        Tri6 => "TRI6",
        Quad4 => "QUAD4",
        Quad8 => "QUAD8",
        Brick8 => "BRICK8",
    }
}

impl ElementType {
    /// Node count of the element topology.
    pub fn node_count(self) -> usize {
        match self {
            ElementType::Bar | ElementType::Beam | ElementType::Rod | ElementType::Spring => 2,
            ElementType::Tri3 => 3,
            ElementType::Quad4 => 4,
            ElementType::Tri6 => 6,
            ElementType::Quad8 | ElementType::Brick8 => 8,
        }
    }
}

const RELEASE_DEFAULTS: &[&str] = &["NO_RLS", "0", "0", "0", "0"];

/// `EL.4`: an analysis element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: Option<String>,
    pub colour: Option<String>,
    pub element_type: ElementType,
    /// `SECTION` index.
    pub property: u32,
    pub group: Option<u32>,
    /// `NODE` indices.
    pub topology: Vec<u32>,
    pub orient_node: Option<u32>,
    pub orient_angle: Option<f64>,
    /// Release and offset slots, not interpreted.
    pub releases: Vec<String>,
}

impl Element {
    pub fn new(element_type: ElementType, property: u32, topology: Vec<u32>) -> Self {
        Self {
            name: None,
            colour: None,
            element_type,
            property,
            group: None,
            topology,
            orient_node: None,
            orient_angle: None,
            releases: Vec::new(),
        }
    }
}

impl RecordCodec for Element {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        keyword: "EL",
        version: 4,
        fields: &[
            FieldSpec::optional("name", ""),
            FieldSpec::optional("colour", "NO_RGB"),
            FieldSpec::required("type"),
            FieldSpec::required("property"),
            FieldSpec::optional("group", "0"),
            FieldSpec::counted_list("topology"),
            FieldSpec::optional("orient_node", "0"),
            FieldSpec::optional("orient_angle", "0"),
            FieldSpec::unmodelled("releases", RELEASE_DEFAULTS),
        ],
    };

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        let name = r.optional()?;
        let colour = r.optional()?;
        let element_type: ElementType = r.required()?;
        let property = r.required()?;
        let group = r.optional()?;
        let at = r.position();
        let topology: Vec<u32> = r.counted_list()?;
        if topology.len() != element_type.node_count() {
            return Err(FormatError::new(
                Self::SCHEMA.keyword,
                "topology",
                at,
                Some(&topology.len().to_string()),
                format!(
                    "{} expects {} nodes",
                    element_type.as_wire(),
                    element_type.node_count()
                ),
            ));
        }
        Ok(Self {
            name,
            colour,
            element_type,
            property,
            group,
            topology,
            orient_node: r.optional()?,
            orient_angle: r.optional()?,
            releases: r.unmodelled()?,
        })
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.optional(self.name.as_ref())
            .optional(self.colour.as_ref())
            .required(&self.element_type)
            .required(&self.property)
            .optional(self.group.as_ref())
            .counted_list(&self.topology)
            .optional(self.orient_node.as_ref())
            .optional(self.orient_angle.as_ref())
            .unmodelled(&self.releases);
    }
}
