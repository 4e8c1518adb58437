//! `SECTION.7` and the component sub-records that share its line.
//!
//! A section line is laid out as
//!
//! ```text
//! SET  SECTION.7  idx  <own fields>  num  { SECTION_COMP.4 ... | SECTION_STEEL.2 ... | SECTION_CONC.6 ... }  0  0  NO_ENVIRON
//! ```
//!
//! Components are located by keyword after the section's own fields, each is
//! decoded by its own schema. Sub-records with no codec (for example
//! `SECTION_COVER`) stay attached to the component they follow and are
//! written back verbatim. The three environment tokens always close the line.

use gwa_codec::{
    EmbeddedPiece, FieldReader, FieldSpec, FieldWriter, FormatError, RecordCodec, RecordSchema,
    join_tokens, partition_embedded, split_tokens, wire_enum,
};

wire_enum! {
    pub enum MaterialType {
        Generic => "GENERIC",
        Steel => "STEEL",
        Concrete => "CONCRETE",
        Aluminium => "ALUMINIUM",
        Glass => "GLASS",
        Frp => "FRP",
        Timber => "TIMBER",
    }
}

impl MaterialType {
    /// Keyword of the material record a component's `material` index points at.
    pub fn material_keyword(self) -> &'static str {
        match self {
            MaterialType::Generic => "MAT_ANAL",
            MaterialType::Steel => "MAT_STEEL",
            MaterialType::Concrete => "MAT_CONCRETE",
            MaterialType::Aluminium => "MAT_ALUMINIUM",
            MaterialType::Glass => "MAT_GLASS",
            MaterialType::Frp => "MAT_FRP",
            MaterialType::Timber => "MAT_TIMBER",
        }
    }
}

pub const COMPONENT_KEYWORDS: &[&str] = &["SECTION_COMP", "SECTION_STEEL", "SECTION_CONC"];

const ENVIRONMENT_DEFAULTS: &[&str] = &["0", "0", "NO_ENVIRON"];

/// `SECTION_COMP.4`: the profile and material of one part of a section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionComp {
    pub reference: Option<String>,
    pub name: Option<String>,
    pub analysis_material: Option<u32>,
    pub material_type: MaterialType,
    pub material: u32,
    /// Profile description, e.g. `STD I 600 200 15 25`.
    pub profile: String,
    pub offset_y: Option<f64>,
    pub offset_z: Option<f64>,
    pub rotation: Option<f64>,
    pub reflect: Option<String>,
    pub pool: Option<u32>,
}

impl SectionComp {
    pub fn new(material_type: MaterialType, material: u32, profile: impl Into<String>) -> Self {
        Self {
            reference: None,
            name: None,
            analysis_material: None,
            material_type,
            material,
            profile: profile.into(),
            offset_y: None,
            offset_z: None,
            rotation: None,
            reflect: None,
            pool: None,
        }
    }
}

impl RecordCodec for SectionComp {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        keyword: "SECTION_COMP",
        version: 4,
        fields: &[
            FieldSpec::optional("ref", ""),
            FieldSpec::optional("name", ""),
            FieldSpec::optional("analysis_material", "0"),
            FieldSpec::required("material_type"),
            FieldSpec::required("material"),
            FieldSpec::required("profile"),
            FieldSpec::optional("offset_y", "0"),
            FieldSpec::optional("offset_z", "0"),
            FieldSpec::optional("rotation", "0"),
            FieldSpec::optional("reflect", "NONE"),
            FieldSpec::optional("pool", "0"),
        ],
    };

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            reference: r.optional()?,
            name: r.optional()?,
            analysis_material: r.optional()?,
            material_type: r.required()?,
            material: r.required()?,
            profile: r.required()?,
            offset_y: r.optional()?,
            offset_z: r.optional()?,
            rotation: r.optional()?,
            reflect: r.optional()?,
            pool: r.optional()?,
        })
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.optional(self.reference.as_ref())
            .optional(self.name.as_ref())
            .optional(self.analysis_material.as_ref())
            .required(&self.material_type)
            .required(&self.material)
            .required(&self.profile)
            .optional(self.offset_y.as_ref())
            .optional(self.offset_z.as_ref())
            .optional(self.rotation.as_ref())
            .optional(self.reflect.as_ref())
            .optional(self.pool.as_ref());
    }
}

/// `SECTION_STEEL.2`: steel design parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSteel {
    pub reference: Option<String>,
    pub grade: u32,
    pub plastic_elastic: Option<f64>,
    pub net_gross: Option<f64>,
    pub exposed: Option<f64>,
    pub beta: Option<f64>,
    pub classification: Option<String>,
    pub plate: Option<String>,
    pub lock: Option<String>,
}

impl RecordCodec for SectionSteel {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        keyword: "SECTION_STEEL",
        version: 2,
        fields: &[
            FieldSpec::optional("ref", ""),
            FieldSpec::required("grade"),
            FieldSpec::optional("plastic_elastic", "1"),
            FieldSpec::optional("net_gross", "1"),
            FieldSpec::optional("exposed", "0"),
            FieldSpec::optional("beta", "0.4"),
            FieldSpec::optional("classification", "UNDEF"),
            FieldSpec::optional("plate", "UNDEF"),
            FieldSpec::optional("lock", "NO_LOCK"),
        ],
    };

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            reference: r.optional()?,
            grade: r.required()?,
            plastic_elastic: r.optional()?,
            net_gross: r.optional()?,
            exposed: r.optional()?,
            beta: r.optional()?,
            classification: r.optional()?,
            plate: r.optional()?,
            lock: r.optional()?,
        })
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.optional(self.reference.as_ref())
            .required(&self.grade)
            .optional(self.plastic_elastic.as_ref())
            .optional(self.net_gross.as_ref())
            .optional(self.exposed.as_ref())
            .optional(self.beta.as_ref())
            .optional(self.classification.as_ref())
            .optional(self.plate.as_ref())
            .optional(self.lock.as_ref());
    }
}

/// `SECTION_CONC.6`: concrete design parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionConcrete {
    pub reference: Option<String>,
    pub grade: u32,
    pub aggregate_size: Option<f64>,
}

impl RecordCodec for SectionConcrete {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        keyword: "SECTION_CONC",
        version: 6,
        fields: &[
            FieldSpec::optional("ref", ""),
            FieldSpec::required("grade"),
            FieldSpec::optional("aggregate_size", "0.02"),
        ],
    };

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            reference: r.optional()?,
            grade: r.required()?,
            aggregate_size: r.optional()?,
        })
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.optional(self.reference.as_ref())
            .required(&self.grade)
            .optional(self.aggregate_size.as_ref());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionComponent {
    Comp(SectionComp),
    Steel(SectionSteel),
    Concrete(SectionConcrete),
}

impl SectionComponent {
    pub fn keyword(&self) -> &'static str {
        match self {
            SectionComponent::Comp(_) => SectionComp::SCHEMA.keyword,
            SectionComponent::Steel(_) => SectionSteel::SCHEMA.keyword,
            SectionComponent::Concrete(_) => SectionConcrete::SCHEMA.keyword,
        }
    }

    fn decode_piece(piece: &EmbeddedPiece<'_>) -> Result<(Self, Vec<String>), FormatError> {
        match piece.keyword {
            "SECTION_COMP" => SectionComp::decode_embedded(piece.text)
                .map(|(c, rest)| (SectionComponent::Comp(c), rest)),
            "SECTION_STEEL" => SectionSteel::decode_embedded(piece.text)
                .map(|(c, rest)| (SectionComponent::Steel(c), rest)),
            "SECTION_CONC" => SectionConcrete::decode_embedded(piece.text)
                .map(|(c, rest)| (SectionComponent::Concrete(c), rest)),
            other => Err(FormatError::new(
                Section::SCHEMA.keyword,
                "components",
                0,
                Some(other),
                "no codec for embedded keyword",
            )),
        }
    }

    fn encode_tokens(&self) -> Vec<String> {
        match self {
            SectionComponent::Comp(c) => c.encode_embedded(),
            SectionComponent::Steel(c) => c.encode_embedded(),
            SectionComponent::Concrete(c) => c.encode_embedded(),
        }
    }
}

/// A decoded component plus the unsupported sub-records that followed it.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionPart {
    pub component: SectionComponent,
    pub unsupported: Vec<String>,
}

impl From<SectionComponent> for SectionPart {
    fn from(component: SectionComponent) -> Self {
        Self {
            component,
            unsupported: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub colour: Option<String>,
    pub name: String,
    pub member_type: Option<String>,
    pub pool: Option<u32>,
    pub reference_point: Option<String>,
    pub ref_y: Option<f64>,
    pub ref_z: Option<f64>,
    pub mass: Option<f64>,
    pub fraction: Option<f64>,
    pub cost: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub slab: Option<f64>,
    pub components: Vec<SectionPart>,
    /// Sub-records between the section's own fields and its first component.
    pub unsupported: Vec<String>,
    pub environment: Vec<String>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            colour: None,
            name: name.into(),
            member_type: None,
            pool: None,
            reference_point: None,
            ref_y: None,
            ref_z: None,
            mass: None,
            fraction: None,
            cost: None,
            left: None,
            right: None,
            slab: None,
            components: Vec::new(),
            unsupported: Vec::new(),
            environment: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: SectionComponent) -> Self {
        self.components.push(component.into());
        self
    }

    /// `(material keyword, index)` of every `SECTION_COMP`.
    pub fn materials(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        self.components.iter().filter_map(|p| match &p.component {
            SectionComponent::Comp(c) => Some((c.material_type.material_keyword(), c.material)),
            _ => None,
        })
    }
}

impl RecordCodec for Section {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        keyword: "SECTION",
        version: 7,
        fields: &[
            FieldSpec::optional("colour", "NO_RGB"),
            FieldSpec::required("name"),
            FieldSpec::optional("member_type", "1D_GENERIC"),
            FieldSpec::optional("pool", "0"),
            FieldSpec::optional("reference_point", "CENTROID"),
            FieldSpec::optional("ref_y", "0"),
            FieldSpec::optional("ref_z", "0"),
            FieldSpec::optional("mass", "0"),
            FieldSpec::optional("fraction", "0"),
            FieldSpec::optional("cost", "0"),
            FieldSpec::optional("left", "0"),
            FieldSpec::optional("right", "0"),
            FieldSpec::optional("slab", "0"),
            FieldSpec::required("num"),
            FieldSpec::embedded("components", COMPONENT_KEYWORDS),
            FieldSpec::unmodelled("environment", ENVIRONMENT_DEFAULTS),
        ],
    };

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        let mut section = Section::new(String::new());
        section.colour = r.optional()?;
        section.name = r.required()?;
        section.member_type = r.optional()?;
        section.pool = r.optional()?;
        section.reference_point = r.optional()?;
        section.ref_y = r.optional()?;
        section.ref_z = r.optional()?;
        section.mass = r.optional()?;
        section.fraction = r.optional()?;
        section.cost = r.optional()?;
        section.left = r.optional()?;
        section.right = r.optional()?;
        section.slab = r.optional()?;
        let num_at = r.position();
        let num: usize = r.required()?;
        let keywords = r.embedded()?;
        let rest = r.unmodelled()?;

        let rest_line = join_tokens(&rest);
        let partition = partition_embedded(&rest_line, 0, keywords);
        let mut head = if partition.prefix.is_empty()
            && partition.pieces.first().is_none_or(|p| p.offset == 0)
        {
            Vec::new()
        } else {
            split_tokens(partition.prefix)
        };
        for piece in &partition.pieces {
            let (component, unsupported) = SectionComponent::decode_piece(piece)?;
            section.components.push(SectionPart {
                component,
                unsupported,
            });
        }

        if (num == 0) != section.components.is_empty() {
            return Err(FormatError::new(
                Self::SCHEMA.keyword,
                "num",
                num_at,
                Some(&num.to_string()),
                format!("line carries {} components", section.components.len()),
            ));
        }

        let last = match section.components.last_mut() {
            Some(part) => &mut part.unsupported,
            None => &mut head,
        };
        let cut = last.len().saturating_sub(ENVIRONMENT_DEFAULTS.len());
        section.environment = last.split_off(cut);
        section.unsupported = head;
        Ok(section)
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        let num = usize::from(!self.components.is_empty());
        w.optional(self.colour.as_ref())
            .required(&self.name)
            .optional(self.member_type.as_ref())
            .optional(self.pool.as_ref())
            .optional(self.reference_point.as_ref())
            .optional(self.ref_y.as_ref())
            .optional(self.ref_z.as_ref())
            .optional(self.mass.as_ref())
            .optional(self.fraction.as_ref())
            .optional(self.cost.as_ref())
            .optional(self.left.as_ref())
            .optional(self.right.as_ref())
            .optional(self.slab.as_ref())
            .required(&num)
            .raw(&self.unsupported)
            .embedded(self.components.iter().map(|part| {
                let mut tokens = part.component.encode_tokens();
                tokens.extend(part.unsupported.iter().cloned());
                tokens
            }))
            .unmodelled(&self.environment);
    }
}
