use gwa_codec::{FieldReader, FieldSpec, FieldWriter, FormatError, RecordCodec, RecordSchema, wire_enum};

wire_enum! {
    pub enum AxisKind {
        Cartesian => "CART",
        Cylindrical => "CYL",
        Spherical => "SPH",
    }
}

/// `AXIS.1`: a local coordinate system given by origin, x direction and a
/// vector in the xy plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub name: String,
    pub kind: AxisKind,
    pub origin: [f64; 3],
    pub x_dir: [f64; 3],
    pub xy_dir: [f64; 3],
}

impl Axis {
    pub fn cartesian(name: impl Into<String>, origin: [f64; 3]) -> Self {
        Self {
            name: name.into(),
            kind: AxisKind::Cartesian,
            origin,
            x_dir: [1.0, 0.0, 0.0],
            xy_dir: [0.0, 1.0, 0.0],
        }
    }
}

impl RecordCodec for Axis {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        keyword: "AXIS",
        version: 1,
        fields: &[
            FieldSpec::required("name"),
            FieldSpec::required("type"),
            FieldSpec::fixed_list("origin", 3),
            FieldSpec::fixed_list("x_dir", 3),
            FieldSpec::fixed_list("xy_dir", 3),
        ],
    };

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            name: r.required()?,
            kind: r.required()?,
            origin: r.fixed_array()?,
            x_dir: r.fixed_array()?,
            xy_dir: r.fixed_array()?,
        })
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.required(&self.name)
            .required(&self.kind)
            .fixed_list(&self.origin)
            .fixed_list(&self.x_dir)
            .fixed_list(&self.xy_dir);
    }
}
