use gwa_codec::{FieldReader, FieldSpec, FieldWriter, FormatError, RecordCodec, RecordSchema};

/// `NODE.3`: a point, optionally restrained and placed in a local axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub name: Option<String>,
    pub colour: Option<String>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Restraint code such as `xyz` or `free`.
    pub restraint: Option<String>,
    /// `AXIS` index; 0 or unset is the global axis.
    pub axis: Option<u32>,
    pub mesh_size: Option<f64>,
}

impl Node {
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            ..Self::default()
        }
    }

    pub fn local_axis(&self) -> Option<u32> {
        self.axis.filter(|a| *a > 0)
    }

    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl RecordCodec for Node {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        keyword: "NODE",
        version: 3,
        fields: &[
            FieldSpec::optional("name", ""),
            FieldSpec::optional("colour", "NO_RGB"),
            FieldSpec::required("x"),
            FieldSpec::required("y"),
            FieldSpec::required("z"),
            FieldSpec::optional("restraint", "free"),
            FieldSpec::optional("axis", "0"),
            FieldSpec::optional("mesh_size", "0"),
        ],
    };

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            name: r.optional()?,
            colour: r.optional()?,
            x: r.required()?,
            y: r.required()?,
            z: r.required()?,
            restraint: r.optional()?,
            axis: r.optional()?,
            mesh_size: r.optional()?,
        })
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.optional(self.name.as_ref())
            .optional(self.colour.as_ref())
            .required(&self.x)
            .required(&self.y)
            .required(&self.z)
            .optional(self.restraint.as_ref())
            .optional(self.axis.as_ref())
            .optional(self.mesh_size.as_ref());
    }
}
