use gwa_codec::{FieldReader, FieldSpec, FieldWriter, FormatError, RecordCodec, RecordSchema, wire_enum};

wire_enum! {
    pub enum GridPlaneType {
        General => "GENERAL",
        Storey => "STOREY",
    }
}

/// `GRID_PLANE.4`: a plane at an elevation in an axis.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPlane {
    pub name: String,
    pub plane_type: GridPlaneType,
    /// `AXIS` index, 0 for the global axis.
    pub axis: u32,
    pub elevation: f64,
    pub tolerance_below: Option<f64>,
    pub tolerance_above: Option<f64>,
}

impl GridPlane {
    pub fn storey(name: impl Into<String>, axis: u32, elevation: f64) -> Self {
        Self {
            name: name.into(),
            plane_type: GridPlaneType::Storey,
            axis,
            elevation,
            tolerance_below: None,
            tolerance_above: None,
        }
    }
}

impl RecordCodec for GridPlane {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        keyword: "GRID_PLANE",
        version: 4,
        fields: &[
            FieldSpec::required("name"),
            FieldSpec::required("type"),
            FieldSpec::required("axis"),
            FieldSpec::required("elevation"),
            FieldSpec::optional("tolerance_below", "0"),
            FieldSpec::optional("tolerance_above", "0"),
        ],
    };

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            name: r.required()?,
            plane_type: r.required()?,
            axis: r.required()?,
            elevation: r.required()?,
            tolerance_below: r.optional()?,
            tolerance_above: r.optional()?,
        })
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.required(&self.name)
            .required(&self.plane_type)
            .required(&self.axis)
            .required(&self.elevation)
            .optional(self.tolerance_below.as_ref())
            .optional(self.tolerance_above.as_ref());
    }
}

wire_enum! {
    pub enum GridElementKind {
        OneD => "ONE",
        TwoD => "TWO",
    }
}

wire_enum! {
    pub enum GridSpan {
        OneWay => "ONE",
        TwoWay => "TWO",
        TwoWaySimple => "TWO_SIMPLE",
    }
}

wire_enum! {
    pub enum GridExpansion {
        Legacy => "LEGACY",
        PlaneAspect => "PLANE_ASPECT",
        PlaneSmooth => "PLANE_SMOOTH",
        PlaneCorner => "PLANE_CORNER",
    }
}

/// `GRID_SURFACE.1`: a load-spreading surface on a grid plane.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSurface {
    pub name: String,
    /// `GRID_PLANE` index, 0 for the global xy plane.
    pub plane: u32,
    pub element_kind: GridElementKind,
    /// Element list in list syntax, `all` by default.
    pub elements: Option<String>,
    pub tolerance: Option<f64>,
    pub span: GridSpan,
    pub angle: Option<f64>,
    pub expansion: Option<GridExpansion>,
}

impl RecordCodec for GridSurface {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        keyword: "GRID_SURFACE",
        version: 1,
        fields: &[
            FieldSpec::required("name"),
            FieldSpec::required("plane"),
            FieldSpec::required("element_kind"),
            FieldSpec::optional("elements", "all"),
            FieldSpec::optional("tolerance", "0.01"),
            FieldSpec::required("span"),
            FieldSpec::optional("angle", "0"),
            FieldSpec::optional("expansion", "LEGACY"),
        ],
    };

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            name: r.required()?,
            plane: r.required()?,
            element_kind: r.required()?,
            elements: r.optional()?,
            tolerance: r.optional()?,
            span: r.required()?,
            angle: r.optional()?,
            expansion: r.optional()?,
        })
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.required(&self.name)
            .required(&self.plane)
            .required(&self.element_kind)
            .optional(self.elements.as_ref())
            .optional(self.tolerance.as_ref())
            .required(&self.span)
            .optional(self.angle.as_ref())
            .optional(self.expansion.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwa_codec::{CommandVerb, SidTag};

    #[test]
    fn grid_plane_carries_axis_reference() {
        let decoded = GridPlane::decode("SET\tGRID_PLANE.4\t2\tlevel 1\tSTOREY\t3\t4.5\t0.1\t0.1")
            .expect("grid plane");
        assert_eq!(decoded.record.axis, 3);
        assert_eq!(decoded.record.elevation, 4.5);
        assert_eq!(decoded.record.plane_type, GridPlaneType::Storey);
    }

    #[test]
    fn grid_surface_defaults() {
        let surface = GridSurface {
            name: "roof".into(),
            plane: 2,
            element_kind: GridElementKind::TwoD,
            elements: None,
            tolerance: None,
            span: GridSpan::TwoWay,
            angle: None,
            expansion: None,
        };
        assert_eq!(
            surface.encode(CommandVerb::Set, 1, &SidTag::new(Some("gs-roof"), None)),
            "SET\tGRID_SURFACE.1:{speckle_app_id:gs-roof}\t1\troof\t2\tTWO\tall\t0.01\tTWO\t0\tLEGACY"
        );
    }

    #[test]
    fn grid_surface_round_trip() {
        let surface = GridSurface {
            name: "deck".into(),
            plane: 7,
            element_kind: GridElementKind::OneD,
            elements: Some("1 to 20".into()),
            tolerance: Some(0.05),
            span: GridSpan::TwoWaySimple,
            angle: Some(30.0),
            expansion: Some(GridExpansion::PlaneCorner),
        };
        let line = surface.encode(CommandVerb::Set, 4, &SidTag::default());
        assert_eq!(GridSurface::decode(&line).expect("round trip").record, surface);
    }

    #[test]
    fn missing_elevation_is_reported() {
        let err = GridPlane::decode("SET\tGRID_PLANE.4\t1\tg\tGENERAL\t0").expect_err("short");
        assert_eq!(err.field, "elevation");
    }
}
