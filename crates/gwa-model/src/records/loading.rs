use gwa_codec::{
    CaseExprError, CaseFactor, FieldReader, FieldSpec, FieldWriter, FormatError, RecordCodec,
    RecordSchema, expand_case_expression, wire_enum,
};

wire_enum! {
    pub enum LoadCaseType {
        Dead => "DEAD",
        Imposed => "IMPOSED",
        Wind => "WIND",
        Snow => "SNOW",
        Seismic => "SEISMIC",
        Undefined => "UNDEF",
    }
}

/// `LOAD_TITLE.2`: a load case.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTitle {
    pub title: String,
    pub case_type: LoadCaseType,
    pub source: Option<u32>,
    pub category: Option<String>,
    pub direction: Option<String>,
    pub include: Option<String>,
}

impl LoadTitle {
    pub fn new(title: impl Into<String>, case_type: LoadCaseType) -> Self {
        Self {
            title: title.into(),
            case_type,
            source: None,
            category: None,
            direction: None,
            include: None,
        }
    }
}

impl RecordCodec for LoadTitle {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        keyword: "LOAD_TITLE",
        version: 2,
        fields: &[
            FieldSpec::required("title"),
            FieldSpec::required("type"),
            FieldSpec::optional("source", "1"),
            FieldSpec::optional("category", "~"),
            FieldSpec::optional("direction", "NONE"),
            FieldSpec::optional("include", "INC_BOTH"),
        ],
    };

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            title: r.required()?,
            case_type: r.required()?,
            source: r.optional()?,
            category: r.optional()?,
            direction: r.optional()?,
            include: r.optional()?,
        })
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.required(&self.title)
            .required(&self.case_type)
            .optional(self.source.as_ref())
            .optional(self.category.as_ref())
            .optional(self.direction.as_ref())
            .optional(self.include.as_ref());
    }
}

/// `COMBINATION.1`: a named linear combination of cases.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub name: String,
    /// Case expression such as `1.35L1 + 1.5(L2 L3)`.
    pub description: String,
    pub bridge: Option<String>,
    pub note: Option<String>,
}

impl Combination {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            bridge: None,
            note: None,
        }
    }

    pub fn cases(&self) -> Result<Vec<CaseFactor>, CaseExprError> {
        expand_case_expression(&self.description)
    }
}

impl RecordCodec for Combination {
    const SCHEMA: &'static RecordSchema = &RecordSchema {
        keyword: "COMBINATION",
        version: 1,
        fields: &[
            FieldSpec::required("name"),
            FieldSpec::required("description"),
            FieldSpec::optional("bridge", ""),
            FieldSpec::optional("note", ""),
        ],
    };

    fn read_fields(r: &mut FieldReader<'_>) -> Result<Self, FormatError> {
        let name = r.required()?;
        let at = r.position();
        let description: String = r.required()?;
        if let Err(e) = expand_case_expression(&description) {
            return Err(FormatError::new(
                Self::SCHEMA.keyword,
                "description",
                at,
                Some(&description),
                e.to_string(),
            ));
        }
        Ok(Self {
            name,
            description,
            bridge: r.optional()?,
            note: r.optional()?,
        })
    }

    fn write_fields(&self, w: &mut FieldWriter) {
        w.required(&self.name)
            .required(&self.description)
            .optional(self.bridge.as_ref())
            .optional(self.note.as_ref());
    }
}
