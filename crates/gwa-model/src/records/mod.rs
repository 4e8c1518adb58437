mod axis;
mod element;
mod grid;
mod loading;
mod member;
mod node;
mod section;

pub use axis::{Axis, AxisKind};
pub use element::{Element, ElementType};
pub use grid::{GridElementKind, GridExpansion, GridPlane, GridPlaneType, GridSpan, GridSurface};
pub use loading::{Combination, LoadCaseType, LoadTitle};
pub use member::{Activity, Exposure, Member, MemberType, TOPOLOGY_TAGS};
pub use node::Node;
pub use section::{
    COMPONENT_KEYWORDS, MaterialType, Section, SectionComp, SectionComponent, SectionConcrete,
    SectionPart, SectionSteel,
};
