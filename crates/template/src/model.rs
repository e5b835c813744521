//! The validated, in-memory representation of a template description.
//!
//! Instances are only produced by the schema validator and are treated
//! as immutable from then on: evaluation and rendering never mutate a
//! template.

use facture_expr::{Expression, Selection};
use indexmap::IndexMap;

/// The only accepted value of the root `kind` discriminator.
pub const TEMPLATE_KIND: &str = "invoice-template";
/// The single accepted template format version.
pub const TEMPLATE_VERSION: u64 = 1;

/// A fully validated template description.
#[derive(Debug, Clone)]
pub struct Template {
    pub metadata: Metadata,
    pub styles: StyleCatalog,
    pub bindings: BindingCatalog,
    pub transforms: TransformPipeline,
    pub layout: LayoutNode,
}

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub name: String,
    pub description: Option<String>,
    pub locale: Option<String>,
}

// --- Styles ---

/// Named design tokens plus class declarations built from them.
/// Declaration order is preserved; stylesheet generation follows it.
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    pub tokens: IndexMap<String, String>,
    pub classes: IndexMap<String, StyleClass>,
}

/// One style class: CSS property name to value, where a value may
/// reference a token as `$tokenName`.
#[derive(Debug, Clone, Default)]
pub struct StyleClass {
    pub declarations: IndexMap<String, String>,
}

// --- Bindings ---

/// The two binding catalogs: scalar value bindings and enumerable
/// collection bindings. Both select from the caller's dataset by path.
#[derive(Debug, Clone, Default)]
pub struct BindingCatalog {
    pub values: IndexMap<String, ValueBinding>,
    pub collections: IndexMap<String, CollectionBinding>,
}

#[derive(Debug, Clone)]
pub struct ValueBinding {
    pub path: Selection,
    /// When false, an absent dataset value resolves to null instead of
    /// failing; predicates then treat it as false.
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct CollectionBinding {
    pub path: Selection,
}

// --- Transforms ---

/// The declarative data-shaping pipeline applied to one collection
/// binding. Operations always execute in the fixed stage order, not
/// declaration order.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    /// Name of the collection binding the pipeline consumes.
    pub source: String,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub id: String,
    /// Optional allowlisted extension hook, resolved only through the
    /// strategy registry.
    pub strategy_id: Option<String>,
    pub kind: OperationKind,
}

#[derive(Debug, Clone)]
pub enum OperationKind {
    Filter { predicate: Predicate },
    Sort { keys: Vec<SortKey> },
    Group { key: Option<Expression> },
    Aggregate { aggregations: Vec<Aggregation> },
    ComputedField { fields: Vec<ComputedField> },
    TotalsCompose { totals: Vec<TotalSpec> },
}

impl OperationKind {
    /// The wire-format discriminator for this operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            OperationKind::Filter { .. } => "filter",
            OperationKind::Sort { .. } => "sort",
            OperationKind::Group { .. } => "group",
            OperationKind::Aggregate { .. } => "aggregate",
            OperationKind::ComputedField { .. } => "computed-field",
            OperationKind::TotalsCompose { .. } => "totals-compose",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub expr: Expression,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub name: String,
    pub func: AggregateFn,
    pub operand: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone)]
pub struct ComputedField {
    pub name: String,
    pub expr: Expression,
}

#[derive(Debug, Clone)]
pub struct TotalSpec {
    pub name: String,
    pub expr: Expression,
}

/// A structured boolean predicate. Logical combinators carry explicit
/// condition lists so emptiness can be rejected structurally.
#[derive(Debug, Clone)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare {
        left: Expression,
        op: CompareOp,
        right: Expression,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

// --- Layout ---

/// A node in the layout tree. Exactly one `Document` sits at the root;
/// only `Document`, `Section`, and `Stack` carry children.
#[derive(Debug, Clone)]
pub enum LayoutNode {
    Document {
        classes: Vec<String>,
        children: Vec<LayoutNode>,
    },
    Section {
        classes: Vec<String>,
        children: Vec<LayoutNode>,
    },
    Stack {
        classes: Vec<String>,
        direction: StackDirection,
        children: Vec<LayoutNode>,
    },
    Text {
        classes: Vec<String>,
        content: String,
    },
    Field {
        classes: Vec<String>,
        binding: String,
        label: Option<String>,
    },
    Image {
        classes: Vec<String>,
        src: ImageSource,
        alt: Option<String>,
    },
    Divider {
        classes: Vec<String>,
    },
    Table {
        classes: Vec<String>,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    DynamicTable {
        classes: Vec<String>,
        repeat: RepeatBinding,
        columns: Vec<DynamicColumn>,
    },
    Totals {
        classes: Vec<String>,
        /// Named totals to render; all composed totals when absent.
        entries: Option<Vec<String>>,
    },
}

impl LayoutNode {
    /// The wire-format discriminator for this node kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LayoutNode::Document { .. } => "document",
            LayoutNode::Section { .. } => "section",
            LayoutNode::Stack { .. } => "stack",
            LayoutNode::Text { .. } => "text",
            LayoutNode::Field { .. } => "field",
            LayoutNode::Image { .. } => "image",
            LayoutNode::Divider { .. } => "divider",
            LayoutNode::Table { .. } => "table",
            LayoutNode::DynamicTable { .. } => "dynamic-table",
            LayoutNode::Totals { .. } => "totals",
        }
    }

    pub fn classes(&self) -> &[String] {
        match self {
            LayoutNode::Document { classes, .. }
            | LayoutNode::Section { classes, .. }
            | LayoutNode::Stack { classes, .. }
            | LayoutNode::Text { classes, .. }
            | LayoutNode::Field { classes, .. }
            | LayoutNode::Image { classes, .. }
            | LayoutNode::Divider { classes }
            | LayoutNode::Table { classes, .. }
            | LayoutNode::DynamicTable { classes, .. }
            | LayoutNode::Totals { classes, .. } => classes,
        }
    }

    pub fn children(&self) -> &[LayoutNode] {
        match self {
            LayoutNode::Document { children, .. }
            | LayoutNode::Section { children, .. }
            | LayoutNode::Stack { children, .. } => children,
            _ => &[],
        }
    }
}

/// Repeat-region metadata on a `dynamic-table`. Both fields are
/// mandatory; a dynamic table without them is invalid, never degraded
/// to a static table.
#[derive(Debug, Clone)]
pub struct RepeatBinding {
    pub source_binding: String,
    pub item_binding: String,
}

#[derive(Debug, Clone)]
pub struct DynamicColumn {
    pub header: String,
    pub cell: Expression,
}

#[derive(Debug, Clone)]
pub enum ImageSource {
    Url(String),
    Binding(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackDirection {
    #[default]
    Vertical,
    Horizontal,
}
