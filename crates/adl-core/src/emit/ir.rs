//! Intermediate representation of a generated analyzer
//!
//! Every expression in here is already rewritten C++; the IR only records
//! structure (which objects, which steps, which cuts) and leaves layout to
//! [`super::render`].

use serde::Serialize;

use crate::ast::Keyword;
use crate::loops::LoopLogic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzerUnit {
    pub name: String,
    pub banner: InfoBanner,
    /// Header spellings for `#include "..."`
    pub includes: Vec<String>,
    pub functions: Vec<FunctionShim>,
    pub variables: Vec<VariableDef>,
    /// Event inputs provided by the adapter, first-seen order
    pub externals: Vec<ExternalObject>,
    /// Dependency order
    pub objects: Vec<ObjectUnit>,
    /// Dependency order
    pub cuts: Vec<CutUnit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InfoBanner {
    pub source_name: String,
    /// Name of the info block, when the document has one
    pub block: Option<String>,
    pub entries: Vec<BannerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BannerEntry {
    pub key: String,
    pub value: String,
}

// =============================================================================
// Functions and variables
// =============================================================================

/// `inline T _ns_f(args) { return ns::f(args); }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionShim {
    pub dsl_name: String,
    pub return_type: String,
    pub internal_name: String,
    pub external_name: String,
    pub params: Vec<ShimParam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShimParam {
    pub ty: String,
    pub name: String,
    /// Element-wise copy into a `vector<TLorentzVector>` named `<name>_`
    pub base_copy: bool,
}

impl ShimParam {
    /// Name passed on to the wrapped function
    pub fn call_name(&self) -> String {
        if self.base_copy {
            format!("{}_", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Event-level variable, recomputed for every event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDef {
    pub dsl_name: String,
    /// Mangled C++ name
    pub name: String,
    pub value_type: String,
    pub value: String,
}

// =============================================================================
// Objects
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalObject {
    pub name: String,
    pub singleton: bool,
}

impl ExternalObject {
    pub fn cpp_type(&self) -> &'static str {
        if self.singleton {
            "TEParticle"
        } else {
            "std::vector<TEParticle>"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectUnit {
    pub name: String,
    pub body: ObjectBody,
}

impl ObjectUnit {
    pub fn is_singleton(&self) -> bool {
        matches!(self.body, ObjectBody::Singleton { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectBody {
    /// One instance per event, copied from its source
    Singleton { source: String },
    /// Filtered copy of the source collection
    Collection {
        source: String,
        steps: Vec<FilterStep>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum FilterStep {
    /// `apply f(...) result`; with an implicit loop the result holds one
    /// value per element of the loop object
    Compute {
        result: String,
        value_type: String,
        call: String,
        implicit_loop: Option<String>,
    },
    Filter {
        kind: FilterKind,
        condition: String,
        /// Loop results referenced by the condition
        loop_results: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Select,
    Reject,
}

impl FilterKind {
    pub fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Select => Some(FilterKind::Select),
            Keyword::Reject => Some(FilterKind::Reject),
            _ => None,
        }
    }

    pub fn logic(&self) -> LoopLogic {
        match self {
            FilterKind::Select => LoopLogic::All,
            FilterKind::Reject => LoopLogic::Any,
        }
    }
}

// =============================================================================
// Cuts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CutUnit {
    pub name: String,
    pub conditions: Vec<CutCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CutCondition {
    pub kind: FilterKind,
    /// Cut-flow histogram bin label
    pub label: String,
    /// Rewritten C++ test
    pub test: String,
}
