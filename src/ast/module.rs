//! Module: an ordered list of top-level statements plus the import set
//! resolved by the loader (section 3.6).

use std::collections::BTreeSet;

use crate::ast::stmt::Statement;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Module {
    pub file: String,
    pub statements: Vec<Statement>,
    /// Populated by the loader (section 4.J) with every path this module
    /// imports, namespaced or not.
    pub imports: BTreeSet<String>,
    /// `(namespace, module file)` pairs for namespaced imports, so the
    /// type checker can populate the namespace table (section 4.J step 4).
    pub namespaced_imports: Vec<(String, String)>,
}

impl Module {
    pub fn new(file: impl Into<String>, statements: Vec<Statement>) -> Self {
        Module {
            file: file.into(),
            statements,
            imports: BTreeSet::new(),
            namespaced_imports: vec![],
        }
    }
}
