//! Memory qualifiers and function/block modifiers (section 4.H).

/// Parameter/variable memory qualifier: `default`, `as val`, `as ref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MemQual {
    Default,
    Val,
    Ref,
}

impl Default for MemQual {
    fn default() -> Self {
        MemQual::Default
    }
}

/// Function arena modifier: `default`, `shared`, `private`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FnModifier {
    Default,
    Shared,
    Private,
}

impl Default for FnModifier {
    fn default() -> Self {
        FnModifier::Default
    }
}

/// Block/loop arena modifier: `default` or `shared`, or (blocks only)
/// `private`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BlockModifier {
    Default,
    Shared,
    Private,
}

impl Default for BlockModifier {
    fn default() -> Self {
        BlockModifier::Default
    }
}
