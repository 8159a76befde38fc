//! Edge names.

use std::fmt::Debug;
use std::hash::Hash;

/// Reserved names used for intermediate axes inside composite operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InternalName {
    Contract0,
    Contract1,
    Contract2,
    Trace1,
    Trace2,
    Trace3,
    Svd1,
    Svd2,
    Qr1,
    Qr2,
    Exp1,
    Exp2,
}

impl InternalName {
    /// Text form, prefixed so it cannot collide with ordinary names.
    pub fn as_str(self) -> &'static str {
        match self {
            InternalName::Contract0 => "__contract_0",
            InternalName::Contract1 => "__contract_1",
            InternalName::Contract2 => "__contract_2",
            InternalName::Trace1 => "__trace_1",
            InternalName::Trace2 => "__trace_2",
            InternalName::Trace3 => "__trace_3",
            InternalName::Svd1 => "__svd_1",
            InternalName::Svd2 => "__svd_2",
            InternalName::Qr1 => "__qr_1",
            InternalName::Qr2 => "__qr_2",
            InternalName::Exp1 => "__exp_1",
            InternalName::Exp2 => "__exp_2",
        }
    }
}

/// Types usable as edge names.
pub trait EdgeName: Clone + Debug + Ord + Hash + Send + Sync + 'static {
    /// Build the reserved name for an intermediate axis.
    fn internal(name: InternalName) -> Self;
}

impl EdgeName for String {
    fn internal(name: InternalName) -> Self {
        name.as_str().to_owned()
    }
}

impl EdgeName for &'static str {
    fn internal(name: InternalName) -> Self {
        name.as_str()
    }
}
