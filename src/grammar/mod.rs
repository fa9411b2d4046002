pub mod metahandlers;
pub mod model;
pub mod registry;
pub mod symbol;

pub use metahandlers::{
    FloatRange, IntRange, ListSizeBetween, Metahandler, Recurse, SlotContext, VarRange,
};
pub use model::GrammarModel;
pub use registry::GrammarRegistry;
pub use symbol::{Param, Production, ProductionId, Slot, SymbolDecl, SymbolId};
