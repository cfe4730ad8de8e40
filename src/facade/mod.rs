mod genesis;
mod keeper;
mod shared;

pub use genesis::GenesisState;
pub use keeper::MetadataKeeper;
pub use shared::SharedKeeper;
