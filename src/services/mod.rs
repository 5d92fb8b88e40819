pub mod delivery;
pub mod directory;
pub mod display;
pub mod registry;
