pub mod chain;
pub mod color;
pub mod data;
pub mod media;
pub mod normalize;
pub mod settings;
pub mod sources;
pub mod store;
