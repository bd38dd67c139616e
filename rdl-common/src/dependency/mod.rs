pub mod definition;
pub mod relocation;

pub use definition::Dependency;
pub use relocation::Relocation;
