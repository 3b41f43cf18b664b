//! Model text → validated domain objects.

pub mod recommendation;
pub mod sanitize;
pub mod taste;

pub use recommendation::assemble_recommendations;
pub use taste::assemble_taste_profile;
