pub mod record;
pub mod recommendation;
pub mod taste;
