// Shared helpers with no game knowledge

pub mod math;
