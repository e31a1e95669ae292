/// Value-based read-set validation against the global clock.
pub mod validation;
