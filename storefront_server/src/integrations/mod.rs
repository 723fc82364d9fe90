pub mod email;
pub mod side_effects;
pub mod square;
pub mod stripe;
