pub mod builders;
pub mod utils;
