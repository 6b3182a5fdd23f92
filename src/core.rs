pub mod aggregate;
pub mod filter;
pub mod forecast;
pub mod record;
pub mod series;
