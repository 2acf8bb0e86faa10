mod generator;
pub use generator::PrimeGenerator;

pub mod primality;
