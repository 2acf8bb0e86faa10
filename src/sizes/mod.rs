mod table;
pub use table::{ModuliSizes, SizeEntry};

mod serialize;
pub use serialize::{read_binary, read_text, write_binary, write_text};

#[cfg(test)]
mod tests;
