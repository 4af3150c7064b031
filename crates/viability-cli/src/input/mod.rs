pub mod file;
pub mod stdin;

pub use file::read_input;
pub use stdin::read_stdin;
