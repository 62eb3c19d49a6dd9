pub mod authors;
pub mod log;
pub mod scan;
