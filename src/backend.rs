#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    Io,
    Corrupt,
}

mod backend_file;
pub use backend_file::*;
