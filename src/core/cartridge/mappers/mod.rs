//! Implementations of the mappers used by NES cartridges.
//! See [Mapper][super::Mapper].
mod nrom;
pub use nrom::NRom;
mod sxrom;
pub use sxrom::SxRom;
