//! A family of order-preserving and order-revealing encryption schemes
//! (BCLO OPE, CLWW, Practical ORE, Lewi-Wu, CLOZ) built on AES-128
//! primitives, with per-primitive usage accounting for benchmarking.

pub mod convert;
pub mod primitives;
pub mod range;
pub mod samplers;
pub mod scheme;
pub mod tracker;

pub use range::Range;
pub use scheme::bclo::{BcloOpe, OpeCipherText};
pub use scheme::cloz::{ClozCipherText, ClozKey, ClozOre};
pub use scheme::clww::ClwwOre;
pub use scheme::lewi::{LewiCipherText, LewiKey, LewiOre};
pub use scheme::practical::PracticalOre;
pub use scheme::tuple::TupleCipherText;
pub use scheme::{CipherSize, OreScheme, SchemeError, SchemeKey};
pub use tracker::{Operation, Primitive, Tracker, UsageReport};
