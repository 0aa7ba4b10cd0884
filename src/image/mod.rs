pub mod binary;

pub use self::binary::BinaryImage;
