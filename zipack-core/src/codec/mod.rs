use crate::config::CompressionLevel;
use crate::error::Result;
use std::io::{Read, Write};

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CodecId {
    Store = 0,
    Zstd = 1,
}

impl CodecId {
    pub fn from_u8(v: u8) -> Option<CodecId> {
        match v {
            0 => Some(CodecId::Store),
            1 => Some(CodecId::Zstd),
            _ => None,
        }
    }
}

pub trait Compressor: Send + Sync {
    fn id(&self) -> CodecId;
    fn compress(&self, src: &mut dyn Read, dst: &mut dyn Write, level: i32) -> Result<u64>;
    fn decompress(&self, src: &mut dyn Read, dst: &mut dyn Write) -> Result<u64>;
}

pub mod store;
pub mod zstdc;

static STORE: store::Store = store::Store;
static ZSTD: zstdc::ZstdCompressor = zstdc::ZstdCompressor;

/// Codec and zstd level for a configured compression setting.
/// None maps to STORE; Fastest/Default/Maximum map to zstd 1/3/19.
pub fn for_level(level: CompressionLevel) -> (&'static dyn Compressor, i32) {
    match level {
        CompressionLevel::None => (&STORE, 0),
        CompressionLevel::Fastest => (&ZSTD, 1),
        CompressionLevel::Default => (&ZSTD, 3),
        CompressionLevel::Maximum => (&ZSTD, 19),
    }
}

pub fn by_id(id: u8) -> Option<&'static dyn Compressor> {
    match CodecId::from_u8(id)? {
        CodecId::Store => Some(&STORE),
        CodecId::Zstd => Some(&ZSTD),
    }
}
