use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Encountered a configuration error. {0}")]
    Config(#[from] toml::de::Error),

    #[error("Metadata syntax error on line {line}: {msg}")]
    Syntax { line: usize, msg: String },

    #[error("Metadata keyword '{keyword}' on line {line} is not supported by CTF")]
    UnsupportedKeyword { line: usize, keyword: String },

    #[error("Metadata refers to an unknown {kind} '{name}'")]
    UnknownType { kind: &'static str, name: String },

    #[error("Field '{field}' refers to '{reference}', which is not an earlier sibling field")]
    UnresolvedReference { field: String, reference: String },

    #[error("Variant '{variant}' is tagged by '{tag}', which is not an enumeration")]
    VariantTagNotEnum { variant: String, tag: String },

    #[error("Variant '{0}' is used without a tag")]
    UntaggedVariant(String),

    #[error("Variant '{0}' can only be decoded as a member of a structure")]
    DetachedVariant(String),

    #[error("Signed integers must be byte-aligned and 8, 16, 32 or 64 bits wide (size = {size}, align = {align})")]
    UnsupportedSignedBitfield { size: u32, align: u32 },

    #[error("Invalid integer size {0}, must be between 1 and 64 bits")]
    InvalidIntegerSize(u32),

    #[error("Invalid alignment {0}, must be a power of two")]
    InvalidAlignment(u64),

    #[error("Value {value} is outside of every range of enumeration '{name}'")]
    EnumOutOfRange { name: String, value: i128 },

    #[error("Variant '{variant}' has no branch named '{label}'")]
    UnknownVariantBranch { variant: String, label: String },

    #[error("Field '{0}' does not hold an integer value")]
    NotAnInteger(String),

    #[error("Unexpected end of data at bit offset {offset} (needed {needed} more bits)")]
    UnexpectedEof { offset: u64, needed: u64 },

    #[error("Packet at byte offset {offset} has an invalid magic number {magic:#010x}")]
    BadPacketMagic { offset: u64, magic: u64 },

    #[error("Packet at byte offset {offset} declares an invalid size ({packet_bits} bits, header is {header_bits} bits)")]
    InvalidPacketSize {
        offset: u64,
        packet_bits: u64,
        header_bits: u64,
    },

    #[error("The metadata doesn't declare a stream with ID {0}")]
    UnknownStream(u64),

    #[error("The metadata doesn't declare an event with ID {id} in stream {stream_id}")]
    UnknownEvent { stream_id: u64, id: u64 },
}
