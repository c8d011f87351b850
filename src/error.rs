use thiserror::Error;

/// Errors produced while parsing or building BOOTP/DHCPv4 packets.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid packet size {0}")]
    PacketTooShort(usize),

    #[error("invalid opcode {0}")]
    BadOpcode(u8),

    #[error("invalid hardware type '{0}'")]
    BadHardwareType(String),

    #[error("invalid size {size} for option '{option}'")]
    BadOptionLength { option: String, size: usize },

    #[error("invalid value '{detail}' for option '{option}'")]
    BadOptionFormat { option: String, detail: String },

    #[error("invalid message type '{0}'")]
    UnknownMessageType(String),

    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("packet size exceeded while encoding option '{0}'")]
    PacketOverflow(String),
}

impl CodecError {
    pub(crate) fn format(option: &str, detail: impl Into<String>) -> Self {
        CodecError::BadOptionFormat {
            option: option.to_string(),
            detail: detail.into(),
        }
    }
}

/// Errors produced by the raw link-layer transceiver.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("no usable address on interface '{0}'")]
    NoAddress(String),

    #[error("insufficient permissions for raw socket (CAP_NET_RAW required)")]
    Permission,

    #[error("failed to open datalink channel: {0}")]
    Channel(String),

    #[error("raw link-layer sockets are not implemented on this platform")]
    NotImplemented,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
