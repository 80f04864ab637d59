// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message encoding contract.
//!
//! Endpoints exchange opaque byte buffers with the middleware; a [`Message`]
//! type knows how to produce and consume those buffers.

use crate::error::{Error, Result};

/// Encoding contract for anything sent through a publisher, service or client.
pub trait Message: Sized + Send + 'static {
    /// Type name registered on the topic or service (e.g. `std_msgs/msg/String`).
    fn type_name() -> &'static str;

    /// Encode to an owned buffer.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Decode from a buffer produced by [`Message::encode`].
    fn decode(buf: &[u8]) -> Result<Self>;
}

impl Message for Vec<u8> {
    fn type_name() -> &'static str {
        "rclcore/msg/Bytes"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.clone())
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        Ok(buf.to_vec())
    }
}

impl Message for String {
    fn type_name() -> &'static str {
        "std_msgs/msg/String"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.as_bytes().to_vec())
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        String::from_utf8(buf.to_vec()).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl Message for bool {
    fn type_name() -> &'static str {
        "std_msgs/msg/Bool"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(vec![u8::from(*self)])
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        match buf {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(Error::Serialization(format!(
                "expected 1 byte bool, got {} bytes",
                buf.len()
            ))),
        }
    }
}

macro_rules! impl_message_le {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Message for $ty {
                fn type_name() -> &'static str {
                    $name
                }

                fn encode(&self) -> Result<Vec<u8>> {
                    Ok(self.to_le_bytes().to_vec())
                }

                fn decode(buf: &[u8]) -> Result<Self> {
                    let bytes = buf.try_into().map_err(|_| {
                        Error::Serialization(format!(
                            "expected {} bytes for {}, got {}",
                            std::mem::size_of::<$ty>(),
                            $name,
                            buf.len()
                        ))
                    })?;
                    Ok(<$ty>::from_le_bytes(bytes))
                }
            }
        )*
    };
}

impl_message_le! {
    i32 => "std_msgs/msg/Int32",
    i64 => "std_msgs/msg/Int64",
    u32 => "std_msgs/msg/UInt32",
    u64 => "std_msgs/msg/UInt64",
    f32 => "std_msgs/msg/Float32",
    f64 => "std_msgs/msg/Float64",
}
