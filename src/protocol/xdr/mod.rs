//! XDR (RFC 1832) encoding for every program the gateway speaks.
//!
//! All quantities are big-endian and every item occupies a multiple of four
//! bytes. Decoding reads from any [`Read`] (in practice a `Cursor` over the
//! received record), so a short buffer surfaces as `UnexpectedEof` instead of
//! an out-of-bounds read. Encoding writes into any [`Write`]; replies are
//! built in an [`XdrBuffer`], which truncates at its capacity.
//!
//! Where the XDR language has a direct Rust counterpart the Rust type is used:
//! `unsigned int` is `u32`, `unsigned hyper` is `u64`, variable-length
//! `opaque<>` is `Vec<u8>`, `T *` (optional data) is `Option<T>`.

use std::io::{Read, Write};

use byteorder::BigEndian;
use byteorder::{ReadBytesExt, WriteBytesExt};
use num_traits::{FromPrimitive, ToPrimitive};

pub mod bootparam;
mod buffer;
pub mod mount;
pub mod nfs2;
pub mod nfs3;
pub mod portmap;
pub mod rpc;
mod utils;

pub use buffer::XdrBuffer;
pub use utils::{invalid_data, padding_len, ALIGNMENT};

/// XDR assumes big endian encoding.
pub type XDREndian = BigEndian;

pub trait Serialize {
    /// Writes the XDR form of `self` into `dest`.
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()>;
}

pub trait Deserialize {
    /// Replaces `self` with a value decoded from `src`.
    ///
    /// Fails with `UnexpectedEof` when `src` runs out before the value is
    /// complete.
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()>;
}

/// Decodes a fresh `T` starting from its [`Default`] value.
pub fn deserialize<T>(src: &mut impl Read) -> std::io::Result<T>
where
    T: Deserialize + Default,
{
    let mut val = T::default();
    val.deserialize(src)?;

    Ok(val)
}

/// Marker trait for XDR `enum` type serialization.
pub trait SerializeEnum: ToPrimitive {}

/// Enumerations have the same representation as signed integers.
impl<T: SerializeEnum> Serialize for T {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        if let Some(val) = self.to_i64() {
            // discriminants above i32::MAX (e.g. 0xFFFFFFFF sentinels) keep their bit pattern
            return dest.write_u32::<XDREndian>(val as u32);
        }
        Err(utils::invalid_data("Invalid enum value"))
    }
}

/// Marker trait for XDR `enum` type deserialization.
pub trait DeserializeEnum: FromPrimitive {}

impl<T: DeserializeEnum> Deserialize for T {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let val = src.read_u32::<XDREndian>()?;
        if let Some(val) = FromPrimitive::from_u32(val) {
            *self = val;
            return Ok(());
        }

        Err(utils::invalid_data("Invalid enum value"))
    }
}

/// `bool` is the enum `{ FALSE = 0, TRUE = 1 }`.
impl Serialize for bool {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u32::<XDREndian>(u32::from(*self))
    }
}

impl Deserialize for bool {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match src.read_u32::<XDREndian>()? {
            0 => *self = false,
            1 => *self = true,
            _ => return Err(utils::invalid_data("Invalid value for bool enum")),
        }
        Ok(())
    }
}

impl Serialize for i32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i32::<XDREndian>(*self)
    }
}

impl Deserialize for i32 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_i32::<XDREndian>()?;
        Ok(())
    }
}

/// XDR `unsigned int`.
impl Serialize for u32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u32::<XDREndian>(*self)
    }
}

impl Deserialize for u32 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u32::<XDREndian>()?;
        Ok(())
    }
}

/// XDR `unsigned hyper`, used for 64-bit sizes, offsets and file ids.
impl Serialize for u64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u64::<XDREndian>(*self)
    }
}

impl Deserialize for u64 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u64::<XDREndian>()?;
        Ok(())
    }
}

/// Fixed-length opaque data, `opaque identifier[n]`.
impl<const N: usize> Serialize for [u8; N] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_all(self)?;
        utils::write_padding(N, dest)
    }
}

impl<const N: usize> Deserialize for [u8; N] {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        src.read_exact(self)?;
        utils::read_padding(N, src)
    }
}

/// Variable-length opaque data, `opaque identifier<>`: length, bytes, padding.
impl Serialize for [u8] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        let Ok(len) = u32::try_from(self.len()) else {
            return Err(utils::invalid_data("opaque longer than u32::MAX"));
        };
        len.serialize(dest)?;
        dest.write_all(self)?;
        utils::write_padding(self.len(), dest)
    }
}

impl Serialize for Vec<u8> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_slice().serialize(dest)
    }
}

impl Deserialize for Vec<u8> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let length = deserialize::<u32>(src)?;
        read_opaque_body(length, self, src)
    }
}

/// Reads the body of an opaque whose length prefix has already been consumed.
///
/// The buffer only grows by what the source actually delivers, so a bogus
/// length prefix cannot trigger a large allocation.
fn read_opaque_body<R: Read>(length: u32, dest: &mut Vec<u8>, src: &mut R) -> std::io::Result<()> {
    dest.clear();
    src.take(u64::from(length)).read_to_end(dest)?;
    if dest.len() != length as usize {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "opaque data shorter than its length prefix",
        ));
    }
    utils::read_padding(dest.len(), src)
}

/// Decodes a variable-length opaque, rejecting lengths above `max`.
pub fn read_opaque_max(src: &mut impl Read, max: u32) -> std::io::Result<Vec<u8>> {
    let length = deserialize::<u32>(src)?;
    if length > max {
        return Err(utils::invalid_data("opaque exceeds its declared maximum"));
    }
    let mut data = Vec::new();
    read_opaque_body(length, &mut data, src)?;
    Ok(data)
}

/// XDR `string<>` carrying ASCII text.
impl Serialize for str {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_bytes().serialize(dest)
    }
}

impl Serialize for String {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_bytes().serialize(dest)
    }
}

impl Deserialize for String {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let bytes = deserialize::<Vec<u8>>(src)?;
        if !bytes.is_ascii() {
            return Err(utils::invalid_data("Not ASCII string"));
        }
        *self = String::from_utf8(bytes).map_err(|_| utils::invalid_data("Not ASCII string"))?;
        Ok(())
    }
}

/// Counted array of `unsigned int`, e.g. AUTH_UNIX gids or mount auth flavors.
impl Serialize for Vec<u32> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        let Ok(len) = u32::try_from(self.len()) else {
            return Err(utils::invalid_data("array longer than u32::MAX"));
        };
        len.serialize(dest)?;
        for i in self {
            i.serialize(dest)?;
        }
        Ok(())
    }
}

impl Deserialize for Vec<u32> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let length = deserialize::<u32>(src)?;
        self.clear();
        for _ in 0..length {
            self.push(deserialize::<u32>(src)?);
        }
        Ok(())
    }
}

/// Implements [`Serialize`] for a struct by writing each listed field in order.
#[macro_export]
macro_rules! SerializeStruct {
    (
        $t:ident,
        $($element:ident),*
    ) => {
        impl Serialize for $t {
            fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
                $(self.$element.serialize(dest)?;)*
                Ok(())
            }
        }
    };
}

/// Implements [`Deserialize`] for a struct by reading each listed field in order.
#[macro_export]
macro_rules! DeserializeStruct {
    (
        $t:ident,
        $($element:ident),*
    ) => {
        impl Deserialize for $t {
            fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                $(self.$element.deserialize(src)?;)*
                Ok(())
            }
        }
    };
}

/// Optional data, `T *identifier`: a bool discriminant then the value.
impl<T: Serialize> Serialize for Option<T> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            Some(data) => {
                true.serialize(dest)?;
                data.serialize(dest)
            }
            None => false.serialize(dest),
        }
    }
}

impl<T: Deserialize + Default> Deserialize for Option<T> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        if deserialize::<bool>(src)? {
            *self = Some(deserialize::<T>(src)?);
        } else {
            *self = None;
        }

        Ok(())
    }
}

pub use crate::DeserializeStruct;
pub use crate::SerializeStruct;
