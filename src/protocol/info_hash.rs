use thiserror::Error;

/// The 20-byte SHA-1 digest identifying a torrent. Rendered as 40 lowercase
/// hexadecimal characters everywhere outside the wire codecs.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct InfoHash(pub [u8; 20]);

impl std::fmt::Display for InfoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut chars = [0u8; 40];
        binascii::bin2hex(&self.0, &mut chars).expect("failed to hexlify");
        write!(f, "{}", std::str::from_utf8(&chars).unwrap())
    }
}

impl std::str::FromStr for InfoHash {
    type Err = binascii::ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut i = Self([0u8; 20]);
        if s.len() != 40 {
            return Err(binascii::ConvertError::InvalidInputLength);
        }
        binascii::hex2bin(s.as_bytes(), &mut i.0)?;
        Ok(i)
    }
}

impl std::convert::From<[u8; 20]> for InfoHash {
    fn from(val: [u8; 20]) -> Self {
        InfoHash(val)
    }
}

/// Errors when building an `InfoHash` from a raw byte slice.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("not enough bytes for an info-hash: {0}, expected 20")]
    NotEnoughBytes(usize),
    #[error("too many bytes for an info-hash: {0}, expected 20")]
    TooManyBytes(usize),
}

impl TryFrom<&[u8]> for InfoHash {
    type Error = ConversionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < 20 {
            return Err(ConversionError::NotEnoughBytes(bytes.len()));
        }
        if bytes.len() > 20 {
            return Err(ConversionError::TooManyBytes(bytes.len()));
        }
        let mut ret = InfoHash([0u8; 20]);
        ret.0.clone_from_slice(bytes);
        Ok(ret)
    }
}

impl TryFrom<Vec<u8>> for InfoHash {
    type Error = ConversionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        InfoHash::try_from(bytes.as_slice())
    }
}

impl serde::ser::Serialize for InfoHash {
    fn serialize<S: serde::ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut buffer = [0u8; 40];
        let bytes_out = binascii::bin2hex(&self.0, &mut buffer).ok().unwrap();
        let str_out = std::str::from_utf8(bytes_out).unwrap();
        serializer.serialize_str(str_out)
    }
}

impl<'de> serde::de::Deserialize<'de> for InfoHash {
    fn deserialize<D: serde::de::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
        des.deserialize_str(InfoHashVisitor)
    }
}

struct InfoHashVisitor;

impl<'v> serde::de::Visitor<'v> for InfoHashVisitor {
    type Value = InfoHash;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a 40 character long hash")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        if v.len() != 40 {
            return Err(serde::de::Error::invalid_value(
                serde::de::Unexpected::Str(v),
                &"a 40 character long string",
            ));
        }

        let mut res = InfoHash([0u8; 20]);

        if binascii::hex2bin(v.as_bytes(), &mut res.0).is_err() {
            return Err(serde::de::Error::invalid_value(
                serde::de::Unexpected::Str(v),
                &"a hexadecimal string",
            ));
        };
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::InfoHash;

    #[test]
    fn it_can_be_created_from_a_40_char_hexadecimal_string() {
        assert!(InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").is_ok());
    }

    #[test]
    fn it_rejects_strings_of_the_wrong_length() {
        assert!(InfoHash::from_str("3b245504").is_err());
    }

    #[test]
    fn it_rejects_non_hexadecimal_strings() {
        assert!(InfoHash::from_str("GGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG").is_err());
    }

    #[test]
    fn it_displays_as_lowercase_hex() {
        let info_hash = InfoHash([0xff; 20]);
        assert_eq!(info_hash.to_string(), "ff".repeat(20));
    }

    #[test]
    fn it_can_be_created_from_a_20_byte_slice() {
        let bytes = [7u8; 20];
        let info_hash = InfoHash::try_from(&bytes[..]).unwrap();
        assert_eq!(info_hash, InfoHash(bytes));
    }

    #[test]
    fn it_rejects_byte_slices_of_the_wrong_length() {
        assert!(InfoHash::try_from(&[0u8; 19][..]).is_err());
        assert!(InfoHash::try_from(&[0u8; 21][..]).is_err());
    }

    #[test]
    fn it_round_trips_through_its_string_form() {
        let info_hash = InfoHash([0xab; 20]);
        assert_eq!(InfoHash::from_str(&info_hash.to_string()).unwrap(), info_hash);
    }
}
