use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::{Error as DeError, Visitor};
use serde::{Deserializer, Serializer};

/// Serialises a byte payload as a standard base64 string.  
/// 以標準 base64 字串保存位元組內容。
pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&BASE64.encode(bytes))
}

/// Deserialises bytes written by [`serialize`]; `null` decodes as empty.  
/// 還原上述格式；`null` 視為空內容。
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    struct BytesVisitor;

    impl<'de> Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a base64 encoded string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            BASE64
                .decode(v.as_bytes())
                .map_err(|err| E::custom(format!("invalid base64 payload: {err}")))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(BytesVisitor)
}
