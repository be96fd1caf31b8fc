//! Utility functions for producing the YAML files of generated overlays
use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

/// Represents every error which can be encountered during YAML serialization.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to parse bytes as valid UTF-8 string"))]
    ParseUtf8Bytes { source: std::string::FromUtf8Error },
}

/// Serializes the given data structure and writes it to a [`Writer`](std::io::Write).
///
/// Documents are written without leading triple dashes, which is what kustomize expects for
/// patch files and manifests.
pub fn serialize<T, W>(value: &T, writer: W) -> Result<()>
where
    T: serde::Serialize,
    W: std::io::Write,
{
    let mut serializer = serde_yaml::Serializer::new(writer);
    value
        .serialize(&mut serializer)
        .context(SerializeYamlSnafu)
}

/// Serializes the given data structure into a YAML [`String`].
pub fn to_string<T: serde::Serialize>(value: &T) -> Result<String> {
    let mut buffer = Vec::new();
    serialize(value, &mut buffer)?;
    String::from_utf8(buffer).context(ParseUtf8BytesSnafu)
}
