//! Listy text helpers: the doubly-encoded form test values are stored in.
//!
//! A listy string is JSON text (`"[7,6,4,3,1]"`, `"0"`, `"[[0,1],[1,2]]"`)
//! that is first decoded generically and then interpreted against a
//! descriptor. Decoding here is a pure function with no shared decoder state.

use std::io;

use serde::Serialize;
use serde_json::Value as Json;
use serde_json::ser::Formatter;

use crate::core::codec;
use crate::core::descriptor::{Kind, ScalarKind, TypeDescriptor};
use crate::core::error::{CodecError, CodecResult};
use crate::core::value::Value;

const SAMPLE_LEN: usize = 2;

/// Decode listy text into a generic value tree.
pub fn decode_generic(text: &str) -> CodecResult<Json> {
    serde_json::from_str(text).map_err(|err| CodecError::MalformedListy {
        text: text.to_string(),
        reason: err.to_string(),
    })
}

/// Decode listy text straight into a structural value.
pub fn decode_listy(text: &str, descriptor: &TypeDescriptor) -> CodecResult<Value> {
    codec::decode(&decode_generic(text)?, descriptor)
}

/// Encode a structural value as compact listy text.
pub fn encode_listy(value: &Value, descriptor: &TypeDescriptor) -> CodecResult<String> {
    codec::encode(value, descriptor).map(|json| json.to_string())
}

/// Check that `text` is a valid listy rendering of `descriptor`.
pub fn validate_listy(text: &str, descriptor: &TypeDescriptor) -> CodecResult<()> {
    decode_listy(text, descriptor).map(|_| ())
}

/// Canonical listy spelling: compact JSON with a space after every separator
/// comma, e.g. `[1, [2, 3], "a,b"]`.
pub fn reformat(text: &str) -> CodecResult<String> {
    let json = decode_generic(text)?;
    let malformed = |reason: String| CodecError::MalformedListy {
        text: text.to_string(),
        reason,
    };
    let mut out = Vec::with_capacity(text.len() + text.len() / 4);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, ListyFormatter);
    json.serialize(&mut serializer)
        .map_err(|err| malformed(err.to_string()))?;
    String::from_utf8(out).map_err(|err| malformed(err.to_string()))
}

/// Compact output with `", "` between array elements and object entries.
struct ListyFormatter;

impl Formatter for ListyFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }
}

/// A small valid listy text for `descriptor`, used as an authoring
/// placeholder.
pub fn sample(descriptor: &TypeDescriptor) -> CodecResult<String> {
    let text = match descriptor.resolved_kind() {
        Kind::Scalar(ScalarKind::Boolean) => "false".to_string(),
        Kind::Scalar(ScalarKind::String) => "\"str\"".to_string(),
        Kind::Scalar(ScalarKind::Integer) => "1".to_string(),
        Kind::Scalar(ScalarKind::Double) => "1.2".to_string(),
        Kind::Array | Kind::BinaryTree | Kind::LinkedList => {
            let element = sample(descriptor.element()?)?;
            bracket(vec![element; SAMPLE_LEN])
        }
        Kind::Matrix => {
            let element = sample(descriptor.element()?)?;
            let row = bracket(vec![element; SAMPLE_LEN]);
            bracket(vec![row; SAMPLE_LEN])
        }
        Kind::Graph => {
            let vertex = sample(descriptor.element()?)?;
            let edge = bracket(vec![vertex; 2]);
            bracket(vec![edge; SAMPLE_LEN])
        }
    };
    Ok(text)
}

fn bracket(items: Vec<String>) -> String {
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_listy_text() {
        let descriptor = TypeDescriptor::array(TypeDescriptor::integer());
        let value = decode_listy("[7,6,4,3,1]", &descriptor).expect("decode");
        assert_eq!(
            encode_listy(&value, &descriptor).expect("encode"),
            "[7,6,4,3,1]"
        );
    }

    #[test]
    fn malformed_text_is_reported() {
        let err = decode_generic("[1,").expect_err("malformed");
        assert!(matches!(err, CodecError::MalformedListy { .. }));
        assert!(err.to_string().contains("[1,"));
    }

    #[test]
    fn reformat_spaces_separators_only() {
        assert_eq!(reformat("[1,[2,3]]").expect("fmt"), "[1, [2, 3]]");
        assert_eq!(reformat(r#"["a,b","c"]"#).expect("fmt"), r#"["a,b", "c"]"#);
        assert_eq!(reformat(r#"["q\",x"]"#).expect("fmt"), r#"["q\",x"]"#);
        assert_eq!(reformat(" 42 ").expect("fmt"), "42");
    }

    #[test]
    fn reformat_leaves_string_contents_alone() {
        assert_eq!(
            reformat(r#"[["x, [y]",  "\\"],{"k,":[1,2]}]"#).expect("fmt"),
            r#"[["x, [y]", "\\"], {"k,":[1, 2]}]"#
        );
        assert_eq!(reformat("[ ]").expect("fmt"), "[]");
        assert!(matches!(
            reformat("[1,,2]"),
            Err(CodecError::MalformedListy { .. })
        ));
    }

    #[test]
    fn samples_decode_against_their_descriptor() {
        let descriptors = [
            TypeDescriptor::boolean(),
            TypeDescriptor::double(),
            TypeDescriptor::array(TypeDescriptor::string()),
            TypeDescriptor::matrix(TypeDescriptor::integer()),
            TypeDescriptor::binary_tree(TypeDescriptor::integer()),
            TypeDescriptor::linked_list(TypeDescriptor::integer()),
            TypeDescriptor::graph(TypeDescriptor::integer()),
        ];
        for descriptor in &descriptors {
            let text = sample(descriptor).expect("sample");
            validate_listy(&text, descriptor)
                .unwrap_or_else(|err| panic!("{descriptor}: {text}: {err}"));
        }
    }

    #[test]
    fn sample_shapes() {
        let matrix = TypeDescriptor::matrix(TypeDescriptor::integer());
        assert_eq!(sample(&matrix).expect("sample"), "[[1, 1], [1, 1]]");
        let graph = TypeDescriptor::graph(TypeDescriptor::integer());
        assert_eq!(sample(&graph).expect("sample"), "[[1, 1], [1, 1]]");
        assert_eq!(
            decode_generic(&sample(&TypeDescriptor::string()).expect("sample")).expect("json"),
            json!("str")
        );
    }
}
